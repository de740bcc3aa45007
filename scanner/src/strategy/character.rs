//! Roster entries. Unlike inventory items they are identified before the
//! level filter runs, so identification and the full parse are separate steps.

use std::sync::atomic::{AtomicBool, Ordering};

use data::LevelBonus;
use ie::{Layout, OwnedImage, Preprocess, Recognition};

use super::{Context, text};
use crate::{
	error::ScanError,
	events::{Increment, LogLevel},
	field::{CharacterBag, Field, FieldValue},
	record::{CharacterRecord, MemospriteSkills, Skills},
};

const LABEL: Recognition = Recognition::new(
	"ABCDEFGHIJKLMNOPQRSTUVWXYZ abcdefghijklmnopqrstuvwxyz/7&",
	Layout::Line,
	Preprocess::None,
);
const LEVEL: Recognition = Recognition::new("0123456789", Layout::Line, Preprocess::CharacterLevel);
const TRACE_LEVEL: Recognition = Recognition::new("0123456789/", Layout::Block, Preprocess::TraceLevel);

/// Largest edit distance accepted for a character name.
const MAX_NAME_DISTANCE: usize = 5;
const TRAILBLAZER_CONFIDENCE: f32 = 0.8;
const TRAILBLAZER: &str = "Trailblazer";
const REMEMBRANCE: &str = "Remembrance";
const MEMOSPRITE_PREFIX: &str = "memosprite_";

/// Portraits of both Trailblazer bodies.
pub struct TrailblazerIcons {
	pub caelus: OwnedImage,
	pub stelle: OwnedImage,
}

/// Who a roster entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub name: String,
	pub path: String,
	/// `M` or `F` when the portrait shows the Trailblazer.
	pub variant: Option<&'static str>,
}

impl Identity {
	pub fn label(&self) -> String {
		format!("{} / {}", self.path, self.name)
	}
}

pub struct CharacterParser {
	ctx: Context,
	trailblazer: Option<TrailblazerIcons>,
	trailblazer_seen: AtomicBool,
}

impl CharacterParser {
	pub fn new(ctx: Context) -> Self {
		Self {
			ctx,
			trailblazer: None,
			trailblazer_seen: AtomicBool::new(false),
		}
	}

	/// Without icons no portrait is taken for the Trailblazer.
	pub fn with_trailblazer_icons(mut self, icons: TrailblazerIcons) -> Self {
		self.trailblazer = Some(icons);
		self
	}

	pub fn interrupted(&self) -> bool {
		self.ctx.interrupted()
	}

	fn log(&self, message: impl Into<String>, level: LogLevel) {
		self.ctx.notifier.log(message, level);
	}

	/// Try each layout in turn until `accept` likes the text. The last attempt
	/// is returned either way.
	fn read(&self, image: &OwnedImage, request: Recognition, layouts: &[Layout], accept: impl Fn(&str) -> bool) -> anyhow::Result<String> {
		let mut last = String::new();
		for layout in layouts {
			last = self.ctx.recognizer.recognize(image.as_image(), &Recognition { layout: *layout, ..request })?;
			if accept(&last) {
				break;
			}
		}
		Ok(last)
	}

	/// Name and path from the label above the portrait. The Trailblazer's label
	/// shows the player's chosen name, so it is recognized by portrait instead.
	pub fn identify(&self, bag: &mut CharacterBag) -> Result<Identity, ScanError> {
		if let FieldValue::Pending(image) = &bag.label {
			let raw = self
				.ctx
				.recognizer
				.recognize(image.as_image(), &LABEL)
				.map_err(|reason| ScanError::Recognition { field: Field::Name, reason })?;
			bag.label = FieldValue::Text(raw);
		}
		let label = text(&bag.label);

		let mut parts = label.split('/').map(str::trim);
		let (Some(path), Some(name)) = (parts.next(), parts.next()) else {
			return Err(ScanError::CharacterLabel(label));
		};
		let (path, _) = self.ctx.catalog.closest_path(path);

		if let Some(variant) = bag.portrait.as_ref().and_then(|v| self.trailblazer_variant(v)) {
			if self.trailblazer_seen.swap(true, Ordering::Relaxed) {
				self.log("Parsed more than one Trailblazer. Please review JSON output.", LogLevel::Error);
			}
			return Ok(Identity {
				name: TRAILBLAZER.to_owned(),
				path,
				variant: Some(variant),
			});
		}

		let (closest, distance) = self.ctx.catalog.closest_character_name(name);
		self.log(
			format!("Got character name \"{closest}\" for string \"{name}\" with distance {distance} out of max {MAX_NAME_DISTANCE}."),
			LogLevel::Trace,
		);
		if distance > MAX_NAME_DISTANCE {
			return Err(ScanError::UnknownName {
				kind: "character",
				name: name.to_owned(),
			});
		}

		Ok(Identity {
			name: closest,
			path,
			variant: None,
		})
	}

	fn trailblazer_variant(&self, portrait: &OwnedImage) -> Option<&'static str> {
		let icons = self.trailblazer.as_ref()?;
		for (variant, icon, who) in [("M", &icons.caelus, "Caelus"), ("F", &icons.stelle, "Stelle")] {
			let icon = icon.resized(portrait.width(), portrait.height());
			match self
				.ctx
				.matcher
				.locate(portrait.as_image(), icon.as_image(), TRAILBLAZER_CONFIDENCE)
			{
				Ok(true) => {
					self.log(format!("{who} detected."), LogLevel::Debug);
					return Some(variant);
				}
				Ok(false) => {}
				Err(err) => tracing::debug!(%err, who, "portrait match failed"),
			}
		}
		None
	}

	/// Level from a number, digits or the level crop. Unreadable digits fall
	/// back to 1; a failing recognizer is an error.
	pub fn level(&self, value: &FieldValue) -> Result<i64, ScanError> {
		let raw = match value {
			FieldValue::Int(v) => return Ok(*v),
			FieldValue::Pending(image) => self
				.read(image, LEVEL, &[Layout::Line, Layout::Block], is_number)
				.map_err(|reason| ScanError::Recognition { field: Field::Level, reason })?,
			other => text(other),
		};

		if !is_number(&raw) {
			self.log(format!("Failed to parse level. Got '{raw}' instead. Setting to 1."), LogLevel::Error);
			return Ok(1);
		}
		Ok(raw.parse().unwrap_or(1))
	}

	/// [`Self::level`], with a recognizer failure also read as level 1.
	pub fn level_or_default(&self, name: &str, value: &FieldValue) -> i64 {
		self.level(value).unwrap_or_else(|err| {
			self.log(format!("{name}: Failed to parse level. {err}"), LogLevel::Error);
			1
		})
	}

	/// Full parse. `None` if the scan was cancelled or the entry was discarded.
	pub fn parse(&self, identity: &Identity, bag: CharacterBag) -> Option<CharacterRecord> {
		if self.interrupted() {
			return None;
		}

		match self.build(identity, bag) {
			Ok(record) => {
				self.ctx.notifier.progress(Increment::CharacterSuccess);
				Some(record)
			}
			Err(err) => {
				self.log(
					format!("Failed to parse character. name={:?}, path={:?}, error={err}", identity.name, identity.path),
					LogLevel::Error,
				);
				None
			}
		}
	}

	fn build(&self, identity: &Identity, bag: CharacterBag) -> Result<CharacterRecord, ScanError> {
		let name = &identity.name;
		let meta = self
			.ctx
			.catalog
			.character_on_path(name, &identity.path)
			.ok_or_else(|| ScanError::UnknownName {
				kind: "character",
				name: name.clone(),
			})?;

		let level = self.level_or_default(name, &bag.level);
		let eidolon = ie::count_eidolons(bag.eidolons.iter().map(OwnedImage::as_image));

		// displayed ability levels include eidolon bonuses
		let mut skills = Skills::default();
		let mut memosprite = (identity.path == REMEMBRANCE).then(MemospriteSkills::default);
		for (threshold, bonuses) in [(5, &meta.e5), (3, &meta.e3)] {
			if eidolon < threshold {
				continue;
			}
			for (key, bonus) in bonuses {
				match bonus {
					LevelBonus::Level(v) => {
						*skills.slot(key).ok_or_else(|| ScanError::UnknownTrace(key.clone()))? -= v;
					}
					LevelBonus::Nested(nested) => {
						let Some(memosprite) = memosprite.as_mut() else {
							continue;
						};
						for (key, v) in nested {
							*memosprite.slot(key).ok_or_else(|| ScanError::UnknownTrace(key.clone()))? -= v;
						}
					}
				}
			}
		}

		for (key, value) in &bag.trace_levels {
			let (slot, max) = match key.strip_prefix(MEMOSPRITE_PREFIX) {
				Some(k) => (memosprite.as_mut().and_then(|v| v.slot(k)), 6),
				None => (skills.slot(key), if key == "basic" { 6 } else { 10 }),
			};
			let slot = slot.ok_or_else(|| ScanError::UnknownTrace(key.clone()))?;

			let raw = self.trace_text(name, key, value);
			let parsed = raw
				.split('/')
				.next()
				.and_then(|v| v.trim().parse::<i64>().ok())
				.map(|v| *slot + v)
				.filter(|v| (1..=max).contains(v));
			*slot = match parsed {
				Some(v) => v,
				None => {
					let got = if raw.is_empty() { String::new() } else { format!("Got '{raw}' instead. ") };
					self.log(format!("{name}: Failed to parse '{key}' level. {got}Setting to 1."), LogLevel::Error);
					1
				}
			};
		}

		Ok(CharacterRecord {
			id: meta.id.clone(),
			name: name.clone(),
			path: identity.path.clone(),
			level,
			ascension: bag.ascension,
			eidolon,
			skills,
			memosprite,
			traces: bag.trace_unlocks,
			variant: identity.variant.map(str::to_owned),
		})
	}

	/// `"<level>/<max>"` for one trace. Recognizer failures read as empty.
	fn trace_text(&self, name: &str, key: &str, value: &FieldValue) -> String {
		let FieldValue::Pending(image) = value else {
			return text(value);
		};
		match self.read(image, TRACE_LEVEL, &[Layout::Block, Layout::Line], |v| v.contains('/')) {
			Ok(v) => v.trim().to_owned(),
			Err(err) => {
				self.log(format!("{name}: Failed to read '{key}' level: {err:#}"), LogLevel::Debug);
				String::new()
			}
		}
	}
}

fn is_number(text: &str) -> bool {
	!text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
	use std::{collections::BTreeMap, sync::Arc};

	use ie::{Color, Image, TextRecognizer};

	use super::*;
	use crate::{
		events::Event,
		strategy::fakes::{context, errors, ScriptedOcr},
	};

	const GAME_DATA: &str = r#"{
		"version": "t",
		"relics": {},
		"light_cones": {},
		"characters": {
			"Himeko": {"id": 1003, "e3": {"skill": 2, "basic": 1}, "e5": {"ult": 2, "talent": 2}},
			"Asta": {"id": 1009},
			"March 7th": {"id": 1001},
			"March 7thHunt": {"id": 1224},
			"TrailblazerHarmony": {"id": 8005},
			"TrailblazerRemembrance": {"id": 8007, "e3": {"ult": 2, "memosprite": {"skill": 1}}}
		}
	}"#;

	/// Reads numbers off the red channel of the crop's top-left pixel, so each
	/// crop can carry its own answer. Red 0 reads as nothing.
	struct RedDigits;

	impl TextRecognizer for RedDigits {
		fn recognize(&self, image: Image<'_>, request: &Recognition) -> anyhow::Result<String> {
			let red = image.pixel(0, 0).r;
			if red == 0 {
				return Ok(String::new());
			}
			Ok(match request.preprocess {
				Preprocess::TraceLevel => format!("{red}/10"),
				_ => red.to_string(),
			})
		}
	}

	fn crop(red: u8) -> OwnedImage {
		OwnedImage::filled(4, 4, Color::new(red, 0, 0))
	}

	fn checker(light: Color) -> OwnedImage {
		let mut rgba = Vec::new();
		for y in 0..30u32 {
			for x in 0..30u32 {
				let c = if (x + y) % 2 == 0 { light } else { Color::BLACK };
				rgba.extend([c.r, c.g, c.b, 255]);
			}
		}
		OwnedImage::from_rgba(30, &rgba)
	}

	fn parser_with(ocr: Arc<dyn TextRecognizer>) -> (CharacterParser, std::sync::mpsc::Receiver<Event>) {
		let (mut ctx, rx) = context(GAME_DATA, ScriptedOcr::default(), true);
		ctx.recognizer = ocr;
		let icons = TrailblazerIcons {
			caelus: OwnedImage::filled(8, 8, Color::WHITE),
			stelle: OwnedImage::filled(8, 8, Color::BLACK),
		};
		(CharacterParser::new(ctx).with_trailblazer_icons(icons), rx)
	}

	fn parser() -> (CharacterParser, std::sync::mpsc::Receiver<Event>) {
		parser_with(Arc::new(RedDigits))
	}

	fn himeko() -> Identity {
		Identity {
			name: "Himeko".into(),
			path: "Erudition".into(),
			variant: None,
		}
	}

	#[test]
	fn test_identify_corrects_name_and_path() {
		let (parser, _rx) = parser();
		let mut bag = CharacterBag::new("Erudltion / Himek0", 80);
		assert_eq!(parser.identify(&mut bag).unwrap(), himeko());

		let mut bag = CharacterBag::new("The Hunt / March 7th", 80);
		let identity = parser.identify(&mut bag).unwrap();
		assert_eq!(identity.name, "March 7th");
		assert_eq!(identity.path, "The Hunt");
	}

	#[test]
	fn test_identify_rejects_bad_labels() {
		let (parser, _rx) = parser();
		let err = parser.identify(&mut CharacterBag::new("Himeko", 80)).unwrap_err();
		assert!(matches!(err, ScanError::CharacterLabel(_)));
		let err = parser
			.identify(&mut CharacterBag::new("Harmony / Qwertyuiopasdf", 80))
			.unwrap_err();
		assert!(matches!(err, ScanError::UnknownName { kind: "character", .. }));
	}

	#[test]
	fn test_trailblazer_from_portrait() {
		let (parser, rx) = parser();
		// the fake matcher accepts a dark icon, which is Stelle's
		let mut bag = CharacterBag::new("Harmony / Dan", 70);
		bag.portrait = Some(OwnedImage::filled(6, 6, Color::WHITE));
		let identity = parser.identify(&mut bag).unwrap();
		assert_eq!(identity.name, "Trailblazer");
		assert_eq!(identity.path, "Harmony");
		assert_eq!(identity.variant, Some("F"));
		assert!(rx.try_iter().any(|e| matches!(&e, Event::Log { message, .. } if message == "Stelle detected.")));

		parser.identify(&mut bag).unwrap();
		assert_eq!(errors(&rx), vec!["Parsed more than one Trailblazer. Please review JSON output.".to_string()]);
	}

	#[test]
	fn test_level_sources() {
		let (parser, rx) = parser();
		assert_eq!(parser.level(&FieldValue::Int(42)).unwrap(), 42);
		assert_eq!(parser.level(&FieldValue::from("60")).unwrap(), 60);
		assert_eq!(parser.level(&FieldValue::Pending(crop(75))).unwrap(), 75);
		assert!(errors(&rx).is_empty());

		assert_eq!(parser.level(&FieldValue::from("6O")).unwrap(), 1);
		assert_eq!(parser.level(&FieldValue::Pending(crop(0))).unwrap(), 1);
		assert_eq!(
			errors(&rx),
			vec![
				"Failed to parse level. Got '6O' instead. Setting to 1.".to_string(),
				"Failed to parse level. Got '' instead. Setting to 1.".to_string(),
			]
		);
	}

	#[test]
	fn test_parse_full_entry() {
		let (parser, rx) = parser();
		let mut bag = CharacterBag::new("Erudition / Himeko", FieldValue::Pending(crop(80)));
		bag.ascension = 6;
		bag.trace_levels = BTreeMap::from([
			("basic".to_owned(), FieldValue::Pending(crop(6))),
			("skill".to_owned(), FieldValue::from("10/10")),
			("ult".to_owned(), FieldValue::Pending(crop(9))),
			("talent".to_owned(), FieldValue::Pending(crop(8))),
		]);
		bag.trace_unlocks = BTreeMap::from([("ability_1".to_owned(), true), ("stat_1".to_owned(), false)]);

		let record = parser.parse(&himeko(), bag).unwrap();
		assert_eq!(record.id, "1003");
		assert_eq!(record.level, 80);
		assert_eq!(record.ascension, 6);
		assert_eq!(record.eidolon, 0);
		assert_eq!(record.skills, Skills { basic: 6, skill: 10, ult: 9, talent: 8 });
		assert_eq!(record.memosprite, None);
		assert_eq!(record.traces["ability_1"], true);
		assert!(errors(&rx).is_empty());
	}

	#[test]
	fn test_eidolon_bonuses_are_removed() {
		let (parser, _rx) = parser();
		let lit = checker(Color::WHITE);
		let mut bag = CharacterBag::new("Erudition / Himeko", 80);
		bag.eidolons = vec![lit.clone(); 6];
		bag.trace_levels = BTreeMap::from([
			("basic".to_owned(), FieldValue::from("7/7")),
			("skill".to_owned(), FieldValue::from("12/12")),
			("ult".to_owned(), FieldValue::from("12/12")),
			("talent".to_owned(), FieldValue::from("12/12")),
		]);

		let record = parser.parse(&himeko(), bag).unwrap();
		assert_eq!(record.eidolon, 6);
		assert_eq!(record.skills, Skills { basic: 6, skill: 10, ult: 10, talent: 10 });
	}

	#[test]
	fn test_inactive_eidolon_stops_count() {
		let (parser, _rx) = parser();
		let mut bag = CharacterBag::new("Erudition / Himeko", 80);
		bag.eidolons = vec![
			checker(Color::WHITE),
			checker(Color::WHITE),
			checker(Color::new(180, 140, 80)),
			checker(Color::WHITE),
		];
		bag.trace_levels = BTreeMap::from([("skill".to_owned(), FieldValue::from("10/10"))]);

		let record = parser.parse(&himeko(), bag).unwrap();
		assert_eq!(record.eidolon, 2);
		// no e3 bonus to take off
		assert_eq!(record.skills.skill, 10);
	}

	#[test]
	fn test_memosprite_levels() {
		let (parser, _rx) = parser();
		let identity = Identity {
			name: "Trailblazer".into(),
			path: "Remembrance".into(),
			variant: Some("M"),
		};
		let mut bag = CharacterBag::new("Remembrance / Trailblazer", 80);
		bag.eidolons = vec![checker(Color::WHITE); 3];
		bag.trace_levels = BTreeMap::from([
			("ult".to_owned(), FieldValue::from("12/12")),
			("memosprite_skill".to_owned(), FieldValue::from("6/6")),
			("memosprite_talent".to_owned(), FieldValue::from("5/6")),
		]);

		let record = parser.parse(&identity, bag).unwrap();
		assert_eq!(record.id, "8007");
		assert_eq!(record.skills.ult, 10);
		assert_eq!(record.memosprite, Some(MemospriteSkills { skill: 5, talent: 5 }));
		assert_eq!(record.variant.as_deref(), Some("M"));
	}

	#[test]
	fn test_unreadable_trace_defaults_to_one() {
		let (parser, rx) = parser();
		let mut bag = CharacterBag::new("Erudition / Himeko", "x");
		bag.trace_levels = BTreeMap::from([
			("basic".to_owned(), FieldValue::from("9/10")),
			("talent".to_owned(), FieldValue::Pending(crop(0))),
		]);

		let record = parser.parse(&himeko(), bag).unwrap();
		assert_eq!(record.level, 1);
		assert_eq!(record.skills.basic, 1);
		assert_eq!(record.skills.talent, 1);
		assert_eq!(
			errors(&rx),
			vec![
				"Failed to parse level. Got 'x' instead. Setting to 1.".to_string(),
				"Himeko: Failed to parse 'basic' level. Got '9/10' instead. Setting to 1.".to_string(),
				"Himeko: Failed to parse 'talent' level. Setting to 1.".to_string(),
			]
		);
	}

	#[test]
	fn test_unknown_character_is_discarded() {
		let (parser, rx) = parser();
		let identity = Identity {
			name: "Kafka".into(),
			path: "Nihility".into(),
			variant: None,
		};
		assert!(parser.parse(&identity, CharacterBag::new("Nihility / Kafka", 80)).is_none());
		let events = rx.try_iter().collect::<Vec<_>>();
		assert!(!events.contains(&Event::Progress(Increment::CharacterSuccess)));
		assert!(events.iter().any(|e| matches!(
			e,
			Event::Log { message, level: LogLevel::Error } if message.starts_with("Failed to parse character.")
		)));
	}

	#[test]
	fn test_cancelled_parse_is_empty() {
		let (parser, rx) = parser();
		parser.ctx.interrupt.store(true, Ordering::Relaxed);
		assert!(parser.parse(&himeko(), CharacterBag::new("Erudition / Himeko", 80)).is_none());
		assert!(errors(&rx).is_empty());
	}
}
