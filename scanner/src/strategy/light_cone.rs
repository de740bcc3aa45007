use super::{Context, ParseStrategy, integer, require, text};
use crate::{
	error::ScanError,
	events::{Increment, LogLevel},
	extract::RecordKind,
	field::{Field, FieldBag, FieldValue},
	filter::{self, Filter, FilterResults, FilterSpec, Resolved, SortMethod},
	record::{LightConeRecord, ParsedRecord},
};

const LOCK_CONFIDENCE: f32 = 0.1;

/// Stand-in when the name is unreadable.
const FALLBACK_NAME: &str = "Void";
const FALLBACK_LEVEL: &str = "1/20";

pub struct LightConeStrategy {
	ctx: Context,
}

impl LightConeStrategy {
	pub fn new(ctx: Context) -> Self {
		Self { ctx }
	}

	fn log(&self, uid: u32, message: impl AsRef<str>, level: LogLevel) {
		self.ctx.log(RecordKind::LightCone, uid, message, level);
	}

	fn resolve_filter(&self, filter: &Filter, bag: &mut FieldBag, uid: u32) -> Result<Resolved, ScanError> {
		match filter.field {
			// rarity is not on screen; it comes from the catalog entry of the name
			Field::Rarity => {
				// every light cone is at least 3 stars
				if filter.is_trivial_min(3) {
					return Ok(Resolved::Satisfied);
				}
				let raw = text(self.ctx.resolve(RecordKind::LightCone, bag, Field::Name)?);
				if raw.is_empty() {
					self.log(
						uid,
						format!("Failed to parse name. Setting to \"{FALLBACK_NAME}\"."),
						LogLevel::Error,
					);
					bag.insert(Field::Name, FALLBACK_NAME);
					return Ok(Resolved::Satisfied);
				}

				let (name, _) = self.ctx.catalog.closest_light_cone_name(&raw);
				let rarity = self
					.ctx
					.catalog
					.light_cone(&name)
					.ok_or_else(|| ScanError::UnknownName {
						kind: "light cone",
						name: name.clone(),
					})?
					.rarity as i64;
				bag.insert(Field::Name, name);
				bag.insert(Field::Rarity, rarity);
				Ok(Resolved::Value(rarity))
			}
			Field::Level => {
				if filter.is_trivial_min(1) {
					return Ok(Resolved::Satisfied);
				}
				let value = self.ctx.resolve(RecordKind::LightCone, bag, Field::Level)?;
				if value.is_pending() || value.is_blank() {
					self.log(uid, "Failed to parse level. Setting to 1.", LogLevel::Error);
					bag.insert(Field::Level, FALLBACK_LEVEL);
					return Ok(Resolved::Satisfied);
				}
				// "<level>/<max level>"
				let raw = text(value);
				let current = raw.split('/').next().unwrap_or_default();
				integer(filter, &FieldValue::from(current)).map(Resolved::Value)
			}
			field => {
				let value = self.ctx.resolve(RecordKind::LightCone, bag, field)?;
				integer(filter, value).map(Resolved::Value)
			}
		}
	}

	fn build(&self, bag: &mut FieldBag, uid: u32) -> Result<LightConeRecord, ScanError> {
		let catalog = &self.ctx.catalog;

		let (mut name, _) = catalog.closest_light_cone_name(&text(require(bag, Field::Name)?));
		if name.is_empty() {
			self.log(
				uid,
				format!("Failed to parse name. Setting to \"{FALLBACK_NAME}\"."),
				LogLevel::Error,
			);
			name = FALLBACK_NAME.to_owned();
		}
		let meta = catalog.light_cone(&name).ok_or_else(|| ScanError::UnknownName {
			kind: "light cone",
			name: name.clone(),
		})?;

		let (level, max_level) = match parse_level(&text(require(bag, Field::Level)?)) {
			Some(v) => v,
			None => {
				self.log(uid, "Failed to parse level. Setting to 1.", LogLevel::Error);
				(1, 20)
			}
		};
		let ascension = (max_level.max(20) - 20) / 10;

		let superimposition = match require(bag, Field::Superimposition)?.to_int() {
			Some(v) => v,
			None => {
				self.log(uid, "Failed to parse superimposition. Setting to 1.", LogLevel::Error);
				1
			}
		};

		let lock = self
			.ctx
			.icon_present(RecordKind::LightCone, uid, bag, Field::Lock, &self.ctx.lock_icon, LOCK_CONFIDENCE);
		let (location, owner_variant) = self.ctx.owner(RecordKind::LightCone, uid, bag)?;

		Ok(LightConeRecord {
			id: meta.id.clone(),
			name,
			level,
			ascension,
			superimposition,
			location,
			lock,
			uid: format!("light_cone_{uid}"),
			owner_variant,
		})
	}
}

/// `"<level>/<max level>"`
fn parse_level(text: &str) -> Option<(i64, i64)> {
	let (level, max) = text.split_once('/')?;
	Some((level.trim().parse().ok()?, max.trim().parse().ok()?))
}

impl ParseStrategy for LightConeStrategy {
	fn kind(&self) -> RecordKind {
		RecordKind::LightCone
	}

	fn added(&self) -> Increment {
		Increment::LightConeAdd
	}

	fn optimal_sort_method(&self, filters: &FilterSpec) -> SortMethod {
		if filters.threshold("min_level").unwrap_or(0) > 1 {
			SortMethod::Level
		} else {
			SortMethod::Rarity
		}
	}

	fn check_filters(&self, bag: &mut FieldBag, filters: &FilterSpec, uid: u32) -> Result<FilterResults, ScanError> {
		filter::evaluate(filters, bag, |filter, bag| self.resolve_filter(filter, bag, uid))
	}

	fn extract_field(&self, field: Field, value: FieldValue) -> Result<FieldValue, ScanError> {
		self.ctx.extractor().extract(RecordKind::LightCone, field, value)
	}

	fn parse(&self, bag: FieldBag, uid: u32) -> Option<ParsedRecord> {
		let record = self
			.ctx
			.run_parse(RecordKind::LightCone, bag, uid, |bag| self.build(bag, uid))?;
		self.ctx.notifier.progress(Increment::LightConeSuccess);
		Some(ParsedRecord::LightCone(record))
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use ie::{Color, OwnedImage};

	use super::*;
	use crate::{
		events::Event,
		strategy::fakes::{ScriptedOcr, context, errors},
	};

	const GAME_DATA: &str = r#"{
		"version": "t",
		"relics": {},
		"light_cones": {
			"Void": {"id": 20004, "rarity": 3},
			"In the Night": {"id": 23001, "rarity": 5}
		},
		"characters": {"Himeko": {"id": 1003}}
	}"#;

	fn region(color: Color) -> OwnedImage {
		OwnedImage::filled(20, 10, color)
	}

	fn ocr() -> ScriptedOcr {
		ScriptedOcr::default()
			.reply(RecordKind::LightCone, Field::Name, "In the Nlght")
			.reply(RecordKind::LightCone, Field::Level, "8S/S0")
			.reply(RecordKind::LightCone, Field::Superimposition, "S")
			.reply(RecordKind::LightCone, Field::Equipped, "Equippe")
	}

	fn bag() -> FieldBag {
		let mut bag = FieldBag::new();
		for field in [Field::Name, Field::Level, Field::Superimposition, Field::Equipped] {
			bag.insert(field, region(Color::WHITE));
		}
		bag.insert(Field::Lock, region(Color::WHITE));
		bag.insert(Field::EquippedAvatar, region(Color::WHITE));
		bag.insert(Field::EquippedAvatarOffset, region(Color::WHITE));
		bag
	}

	fn strategy(ocr: ScriptedOcr) -> (LightConeStrategy, std::sync::mpsc::Receiver<Event>) {
		let (ctx, rx) = context(GAME_DATA, ocr, false);
		(LightConeStrategy::new(ctx), rx)
	}

	fn filters(pairs: &[(&str, i64)]) -> FilterSpec {
		FilterSpec::parse(&pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>()).unwrap()
	}

	#[test]
	fn test_parse_full_record() {
		let (strategy, rx) = strategy(ocr());
		let Some(ParsedRecord::LightCone(cone)) = strategy.parse(bag(), 12) else {
			panic!("light cone not parsed");
		};
		assert_eq!(cone.id, "23001");
		assert_eq!(cone.name, "In the Night");
		assert_eq!(cone.level, 85);
		assert_eq!(cone.ascension, 3);
		assert_eq!(cone.superimposition, 5);
		assert_eq!(cone.location, "TrailblazerHarmony");
		assert!(!cone.lock);
		assert_eq!(cone.uid, "light_cone_12");
		assert!(errors(&rx).is_empty());
	}

	#[test]
	fn test_unparsable_level_defaults() {
		let (strategy, rx) = strategy(ScriptedOcr::default());
		let bag = FieldBag::new()
			.with(Field::Name, "Void")
			.with(Field::Level, "ll/20")
			.with(Field::Superimposition, "1")
			.with(Field::Lock, region(Color::BLACK))
			.with(Field::Equipped, "");
		let Some(ParsedRecord::LightCone(cone)) = strategy.parse(bag, 1) else {
			panic!("light cone not parsed");
		};
		assert_eq!(cone.level, 1);
		assert_eq!(cone.ascension, 0);
		assert_eq!(cone.superimposition, 1);
		assert!(cone.lock);
		assert_eq!(cone.location, "");
		assert_eq!(errors(&rx), vec!["Light Cone UID 1: Failed to parse level. Setting to 1.".to_string()]);
	}

	#[test]
	fn test_unreadable_name_falls_back_to_void() {
		let (strategy, rx) = strategy(ocr().reply(RecordKind::LightCone, Field::Name, ""));
		let Some(ParsedRecord::LightCone(cone)) = strategy.parse(bag(), 2) else {
			panic!("light cone not parsed");
		};
		assert_eq!(cone.id, "20004");
		assert_eq!(errors(&rx).len(), 1);
	}

	#[test]
	fn test_bad_superimposition_defaults() {
		let (strategy, rx) = strategy(ocr().reply(RecordKind::LightCone, Field::Superimposition, ""));
		let Some(ParsedRecord::LightCone(cone)) = strategy.parse(bag(), 2) else {
			panic!("light cone not parsed");
		};
		assert_eq!(cone.superimposition, 1);
		assert_eq!(errors(&rx), vec!["Light Cone UID 2: Failed to parse superimposition. Setting to 1.".to_string()]);
	}

	#[test]
	fn test_trivial_rarity_leaves_name_pending() {
		let (strategy, _rx) = strategy(ScriptedOcr::default());
		let mut bag = bag();
		let results = strategy
			.check_filters(&mut bag, &filters(&[("min_rarity", 3), ("min_level", 1)]), 1)
			.unwrap();
		assert!(filter::all_passed(&results));
		assert!(bag.get(Field::Name).unwrap().is_pending());
		assert!(bag.get(Field::Level).unwrap().is_pending());
	}

	#[test]
	fn test_rarity_filter_reads_catalog() {
		let (strategy, _rx) = strategy(ocr());
		let mut bag = bag();
		let results = strategy.check_filters(&mut bag, &filters(&[("min_rarity", 4)]), 1).unwrap();
		assert_eq!(results["min_rarity"], true);
		assert_eq!(bag.get(Field::Name), Some(&FieldValue::from("In the Night")));
		assert_eq!(bag.get(Field::Rarity), Some(&FieldValue::Int(5)));
	}

	#[test]
	fn test_level_filter() {
		let (strategy, _rx) = strategy(ocr());
		let mut bag = bag();
		let results = strategy.check_filters(&mut bag, &filters(&[("min_level", 90)]), 1).unwrap();
		assert_eq!(results["min_level"], false);
		assert_eq!(bag.get(Field::Level), Some(&FieldValue::from("85/50")));
	}

	#[test]
	fn test_unreadable_filter_fields_satisfy() {
		let ocr = ocr()
			.reply(RecordKind::LightCone, Field::Name, "")
			.reply(RecordKind::LightCone, Field::Level, "");
		let (strategy, rx) = strategy(ocr);
		let mut bag = bag();
		let results = strategy
			.check_filters(&mut bag, &filters(&[("min_rarity", 5), ("min_level", 20)]), 3)
			.unwrap();
		assert!(filter::all_passed(&results));
		assert_eq!(bag.get(Field::Name), Some(&FieldValue::from("Void")));
		assert_eq!(bag.get(Field::Level), Some(&FieldValue::from("1/20")));
		assert_eq!(errors(&rx).len(), 2);
	}

	#[test]
	fn test_optimal_sort_method() {
		let (strategy, _rx) = strategy(ScriptedOcr::default());
		assert_eq!(strategy.optimal_sort_method(&filters(&[("min_level", 2)])), SortMethod::Level);
		assert_eq!(strategy.optimal_sort_method(&filters(&[("min_level", 1)])), SortMethod::Rarity);
	}
}
