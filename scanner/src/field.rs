//! Field bags: the raw per-record input, one value per field. Roster entries
//! have a fixed shape of their own.

use std::{
	collections::{BTreeMap, HashMap},
	fmt,
	path::{Path, PathBuf},
	str::FromStr,
};

use anyhow::{Context, Result};
use ie::{Color, OwnedImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
	Name,
	Level,
	Rarity,
	#[serde(rename = "mainstat")]
	MainStat,
	SubstatNames,
	SubstatVals,
	Superimposition,
	Lock,
	Discard,
	Equipped,
	EquippedAvatar,
	EquippedAvatarOffset,
}

impl Field {
	pub const ALL: [Field; 12] = [
		Field::Name,
		Field::Level,
		Field::Rarity,
		Field::MainStat,
		Field::SubstatNames,
		Field::SubstatVals,
		Field::Superimposition,
		Field::Lock,
		Field::Discard,
		Field::Equipped,
		Field::EquippedAvatar,
		Field::EquippedAvatarOffset,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Field::Name => "name",
			Field::Level => "level",
			Field::Rarity => "rarity",
			Field::MainStat => "mainstat",
			Field::SubstatNames => "substat_names",
			Field::SubstatVals => "substat_vals",
			Field::Superimposition => "superimposition",
			Field::Lock => "lock",
			Field::Discard => "discard",
			Field::Equipped => "equipped",
			Field::EquippedAvatar => "equipped_avatar",
			Field::EquippedAvatarOffset => "equipped_avatar_offset",
		}
	}
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Field {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Field::ALL.into_iter().find(|v| v.as_str() == s).ok_or(())
	}
}

/// A field is either already a scalar or still an image region awaiting recognition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Text(String),
	Int(i64),
	Float(f64),
	Pending(OwnedImage),
}

impl FieldValue {
	pub fn is_pending(&self) -> bool {
		matches!(self, Self::Pending(_))
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_image(&self) -> Option<&OwnedImage> {
		match self {
			Self::Pending(v) => Some(v),
			_ => None,
		}
	}

	/// Integer view of a resolved value; numeric text counts.
	pub fn to_int(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			Self::Text(v) => v.trim().parse().ok(),
			_ => None,
		}
	}

	/// Empty text or zero, which recognition produces for unreadable crops.
	pub fn is_blank(&self) -> bool {
		match self {
			Self::Text(v) => v.trim().is_empty(),
			Self::Int(v) => *v == 0,
			Self::Float(v) => *v == 0.0,
			Self::Pending(_) => false,
		}
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(v) => f.write_str(v),
			Self::Int(v) => write!(f, "{v}"),
			Self::Float(v) => write!(f, "{v}"),
			Self::Pending(v) => write!(f, "<image {}x{}>", v.width(), v.height()),
		}
	}
}

impl From<&str> for FieldValue {
	fn from(v: &str) -> Self {
		Self::Text(v.to_owned())
	}
}

impl From<String> for FieldValue {
	fn from(v: String) -> Self {
		Self::Text(v)
	}
}

impl From<i64> for FieldValue {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<OwnedImage> for FieldValue {
	fn from(v: OwnedImage) -> Self {
		Self::Pending(v)
	}
}

/// Raw fields of one record. Filters resolve fields in place so the full parse
/// that follows reuses their work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag(HashMap<Field, FieldValue>);

impl FieldBag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
		self.insert(field, value);
		self
	}

	pub fn insert(&mut self, field: Field, value: impl Into<FieldValue>) {
		self.0.insert(field, value.into());
	}

	pub fn get(&self, field: Field) -> Option<&FieldValue> {
		self.0.get(&field)
	}

	pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
		self.0.remove(&field)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Read a bag from a JSON object mapping field names to a string, a number or
	/// `{"image": "<path>"}`. Image paths are relative to the bag file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let json = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
		let raw: BTreeMap<Field, RawValue> = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
		let base = path.parent().unwrap_or(Path::new("."));

		let mut bag = Self::new();
		for (field, value) in raw {
			bag.insert(field, value.resolve(base)?);
		}
		Ok(bag)
	}

	/// Scalar fields only, for log lines. Image regions are left out.
	pub fn redacted(&self) -> String {
		let mut fields = self
			.0
			.iter()
			.filter_map(|(k, v)| match v {
				FieldValue::Text(t) => Some((*k, format!("{t:?}"))),
				FieldValue::Int(i) => Some((*k, i.to_string())),
				FieldValue::Float(f) => Some((*k, f.to_string())),
				FieldValue::Pending(_) => None,
			})
			.collect::<Vec<_>>();
		fields.sort_by_key(|(k, _)| *k);

		let body = fields
			.into_iter()
			.map(|(k, v)| format!("{k}: {v}"))
			.collect::<Vec<_>>()
			.join(", ");
		format!("{{{body}}}")
	}
}

/// A field value as written in a bag file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
	Int(i64),
	Float(f64),
	Text(String),
	Image { image: PathBuf },
}

impl RawValue {
	fn resolve(self, base: &Path) -> Result<FieldValue> {
		Ok(match self {
			RawValue::Int(v) => FieldValue::Int(v),
			RawValue::Float(v) => FieldValue::Float(v),
			RawValue::Text(v) => FieldValue::Text(v),
			RawValue::Image { image } => FieldValue::Pending(OwnedImage::open(base.join(image))?),
		})
	}
}

/// Color of a filled ascension star.
const ASCENSION_STAR: Color = Color::new(255, 222, 152);
/// Colors of an unlocked trace node.
const TRACE_UNLOCKED: [Color; 2] = [Color::WHITE, Color::new(178, 200, 255)];

fn distance(a: Color, b: Color) -> u32 {
	let d = |x: u8, y: u8| (x as i32 - y as i32).pow(2) as u32;
	d(a.r, b.r) + d(a.g, b.g) + d(a.b, b.b)
}

/// Ascension from the star row, sampled left to right. Counting stops at the
/// first unfilled star.
pub fn count_ascension(stars: &[Color]) -> i64 {
	stars
		.iter()
		.take_while(|v| distance(**v, ASCENSION_STAR) <= 100)
		.count() as i64
}

/// Whether a trace node pixel shows the node as unlocked.
pub fn trace_unlocked(pixel: Color) -> bool {
	TRACE_UNLOCKED.iter().any(|v| distance(pixel, *v) < 3000)
}

/// Raw capture of one roster entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterBag {
	/// `"<path> / <name>"` as shown above the character.
	pub label: FieldValue,
	pub portrait: Option<OwnedImage>,
	pub level: FieldValue,
	pub ascension: i64,
	/// Eidolon slots in order, first to sixth.
	pub eidolons: Vec<OwnedImage>,
	/// `"<level>/<max>"` per ability, e.g. `basic` or `memosprite_skill`.
	pub trace_levels: BTreeMap<String, FieldValue>,
	/// `ability_1..3` and `stat_1..10`.
	pub trace_unlocks: BTreeMap<String, bool>,
}

impl CharacterBag {
	pub fn new(label: impl Into<FieldValue>, level: impl Into<FieldValue>) -> Self {
		Self {
			label: label.into(),
			portrait: None,
			level: level.into(),
			ascension: 0,
			eidolons: Vec::new(),
			trace_levels: BTreeMap::new(),
			trace_unlocks: BTreeMap::new(),
		}
	}

	/// Read a roster entry from JSON. Ascension is a number or the sampled star
	/// colors; trace unlocks are booleans or the sampled node colors. Colors are
	/// `[r, g, b]`. Image paths are relative to the file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Ascension {
			Count(i64),
			Stars(Vec<[u8; 3]>),
		}

		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Unlock {
			Flag(bool),
			Pixel([u8; 3]),
		}

		#[derive(Deserialize)]
		struct ImagePath {
			image: PathBuf,
		}

		#[derive(Deserialize)]
		#[serde(deny_unknown_fields)]
		struct Raw {
			label: RawValue,
			#[serde(default)]
			portrait: Option<ImagePath>,
			level: RawValue,
			#[serde(default)]
			ascension: Option<Ascension>,
			#[serde(default)]
			eidolons: Vec<ImagePath>,
			#[serde(default)]
			trace_levels: BTreeMap<String, RawValue>,
			#[serde(default)]
			trace_unlocks: BTreeMap<String, Unlock>,
		}

		let path = path.as_ref();
		let json = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
		let raw: Raw = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
		let base = path.parent().unwrap_or(Path::new("."));
		let color = |[r, g, b]: [u8; 3]| Color::new(r, g, b);

		let mut bag = Self::new(raw.label.resolve(base)?, raw.level.resolve(base)?);
		bag.portrait = raw
			.portrait
			.map(|v| OwnedImage::open(base.join(v.image)))
			.transpose()?;
		bag.ascension = match raw.ascension {
			Some(Ascension::Count(v)) => v,
			Some(Ascension::Stars(stars)) => count_ascension(&stars.into_iter().map(color).collect::<Vec<_>>()),
			None => 0,
		};
		bag.eidolons = raw
			.eidolons
			.into_iter()
			.map(|v| OwnedImage::open(base.join(v.image)))
			.collect::<Result<_>>()?;
		for (key, value) in raw.trace_levels {
			bag.trace_levels.insert(key, value.resolve(base)?);
		}
		for (key, value) in raw.trace_unlocks {
			let unlocked = match value {
				Unlock::Flag(v) => v,
				Unlock::Pixel(v) => trace_unlocked(color(v)),
			};
			bag.trace_unlocks.insert(key, unlocked);
		}
		Ok(bag)
	}
}
