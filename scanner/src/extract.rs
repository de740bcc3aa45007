//! Turning pending image regions into scalar field values.

use std::sync::LazyLock;

use data::Catalog;
use ie::{Layout, OwnedImage, Preprocess, Recognition, TextRecognizer};
use regex::Regex;

use crate::{
	error::ScanError,
	field::{Field, FieldValue},
};

/// Which inventory a record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
	Relic,
	LightCone,
}

impl RecordKind {
	/// Label used in log lines, e.g. `Relic UID 4: ...`.
	pub fn label(&self) -> &'static str {
		match self {
			RecordKind::Relic => "Relic",
			RecordKind::LightCone => "Light Cone",
		}
	}
}

const ITEM_NAME: Recognition = Recognition::new(
	"ABCDEFGHIJKLMNOPQRSTUVWXYZ 'abcedfghijklmnopqrstuvwxyz-",
	Layout::Block,
	Preprocess::None,
);
const RELIC_LEVEL: Recognition = Recognition::new("0123456789S", Layout::Line, Preprocess::None);
const RELIC_MAIN_STAT: Recognition = Recognition::new(
	"ABCDEFGHIJKLMNOPQRSTUVWXYZ abcedfghijklmnopqrstuvwxyz",
	Layout::Line,
	Preprocess::MainStat,
);
const RELIC_EQUIPPED: Recognition = Recognition::new("Equiped", Layout::Line, Preprocess::Equipped);
const SUBSTAT_NAMES: Recognition = Recognition::new(" ABCDEFGHIKMPRSTacefikrt", Layout::Block, Preprocess::SubStat);
const SUBSTAT_VALS: Recognition = Recognition::new("0123456789S.%,", Layout::Block, Preprocess::SubStat);
const LIGHT_CONE_LEVEL: Recognition = Recognition::new("0123456789S/", Layout::Line, Preprocess::LightConeLevel);
const SUPERIMPOSITION: Recognition = Recognition::new("12345S", Layout::Char, Preprocess::Superimposition);
const LIGHT_CONE_EQUIPPED: Recognition = Recognition::new("Equipped", Layout::Line, Preprocess::Equipped);

static REPEATED_DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").expect("regex"));

/// Recognition request for a field, or `None` when the field stays an image.
pub fn recognition(kind: RecordKind, field: Field) -> Option<&'static Recognition> {
	match (kind, field) {
		(_, Field::Name) => Some(&ITEM_NAME),
		(RecordKind::Relic, Field::Level) => Some(&RELIC_LEVEL),
		(RecordKind::Relic, Field::MainStat) => Some(&RELIC_MAIN_STAT),
		(RecordKind::Relic, Field::Equipped) => Some(&RELIC_EQUIPPED),
		(RecordKind::Relic, Field::SubstatNames) => Some(&SUBSTAT_NAMES),
		(RecordKind::Relic, Field::SubstatVals) => Some(&SUBSTAT_VALS),
		(RecordKind::LightCone, Field::Level) => Some(&LIGHT_CONE_LEVEL),
		(RecordKind::LightCone, Field::Superimposition) => Some(&SUPERIMPOSITION),
		(RecordKind::LightCone, Field::Equipped) => Some(&LIGHT_CONE_EQUIPPED),
		_ => None,
	}
}

/// Shared by both strategies: the catalog for corrections and the recognizer.
pub struct Extractor<'a> {
	pub catalog: &'a Catalog,
	pub recognizer: &'a dyn TextRecognizer,
}

impl Extractor<'_> {
	/// Resolve one field. Scalars come back untouched, as do image fields that are
	/// only ever matched against icons.
	pub fn extract(&self, kind: RecordKind, field: Field, value: FieldValue) -> Result<FieldValue, ScanError> {
		let FieldValue::Pending(image) = value else {
			return Ok(value);
		};

		if kind == RecordKind::Relic && field == Field::Rarity {
			return self.rarity(&image).map(FieldValue::Int);
		}

		let Some(request) = recognition(kind, field) else {
			return Ok(FieldValue::Pending(image));
		};
		let text = self
			.recognizer
			.recognize(image.as_image(), request)
			.map_err(|reason| ScanError::Recognition { field, reason })?;

		let text = match (kind, field) {
			(RecordKind::LightCone, Field::Name) => self.catalog.closest_light_cone_name(&text).0,
			(_, Field::Level | Field::Superimposition) => text.replace('S', "5"),
			(_, Field::SubstatVals) => {
				let text = text.replace('S', "5").replace(',', ".");
				REPEATED_DOTS.replace_all(&text, ".").into_owned()
			}
			_ => text,
		};
		tracing::trace!(%field, text, "recognized");
		Ok(FieldValue::Text(text))
	}

	fn rarity(&self, image: &OwnedImage) -> Result<i64, ScanError> {
		let pixel = image
			.as_image()
			.center_pixel()
			.ok_or(ScanError::Unresolved(Field::Rarity))?;
		Ok(self.catalog.closest_rarity(pixel.to_array()) as i64)
	}
}
