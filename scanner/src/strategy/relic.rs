use ie::OwnedImage;

use super::{Context, ParseStrategy, integer, require, text};
use crate::{
	error::ScanError,
	events::{Increment, LogLevel},
	extract::RecordKind,
	field::{Field, FieldBag, FieldValue},
	filter::{self, Filter, FilterResults, FilterSpec, Resolved, SortMethod},
	record::{ParsedRecord, RelicRecord},
	substats,
};

const LOCK_CONFIDENCE: f32 = 0.3;
const DISCARD_CONFIDENCE: f32 = 0.3;

/// Stand-in when the name is unreadable, so the record still gets set metadata.
const FALLBACK_NAME: &str = "Musketeer's Wild Wheat Felt Hat";

pub struct RelicStrategy {
	ctx: Context,
	discard_icon: OwnedImage,
}

impl RelicStrategy {
	pub fn new(ctx: Context, discard_icon: OwnedImage) -> Self {
		Self { ctx, discard_icon }
	}

	fn log(&self, uid: u32, message: impl AsRef<str>, level: LogLevel) {
		self.ctx.log(RecordKind::Relic, uid, message, level);
	}

	fn resolve_filter(&self, filter: &Filter, bag: &mut FieldBag, uid: u32) -> Result<Resolved, ScanError> {
		match filter.field {
			Field::Rarity => {
				// every relic is at least 2 stars
				if filter.is_trivial_min(2) {
					return Ok(Resolved::Satisfied);
				}
				let value = self.ctx.resolve(RecordKind::Relic, bag, Field::Rarity)?;
				integer(filter, value).map(Resolved::Value)
			}
			Field::Level => {
				if filter.is_trivial_min(0) {
					return Ok(Resolved::Satisfied);
				}
				let value = self.ctx.resolve(RecordKind::Relic, bag, Field::Level)?;
				if value.is_pending() || value.is_blank() {
					self.log(uid, "Failed to parse level. Setting to 0.", LogLevel::Error);
					bag.insert(Field::Level, 0);
					return Ok(Resolved::Satisfied);
				}
				let level = integer(filter, value)?;
				bag.insert(Field::Level, level);
				Ok(Resolved::Value(level))
			}
			field => {
				let value = self.ctx.resolve(RecordKind::Relic, bag, field)?;
				integer(filter, value).map(Resolved::Value)
			}
		}
	}

	fn build(&self, bag: &mut FieldBag, uid: u32) -> Result<RelicRecord, ScanError> {
		let catalog = &self.ctx.catalog;

		let (mut name, _) = catalog.closest_relic_name(&text(require(bag, Field::Name)?));
		let (mut mainstat, _) = catalog.closest_main_stat(&text(require(bag, Field::MainStat)?));

		let level = require(bag, Field::Level)?;
		let level = if level.is_pending() || level.is_blank() {
			self.log(uid, "Failed to extract level. Setting to 0.", LogLevel::Error);
			0
		} else {
			level.to_int().ok_or_else(|| ScanError::NotAnInteger {
				key: Field::Level.to_string(),
				value: text(level),
			})?
		};

		if name.is_empty() {
			self.log(
				uid,
				format!("Failed to extract name. Setting to \"{FALLBACK_NAME}\"."),
				LogLevel::Error,
			);
			name = FALLBACK_NAME.to_owned();
		}

		let rarity = require(bag, Field::Rarity)?
			.to_int()
			.and_then(|v| u8::try_from(v).ok())
			.ok_or(ScanError::Unresolved(Field::Rarity))?;

		let names = text(require(bag, Field::SubstatNames)?);
		let values = text(require(bag, Field::SubstatVals)?);
		let mut substats = substats::parse_substats(
			&substats::lines(&names),
			&substats::lines(&values),
			catalog,
			&self.ctx.notifier,
			uid,
		);
		if let Some(issue) = substats::validate(&substats, rarity, level, catalog.rolls()) {
			self.log(
				uid,
				format!("{issue} (rarity {rarity}, level {level})."),
				LogLevel::Error,
			);
		}
		if substats::sort_substats(&mut substats)? {
			self.log(uid, "Newly upgraded relic detected. Substats have been sorted.", LogLevel::Info);
		}

		let meta = catalog.relic(&name).ok_or_else(|| ScanError::UnknownName {
			kind: "relic",
			name: name.clone(),
		})?;
		match meta.slot.as_str() {
			"Hands" => mainstat = "ATK".to_owned(),
			"Head" => mainstat = "HP".to_owned(),
			_ if mainstat.is_empty() => {
				self.log(uid, "Failed to extract main stat. Setting to ATK.", LogLevel::Error);
				mainstat = "ATK".to_owned();
			}
			_ => {}
		}

		let lock = self
			.ctx
			.icon_present(RecordKind::Relic, uid, bag, Field::Lock, &self.ctx.lock_icon, LOCK_CONFIDENCE);
		let discard = self
			.ctx
			.icon_present(RecordKind::Relic, uid, bag, Field::Discard, &self.discard_icon, DISCARD_CONFIDENCE);
		let (location, owner_variant) = self.ctx.owner(RecordKind::Relic, uid, bag)?;

		Ok(RelicRecord {
			set_id: meta.set_id.clone(),
			name: meta.set.clone(),
			slot: meta.slot.clone(),
			rarity,
			level,
			mainstat,
			substats,
			location,
			lock,
			discard,
			uid: format!("relic_{uid}"),
			owner_variant,
		})
	}
}

impl ParseStrategy for RelicStrategy {
	fn kind(&self) -> RecordKind {
		RecordKind::Relic
	}

	fn added(&self) -> Increment {
		Increment::RelicAdd
	}

	fn optimal_sort_method(&self, filters: &FilterSpec) -> SortMethod {
		if filters.threshold("min_level").unwrap_or(0) > 0 {
			SortMethod::Level
		} else {
			SortMethod::Rarity
		}
	}

	fn check_filters(&self, bag: &mut FieldBag, filters: &FilterSpec, uid: u32) -> Result<FilterResults, ScanError> {
		filter::evaluate(filters, bag, |filter, bag| self.resolve_filter(filter, bag, uid))
	}

	fn extract_field(&self, field: Field, value: FieldValue) -> Result<FieldValue, ScanError> {
		self.ctx.extractor().extract(RecordKind::Relic, field, value)
	}

	fn parse(&self, bag: FieldBag, uid: u32) -> Option<ParsedRecord> {
		let record = self.ctx.run_parse(RecordKind::Relic, bag, uid, |bag| self.build(bag, uid))?;
		self.ctx.notifier.progress(Increment::RelicSuccess);
		Some(ParsedRecord::Relic(record))
	}
}
