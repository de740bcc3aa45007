//! Cheap pre-screening of field bags before the full parse.
//!
//! Keys look like `min_rarity` or `max_level`: the part before the first `_`
//! is the comparison, the rest names the field it reads.

use std::collections::BTreeMap;

use crate::{
	error::{FilterError, ScanError},
	field::{Field, FieldBag, FieldValue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
	Min,
	Max,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
	pub key: String,
	pub kind: FilterKind,
	pub field: Field,
	pub threshold: i64,
}

impl Filter {
	pub fn parse(key: &str, threshold: i64) -> Result<Self, FilterError> {
		let Some((kind, field)) = key.split_once('_') else {
			return Err(FilterError::MalformedKey(key.to_owned()));
		};
		let kind = match kind {
			"min" => FilterKind::Min,
			"max" => FilterKind::Max,
			_ => {
				return Err(FilterError::UnknownKind {
					key: key.to_owned(),
					kind: kind.to_owned(),
				});
			}
		};
		let field = field.parse::<Field>().map_err(|_| FilterError::UnknownField {
			key: key.to_owned(),
			field: field.to_owned(),
		})?;

		Ok(Self {
			key: key.to_owned(),
			kind,
			field,
			threshold,
		})
	}

	pub fn passes(&self, value: i64) -> bool {
		match self.kind {
			FilterKind::Min => value >= self.threshold,
			FilterKind::Max => value <= self.threshold,
		}
	}

	/// A `min_*` filter at or below `floor` holds for every record.
	pub fn is_trivial_min(&self, floor: i64) -> bool {
		self.kind == FilterKind::Min && self.threshold <= floor
	}
}

/// Validated filter set, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
	filters: Vec<Filter>,
}

impl FilterSpec {
	pub fn parse(raw: &BTreeMap<String, i64>) -> Result<Self, FilterError> {
		let filters = raw
			.iter()
			.map(|(key, threshold)| Filter::parse(key, *threshold))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self { filters })
	}

	pub fn iter(&self) -> impl Iterator<Item = &Filter> {
		self.filters.iter()
	}

	pub fn threshold(&self, key: &str) -> Option<i64> {
		self.filters.iter().find(|v| v.key == key).map(|v| v.threshold)
	}

	pub fn is_empty(&self) -> bool {
		self.filters.is_empty()
	}
}

/// Pass/fail per filter key.
pub type FilterResults = BTreeMap<String, bool>;

pub fn all_passed(results: &FilterResults) -> bool {
	results.values().all(|v| *v)
}

/// What resolving a filter's field produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
	Value(i64),
	/// Field unreadable or not worth reading; counts as a pass.
	Satisfied,
}

/// Evaluate every filter against `bag`.
///
/// Fields that already hold an integer are compared directly. Anything else
/// goes through `resolve`, which may write resolved values back into the bag.
pub fn evaluate<F>(filters: &FilterSpec, bag: &mut FieldBag, mut resolve: F) -> Result<FilterResults, ScanError>
where
	F: FnMut(&Filter, &mut FieldBag) -> Result<Resolved, ScanError>,
{
	let mut results = FilterResults::new();
	for filter in filters.iter() {
		let resolved = match bag.get(filter.field) {
			Some(FieldValue::Int(v)) => Resolved::Value(*v),
			_ => resolve(filter, bag)?,
		};
		let passed = match resolved {
			Resolved::Value(v) => filter.passes(v),
			Resolved::Satisfied => true,
		};
		results.insert(filter.key.clone(), passed);
	}
	Ok(results)
}

/// Inventory sort order the game offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMethod {
	Level,
	Rarity,
	DateObtained,
}

impl SortMethod {
	/// Label of the sort option in the game UI.
	pub fn label(&self) -> &'static str {
		match self {
			SortMethod::Level => "Lv",
			SortMethod::Rarity => "Rarity",
			SortMethod::DateObtained => "Date Obtained",
		}
	}
}
