//! Relic substats: pairing recognized names with values, sanity checks against
//! the roll table, and canonical ordering.

use std::{fmt, sync::LazyLock};

use data::{Catalog, RollTable, stats::{PERCENT_SUFFIX, SUBSTAT_ORDER}};
use regex::Regex;
use serde::Serialize;

use crate::{
	error::ScanError,
	events::{LogLevel, Notifier},
};

/// Name distance above which the rest of the substat column is treated as noise.
const MAX_NAME_DISTANCE: usize = 3;

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("regex"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubstatValue {
	Flat(i64),
	Percent(f64),
}

impl SubstatValue {
	/// Key of this value in the roll table: integers as-is, percentages with at
	/// least one decimal (`10.0`, `3.9`).
	pub fn table_key(&self) -> String {
		match self {
			SubstatValue::Flat(v) => v.to_string(),
			SubstatValue::Percent(v) if v.fract() == 0.0 => format!("{v:.1}"),
			SubstatValue::Percent(v) => v.to_string(),
		}
	}
}

impl fmt::Display for SubstatValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.table_key())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Substat {
	/// Substat name, `_`-suffixed for percentage stats.
	pub key: String,
	pub value: SubstatValue,
}

impl Substat {
	pub fn new(key: impl Into<String>, value: SubstatValue) -> Self {
		Self {
			key: key.into(),
			value,
		}
	}
}

/// Split a recognized text column into lines, ignoring blank separator lines.
pub fn lines(text: &str) -> Vec<&str> {
	LINE_BREAKS.split(text).collect()
}

/// Pair substat names with their values, line by line.
///
/// Stops at the first empty name, at a name too far from any known substat, or
/// when the value column runs out.
pub fn parse_substats(names: &[&str], values: &[&str], catalog: &Catalog, notifier: &Notifier, uid: u32) -> Vec<Substat> {
	notifier.log(
		format!("Relic UID {uid}: Parsing substats. Substats: {names:?}, Values: {values:?}"),
		LogLevel::Trace,
	);

	let mut out = Vec::new();
	for (i, raw) in names.iter().enumerate() {
		if raw.is_empty() {
			break;
		}

		let (name, dist) = catalog.closest_sub_stat(raw);
		if dist > MAX_NAME_DISTANCE {
			notifier.log(
				format!("Relic UID {uid}: Substat {name} has a distance of {dist} from {raw}. Ignoring rest of substats."),
				LogLevel::Debug,
			);
			break;
		}

		let Some(value) = values.get(i) else {
			notifier.log(
				format!("Relic UID {uid}: Failed to get value for substat: {name}."),
				LogLevel::Error,
			);
			break;
		};

		let parsed = match value.split_once('%') {
			Some((number, _)) => number
				.parse::<f64>()
				.ok()
				.map(|v| (format!("{name}{PERCENT_SUFFIX}"), SubstatValue::Percent(v))),
			None => value.parse::<i64>().ok().map(|v| (name.clone(), SubstatValue::Flat(v))),
		};
		match parsed {
			Some((key, value)) => out.push(Substat::new(key, value)),
			None if dist == 0 => notifier.log(
				format!("Relic UID {uid}: Failed to get value for substat: {name}. Error parsing substat value: {value}."),
				LogLevel::Error,
			),
			None => notifier.log(
				format!("Relic UID {uid}: Dropping substat {name} with unreadable value {value}."),
				LogLevel::Debug,
			),
		}
	}
	out
}

/// First problem found by [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubstatIssue {
	TooFew { found: usize, min: i64 },
	Duplicate(String),
	Illegal { key: String, value: SubstatValue },
	TotalTooLow { total: f64, min: f64 },
	TotalTooHigh { total: f64, max: f64 },
}

impl fmt::Display for SubstatIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SubstatIssue::TooFew { found, min } => write!(f, "has {found} substat(s), but the minimum is {min}"),
			SubstatIssue::Duplicate(key) => write!(f, "more than one substat with key {key} parsed"),
			SubstatIssue::Illegal { key, value } => write!(f, "substat {key} has illegal value \"{value}\""),
			SubstatIssue::TotalTooLow { total, min } => write!(f, "has a roll value of {total}, but the minimum is {min}"),
			SubstatIssue::TotalTooHigh { total, max } => write!(f, "has a roll value of {total}, but the maximum is {max}"),
		}
	}
}

fn round1(v: f64) -> f64 {
	(v * 10.0).round() / 10.0
}

/// Minimum substat count for a relic of `rarity` at `level`.
pub fn min_substats(rarity: i64, level: i64) -> i64 {
	(rarity - 2 + level / 3).min(4)
}

/// Plausibility check of parsed substats. Advisory only: the caller logs the
/// issue and keeps the record.
pub fn validate(substats: &[Substat], rarity: u8, level: i64, rolls: &RollTable) -> Option<SubstatIssue> {
	let min = min_substats(rarity as i64, level);
	if (substats.len() as i64) < min {
		return Some(SubstatIssue::TooFew {
			found: substats.len(),
			min,
		});
	}

	let min_total = round1(min as f64 * 0.8);
	let max_total = round1((rarity as i64 - 1 + level / 3) as f64);

	let mut seen = Vec::with_capacity(substats.len());
	let mut total = 0.0;
	for substat in substats {
		if seen.contains(&substat.key.as_str()) {
			return Some(SubstatIssue::Duplicate(substat.key.clone()));
		}
		seen.push(substat.key.as_str());

		let Some(weight) = rolls.weight(rarity, &substat.key, &substat.value.table_key()) else {
			return Some(SubstatIssue::Illegal {
				key: substat.key.clone(),
				value: substat.value,
			});
		};
		total += weight;
	}

	let total = round1(total);
	if total < min_total {
		Some(SubstatIssue::TotalTooLow { total, min: min_total })
	} else if total > max_total {
		Some(SubstatIssue::TotalTooHigh { total, max: max_total })
	} else {
		None
	}
}

/// Put substats into in-game order. Returns whether anything moved, which
/// happens when a relic gained a substat on upgrade.
pub fn sort_substats(substats: &mut [Substat]) -> Result<bool, ScanError> {
	let mut ranked = Vec::with_capacity(substats.len());
	for substat in substats.iter() {
		let rank = SUBSTAT_ORDER
			.iter()
			.position(|v| *v == substat.key)
			.ok_or_else(|| ScanError::UnknownSubstat(substat.key.clone()))?;
		ranked.push(rank);
	}

	let sorted = ranked.is_sorted();
	if !sorted {
		substats.sort_by_key(|v| SUBSTAT_ORDER.iter().position(|k| *k == v.key));
	}
	Ok(!sorted)
}
