//! Substat roll-value table.
//!
//! `rarity -> substat key -> displayed value -> weight`. A displayed value that can
//! come from several roll combinations maps to a list of weights; lookups always
//! take the smallest of them, which keeps the roll total a lower bound.
//!
//! The table ships with the crate (`assets/substat_rolls.json`). Each roll weighs
//! 0.8, 0.9 or 1.0 by quality tier; displayed values are listed both truncated
//! and rounded.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

const BUNDLED: &str = include_str!("../assets/substat_rolls.json");

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RollWeight {
	Single(f64),
	Ambiguous(Vec<f64>),
}

impl RollWeight {
	/// The weight used for validation; the minimum for ambiguous values.
	pub fn assumed(&self) -> f64 {
		match self {
			Self::Single(v) => *v,
			Self::Ambiguous(v) => v.iter().copied().fold(f64::INFINITY, f64::min),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RollTable(HashMap<String, HashMap<String, HashMap<String, RollWeight>>>);

impl RollTable {
	/// Parse a roll table. A table without any rarity is rejected, since every
	/// substat would then read as illegal.
	pub fn from_json(json: &str) -> Result<Self> {
		let table: Self = serde_json::from_str(json).context("Decode substat roll table")?;
		if table.0.values().all(HashMap::is_empty) {
			anyhow::bail!("substat roll table is empty");
		}
		Ok(table)
	}

	pub fn bundled() -> Result<Self> {
		Self::from_json(BUNDLED)
	}

	/// Weight of a displayed `value` for `key`, or `None` if the combination is illegal.
	pub fn weight(&self, rarity: u8, key: &str, value: &str) -> Option<f64> {
		self.0
			.get(&rarity.to_string())?
			.get(key)?
			.get(value)
			.map(RollWeight::assumed)
	}
}
