use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

pub const URL: &str = "https://raw.githubusercontent.com/kel-z/HSR-Data/v4/output/min/game_data_with_icons.json";

#[derive(Debug, Deserialize)]
pub struct GameData {
	pub version: String,
	pub relics: BTreeMap<String, RelicMeta>,
	pub light_cones: BTreeMap<String, LightConeMeta>,
	pub characters: BTreeMap<String, CharacterMeta>,
	#[serde(default)]
	pub mini_icons: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelicMeta {
	#[serde(deserialize_with = "super::id_string")]
	pub set_id: String,
	pub set: String,
	pub slot: String,
	#[serde(default)]
	pub rarity: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConeMeta {
	#[serde(deserialize_with = "super::id_string")]
	pub id: String,
	pub rarity: u8,
	#[serde(default)]
	pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterMeta {
	#[serde(default, deserialize_with = "super::id_string")]
	pub id: String,
	#[serde(default)]
	pub rarity: Option<u8>,
	#[serde(default)]
	pub path: Option<String>,
	/// Ability levels granted by the third and fifth eidolons.
	#[serde(default)]
	pub e3: BTreeMap<String, LevelBonus>,
	#[serde(default)]
	pub e5: BTreeMap<String, LevelBonus>,
}

/// `"skill": 2`, or `"memosprite": {"skill": 1}` for the memosprite's abilities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LevelBonus {
	Level(i64),
	Nested(BTreeMap<String, i64>),
}
