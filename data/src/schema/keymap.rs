use std::collections::HashMap;

use serde::Deserialize;

pub const URL: &str = "https://raw.githubusercontent.com/kel-z/HSR-Data/v4/output/min/sro_key_map.json";

/// Display name to exporter key, per record kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyMap {
	#[serde(default)]
	pub relic_sets: HashMap<String, String>,
	#[serde(default)]
	pub light_cones: HashMap<String, String>,
	#[serde(default)]
	pub characters: HashMap<String, String>,
}
