pub mod gamedata;
pub mod keymap;

use serde::{Deserialize, Deserializer};

/// Ids in the reference document are numbers for some entries and strings for others.
pub(crate) fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Number(serde_json::Number),
	}

	Ok(match Raw::deserialize(deserializer)? {
		Raw::Text(s) => s,
		Raw::Number(n) => n.to_string(),
	})
}
