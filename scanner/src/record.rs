//! Parsed records, serialized with the field names of the scan document.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::substats::Substat;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelicRecord {
	pub set_id: String,
	/// Set name, not the piece name.
	pub name: String,
	pub slot: String,
	pub rarity: u8,
	pub level: i64,
	pub mainstat: String,
	pub substats: Vec<Substat>,
	pub location: String,
	pub lock: bool,
	pub discard: bool,
	#[serde(rename = "_uid")]
	pub uid: String,
	#[serde(skip)]
	pub owner_variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightConeRecord {
	pub id: String,
	pub name: String,
	pub level: i64,
	pub ascension: i64,
	pub superimposition: i64,
	pub location: String,
	pub lock: bool,
	#[serde(rename = "_uid")]
	pub uid: String,
	#[serde(skip)]
	pub owner_variant: Option<String>,
}

/// Ability levels without eidolon bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Skills {
	pub basic: i64,
	pub skill: i64,
	pub ult: i64,
	pub talent: i64,
}

impl Skills {
	pub fn slot(&mut self, key: &str) -> Option<&mut i64> {
		match key {
			"basic" => Some(&mut self.basic),
			"skill" => Some(&mut self.skill),
			"ult" => Some(&mut self.ult),
			"talent" => Some(&mut self.talent),
			_ => None,
		}
	}
}

/// Abilities of a Remembrance character's memosprite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemospriteSkills {
	pub skill: i64,
	pub talent: i64,
}

impl MemospriteSkills {
	pub fn slot(&mut self, key: &str) -> Option<&mut i64> {
		match key {
			"skill" => Some(&mut self.skill),
			"talent" => Some(&mut self.talent),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterRecord {
	pub id: String,
	pub name: String,
	pub path: String,
	pub level: i64,
	pub ascension: i64,
	pub eidolon: i64,
	pub skills: Skills,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub memosprite: Option<MemospriteSkills>,
	pub traces: BTreeMap<String, bool>,
	/// `M` or `F` for the Trailblazer.
	#[serde(skip)]
	pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedRecord {
	Relic(RelicRecord),
	LightCone(LightConeRecord),
}

impl ParsedRecord {
	pub fn uid(&self) -> &str {
		match self {
			ParsedRecord::Relic(v) => &v.uid,
			ParsedRecord::LightCone(v) => &v.uid,
		}
	}

	/// Body variant of the owner, known only for characters that have one.
	pub fn owner_variant(&self) -> Option<&str> {
		match self {
			ParsedRecord::Relic(v) => v.owner_variant.as_deref(),
			ParsedRecord::LightCone(v) => v.owner_variant.as_deref(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::substats::SubstatValue;

	#[test]
	fn test_relic_serializes_with_document_keys() {
		let record = RelicRecord {
			set_id: "101".into(),
			name: "Musketeer of Wild Wheat".into(),
			slot: "Head".into(),
			rarity: 5,
			level: 15,
			mainstat: "HP".into(),
			substats: vec![Substat::new("CRIT Rate_", SubstatValue::Percent(2.9))],
			location: String::new(),
			lock: true,
			discard: false,
			uid: "relic_3".into(),
			owner_variant: Some("F".into()),
		};
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["_uid"], "relic_3");
		assert_eq!(json["substats"][0]["key"], "CRIT Rate_");
		assert_eq!(json["substats"][0]["value"], 2.9);
		assert!(json.get("owner_variant").is_none());
	}

	#[test]
	fn test_character_serializes_memosprite_only_when_present() {
		let mut skills = Skills::default();
		*skills.slot("ult").unwrap() = 10;
		assert!(skills.slot("memosprite").is_none());

		let mut record = CharacterRecord {
			id: "1003".into(),
			name: "Himeko".into(),
			path: "Erudition".into(),
			level: 80,
			ascension: 6,
			eidolon: 0,
			skills,
			memosprite: None,
			traces: BTreeMap::from([("ability_1".to_owned(), true)]),
			variant: None,
		};
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["skills"]["ult"], 10);
		assert_eq!(json["traces"]["ability_1"], true);
		assert!(json.get("memosprite").is_none());
		assert!(json.get("variant").is_none());

		record.memosprite = Some(MemospriteSkills { skill: 5, talent: 4 });
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["memosprite"]["talent"], 4);
	}
}
