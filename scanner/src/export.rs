//! Scan documents: the native format and the SRO optimizer format.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use data::KeyMap;
use serde::Serialize;

use crate::{
	record::{CharacterRecord, LightConeRecord, ParsedRecord, RelicRecord},
	substats::SubstatValue,
};

pub const SOURCE: &str = "HSR-Scanner";
pub const BUILD: &str = concat!("v", env!("CARGO_PKG_VERSION"));
pub const FORMAT_VERSION: u32 = 4;
pub const SRO_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Trailblazer {
	#[default]
	Stelle,
	Caelus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
	pub uid: Option<u64>,
	pub trailblazer: Trailblazer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanDocument {
	pub source: &'static str,
	pub build: &'static str,
	pub version: u32,
	pub metadata: Metadata,
	pub light_cones: Vec<LightConeRecord>,
	pub relics: Vec<RelicRecord>,
	pub characters: Vec<CharacterRecord>,
}

impl ScanDocument {
	pub fn new(uid: Option<u64>, records: impl IntoIterator<Item = ParsedRecord>) -> Self {
		let mut trailblazer = Trailblazer::default();
		let mut light_cones = Vec::new();
		let mut relics = Vec::new();
		for record in records {
			trailblazer.update(record.owner_variant());
			match record {
				ParsedRecord::Relic(v) => relics.push(v),
				ParsedRecord::LightCone(v) => light_cones.push(v),
			}
		}

		Self {
			source: SOURCE,
			build: BUILD,
			version: FORMAT_VERSION,
			metadata: Metadata { uid, trailblazer },
			light_cones,
			relics,
			characters: Vec::new(),
		}
	}

	/// Add the roster. It is scanned after the inventories, so a Trailblazer
	/// seen there decides the body.
	pub fn with_characters(mut self, characters: Vec<CharacterRecord>) -> Self {
		for character in &characters {
			self.metadata.trailblazer.update(character.variant.as_deref());
		}
		self.characters = characters;
		self
	}
}

impl Trailblazer {
	fn update(&mut self, variant: Option<&str>) {
		match variant {
			Some("F") => *self = Trailblazer::Stelle,
			Some("M") => *self = Trailblazer::Caelus,
			_ => {}
		}
	}
}

const SRO_SLOTS: [(&str, &str); 6] = [
	("Head", "head"),
	("Hands", "hand"),
	("Body", "body"),
	("Feet", "feet"),
	("Planar Sphere", "sphere"),
	("Link Rope", "rope"),
];

const SRO_MAIN_STATS: [(&str, &str); 17] = [
	("SPD", "spd"),
	("HP", "hp"),
	("ATK", "atk"),
	("DEF", "def"),
	("Break Effect", "brEff"),
	("Effect Hit Rate", "eff"),
	("Energy Regeneration Rate", "enerRegen"),
	("Outgoing Healing Boost", "heal"),
	("Physical DMG Boost", "physical_dmg"),
	("Fire DMG Boost", "fire_dmg"),
	("Ice DMG Boost", "ice_dmg"),
	("Wind DMG Boost", "wind_dmg"),
	("Lightning DMG Boost", "lightning_dmg"),
	("Quantum DMG Boost", "quantum_dmg"),
	("Imaginary DMG Boost", "imaginary_dmg"),
	("CRIT Rate", "crit"),
	("CRIT DMG", "crit_dmg"),
];

const SRO_SUB_STATS: [(&str, &str); 12] = [
	("HP", "hp"),
	("ATK", "atk"),
	("DEF", "def"),
	("HP_", "hp_"),
	("ATK_", "atk_"),
	("DEF_", "def_"),
	("SPD", "spd"),
	("CRIT Rate_", "crit_"),
	("CRIT DMG_", "crit_dmg_"),
	("Effect Hit Rate_", "eff_"),
	("Effect RES_", "eff_res_"),
	("Break Effect_", "brEff_"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
	table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SroDocument {
	pub format: &'static str,
	pub source: &'static str,
	pub version: u32,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub relics: Vec<SroRelic>,
	#[serde(rename = "lightCones", skip_serializing_if = "Vec::is_empty")]
	pub light_cones: Vec<SroLightCone>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub characters: Vec<SroCharacter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SroRelic {
	pub set_key: String,
	pub slot_key: &'static str,
	pub level: i64,
	pub rarity: u8,
	pub mainstat: String,
	pub location: String,
	pub lock: bool,
	pub discard: bool,
	pub substats: Vec<SroSubstat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SroSubstat {
	pub key: &'static str,
	pub value: SubstatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SroLightCone {
	pub key: String,
	pub level: i64,
	pub ascension: i64,
	pub superimpose: i64,
	pub location: String,
	pub lock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SroCharacter {
	pub key: String,
	pub level: i64,
	pub eidolon: i64,
	pub ascension: i64,
	pub basic: i64,
	pub skill: i64,
	pub ult: i64,
	pub talent: i64,
	pub bonus_abilities: BTreeMap<u8, bool>,
	pub stat_boosts: BTreeMap<u8, bool>,
}

/// `prefix_1..=count` trace unlocks renumbered from 1. Missing nodes are locked.
fn numbered(traces: &BTreeMap<String, bool>, prefix: &str, count: u8) -> BTreeMap<u8, bool> {
	(1..=count)
		.map(|i| (i, traces.get(&format!("{prefix}_{i}")).copied().unwrap_or(false)))
		.collect()
}

/// Convert a native document with the exporter key map.
pub fn to_sro(doc: &ScanDocument, keys: &KeyMap) -> Result<SroDocument> {
	let character = |name: &str| -> Result<String> {
		if name.is_empty() {
			return Ok(String::new());
		}
		keys.characters
			.get(name)
			.cloned()
			.with_context(|| format!("no SRO key for character {name}"))
	};

	let mut relics = Vec::with_capacity(doc.relics.len());
	for relic in &doc.relics {
		let mut mainstat = lookup(&SRO_MAIN_STATS, &relic.mainstat)
			.with_context(|| format!("no SRO key for main stat {}", relic.mainstat))?
			.to_owned();
		// flat main stats only exist on head and hands, and SPD is always flat
		if !matches!(relic.slot.as_str(), "Head" | "Hands") && relic.mainstat != "SPD" {
			mainstat.push('_');
		}

		let substats = relic
			.substats
			.iter()
			.filter_map(|v| {
				let key = lookup(&SRO_SUB_STATS, &v.key)?;
				let value = match v.value {
					SubstatValue::Percent(p) => SubstatValue::Percent((p / 100.0 * 1000.0).round() / 1000.0),
					flat => flat,
				};
				Some(SroSubstat { key, value })
			})
			.collect();

		relics.push(SroRelic {
			set_key: keys
				.relic_sets
				.get(&relic.name)
				.cloned()
				.with_context(|| format!("no SRO key for relic set {}", relic.name))?,
			slot_key: lookup(&SRO_SLOTS, &relic.slot).with_context(|| format!("unknown slot {}", relic.slot))?,
			level: relic.level,
			rarity: relic.rarity,
			mainstat,
			location: character(&relic.location)?,
			lock: relic.lock,
			discard: relic.discard,
			substats,
		});
	}

	let mut light_cones = Vec::with_capacity(doc.light_cones.len());
	for cone in &doc.light_cones {
		light_cones.push(SroLightCone {
			key: keys
				.light_cones
				.get(&cone.name)
				.cloned()
				.with_context(|| format!("no SRO key for light cone {}", cone.name))?,
			level: cone.level,
			ascension: cone.ascension,
			superimpose: cone.superimposition,
			location: character(&cone.location)?,
			lock: cone.lock,
		});
	}

	let mut characters = Vec::with_capacity(doc.characters.len());
	for c in &doc.characters {
		// keyed by id, with the name as a fallback
		let key = keys
			.characters
			.get(&c.id)
			.or_else(|| keys.characters.get(&c.name))
			.cloned()
			.with_context(|| format!("no SRO key for character {} ({})", c.name, c.id))?;
		characters.push(SroCharacter {
			key,
			level: c.level,
			eidolon: c.eidolon,
			ascension: c.ascension,
			basic: c.skills.basic,
			skill: c.skills.skill,
			ult: c.skills.ult,
			talent: c.skills.talent,
			bonus_abilities: numbered(&c.traces, "ability", 3),
			stat_boosts: numbered(&c.traces, "stat", 10),
		});
	}

	Ok(SroDocument {
		format: "SRO",
		source: SOURCE,
		version: SRO_VERSION,
		relics,
		light_cones,
		characters,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{record::Skills, substats::Substat};

	fn relic(slot: &str, mainstat: &str, variant: Option<&str>) -> RelicRecord {
		RelicRecord {
			set_id: "101".into(),
			name: "Musketeer of Wild Wheat".into(),
			slot: slot.into(),
			rarity: 5,
			level: 15,
			mainstat: mainstat.into(),
			substats: vec![
				Substat::new("HP", SubstatValue::Flat(38)),
				Substat::new("CRIT Rate_", SubstatValue::Percent(2.9)),
			],
			location: if variant.is_some() { "TrailblazerHarmony".into() } else { String::new() },
			lock: true,
			discard: false,
			uid: "relic_1".into(),
			owner_variant: variant.map(Into::into),
		}
	}

	fn cone() -> LightConeRecord {
		LightConeRecord {
			id: "20004".into(),
			name: "Void".into(),
			level: 80,
			ascension: 6,
			superimposition: 5,
			location: String::new(),
			lock: false,
			uid: "light_cone_1".into(),
			owner_variant: None,
		}
	}

	fn keys() -> KeyMap {
		let mut keys = KeyMap::default();
		keys.relic_sets.insert("Musketeer of Wild Wheat".into(), "MusketeerOfWildWheat".into());
		keys.light_cones.insert("Void".into(), "Void".into());
		keys.characters.insert("TrailblazerHarmony".into(), "TrailblazerHarmony".into());
		keys.characters.insert("1003".into(), "Himeko".into());
		keys
	}

	fn himeko(variant: Option<&str>) -> CharacterRecord {
		CharacterRecord {
			id: "1003".into(),
			name: "Himeko".into(),
			path: "Erudition".into(),
			level: 80,
			ascension: 6,
			eidolon: 1,
			skills: Skills { basic: 6, skill: 10, ult: 9, talent: 8 },
			memosprite: None,
			traces: BTreeMap::from([
				("ability_1".to_owned(), true),
				("ability_3".to_owned(), true),
				("stat_2".to_owned(), true),
				("stat_4".to_owned(), false),
			]),
			variant: variant.map(Into::into),
		}
	}

	#[test]
	fn test_native_document() {
		let doc = ScanDocument::new(
			Some(800000001),
			vec![
				ParsedRecord::Relic(relic("Feet", "SPD", Some("M"))),
				ParsedRecord::LightCone(cone()),
			],
		);
		assert_eq!(doc.relics.len(), 1);
		assert_eq!(doc.light_cones.len(), 1);
		assert_eq!(doc.metadata.trailblazer, Trailblazer::Caelus);

		let json = serde_json::to_value(&doc).unwrap();
		assert_eq!(json["source"], "HSR-Scanner");
		assert_eq!(json["version"], 4);
		assert_eq!(json["metadata"]["uid"], 800000001);
		assert_eq!(json["metadata"]["trailblazer"], "Caelus");
		assert_eq!(json["light_cones"][0]["_uid"], "light_cone_1");
		assert_eq!(json["characters"], serde_json::json!([]));
	}

	#[test]
	fn test_roster_decides_trailblazer() {
		let doc = ScanDocument::new(None, vec![ParsedRecord::Relic(relic("Feet", "SPD", Some("M")))])
			.with_characters(vec![himeko(None), himeko(Some("F"))]);
		assert_eq!(doc.metadata.trailblazer, Trailblazer::Stelle);
		assert_eq!(doc.characters.len(), 2);

		let json = serde_json::to_value(&doc).unwrap();
		assert_eq!(json["characters"][0]["skills"]["talent"], 8);
		assert_eq!(json["characters"][0]["path"], "Erudition");
	}

	#[test]
	fn test_sro_character() {
		let doc = ScanDocument::new(None, Vec::new()).with_characters(vec![himeko(None)]);
		let sro = to_sro(&doc, &keys()).unwrap();
		let c = &sro.characters[0];
		assert_eq!(c.key, "Himeko");
		assert_eq!((c.level, c.eidolon, c.ascension), (80, 1, 6));
		assert_eq!((c.basic, c.skill, c.ult, c.talent), (6, 10, 9, 8));
		assert_eq!(c.bonus_abilities, BTreeMap::from([(1, true), (2, false), (3, true)]));
		assert_eq!(c.stat_boosts.len(), 10);
		assert!(c.stat_boosts[&2]);
		assert!(!c.stat_boosts[&4]);

		let json = serde_json::to_value(&sro).unwrap();
		assert_eq!(json["characters"][0]["bonusAbilities"]["1"], true);
		assert_eq!(json["characters"][0]["statBoosts"]["10"], false);
		assert!(json.get("relics").is_none());

		assert!(to_sro(&doc, &KeyMap::default()).is_err());
	}

	#[test]
	fn test_default_trailblazer() {
		let doc = ScanDocument::new(None, Vec::new());
		assert_eq!(doc.metadata.trailblazer, Trailblazer::Stelle);
	}

	#[test]
	fn test_sro_relic() {
		let doc = ScanDocument::new(None, vec![ParsedRecord::Relic(relic("Body", "CRIT DMG", Some("F")))]);
		let sro = to_sro(&doc, &keys()).unwrap();
		let relic = &sro.relics[0];
		assert_eq!(relic.set_key, "MusketeerOfWildWheat");
		assert_eq!(relic.slot_key, "body");
		assert_eq!(relic.mainstat, "crit_dmg_");
		assert_eq!(relic.location, "TrailblazerHarmony");
		assert_eq!(relic.substats[0], SroSubstat { key: "hp", value: SubstatValue::Flat(38) });
		assert_eq!(relic.substats[1], SroSubstat { key: "crit_", value: SubstatValue::Percent(0.029) });

		let json = serde_json::to_value(&sro).unwrap();
		assert_eq!(json["format"], "SRO");
		assert!(json.get("lightCones").is_none());
		assert_eq!(json["relics"][0]["slotKey"], "body");
	}

	#[test]
	fn test_sro_flat_main_stats() {
		let doc = ScanDocument::new(
			None,
			vec![
				ParsedRecord::Relic(relic("Head", "HP", None)),
				ParsedRecord::Relic(relic("Feet", "SPD", None)),
			],
		);
		let sro = to_sro(&doc, &keys()).unwrap();
		assert_eq!(sro.relics[0].mainstat, "hp");
		assert_eq!(sro.relics[0].location, "");
		assert_eq!(sro.relics[1].mainstat, "spd");
	}

	#[test]
	fn test_sro_light_cone_and_missing_keys() {
		let doc = ScanDocument::new(None, vec![ParsedRecord::LightCone(cone())]);
		let sro = to_sro(&doc, &keys()).unwrap();
		assert_eq!(sro.light_cones[0].key, "Void");
		assert_eq!(sro.light_cones[0].superimpose, 5);

		assert!(to_sro(&doc, &KeyMap::default()).is_err());
	}
}
