use std::{
	collections::{BTreeMap, HashMap},
	io::Read,
	sync::OnceLock,
};

use anyhow::{Context, Result};

pub mod fuzzy;
mod rolls;
mod schema;
pub mod stats;

pub use fuzzy::{NO_MATCH, Vocabulary, closest_match};
pub use rolls::{RollTable, RollWeight};
pub use schema::gamedata::{CharacterMeta, LevelBonus, LightConeMeta, RelicMeta};
pub use schema::keymap::KeyMap;

pub const GAME_DATA_URL: &str = schema::gamedata::URL;
pub const KEY_MAP_URL: &str = schema::keymap::URL;

/// Reference data for the scanner, loaded once at startup.
///
/// Everything is read-only after construction except the derived character
/// vocabularies and the key map, which are computed or fetched on first use.
pub struct Catalog {
	pub version: String,
	relics: BTreeMap<String, RelicMeta>,
	light_cones: BTreeMap<String, LightConeMeta>,
	characters: BTreeMap<String, CharacterMeta>,
	mini_icons: HashMap<String, String>,
	rolls: RollTable,

	key_map_url: String,
	key_map: OnceLock<KeyMap>,
	character_keys: OnceLock<Vec<String>>,
	character_names: OnceLock<Vec<String>>,
}

impl Catalog {
	fn from_game_data(data: schema::gamedata::GameData) -> Result<Self> {
		Ok(Self {
			version: data.version,
			relics: data.relics,
			light_cones: data.light_cones,
			characters: data.characters,
			mini_icons: data.mini_icons,
			rolls: RollTable::bundled()?,

			key_map_url: KEY_MAP_URL.to_owned(),
			key_map: OnceLock::new(),
			character_keys: OnceLock::new(),
			character_names: OnceLock::new(),
		})
	}

	pub fn from_json(json: &str) -> Result<Self> {
		let data = serde_json::from_str(json).context("Decode game data JSON")?;
		Self::from_game_data(data)
	}

	pub fn from_reader(reader: impl Read) -> Result<Self> {
		let data = serde_json::from_reader(reader).context("Decode game data JSON")?;
		Self::from_game_data(data)
	}

	/// Fetch the reference document. There is no degraded mode: any failure is fatal.
	pub fn fetch(url: &str) -> Result<Self> {
		let mut res = ureq::get(url)
			.call()
			.with_context(|| format!("GET {url}"))?;
		let data = res
			.body_mut()
			.read_json::<schema::gamedata::GameData>()
			.context("Decode game data JSON")?;

		let catalog = Self::from_game_data(data)?;
		tracing::info!(version = %catalog.version, relics = catalog.relics.len(), light_cones = catalog.light_cones.len(), "loaded game data");
		Ok(catalog)
	}

	/// Replace the bundled roll table, e.g. with one regenerated after a game update.
	pub fn with_rolls(mut self, rolls: RollTable) -> Self {
		self.rolls = rolls;
		self
	}

	pub fn with_key_map_url(mut self, url: impl Into<String>) -> Self {
		self.key_map_url = url.into();
		self
	}

	/// Exporter key map, fetched on first request and kept for the process lifetime.
	pub fn key_map(&self) -> Result<&KeyMap> {
		if let Some(map) = self.key_map.get() {
			return Ok(map);
		}

		let url = &self.key_map_url;
		let mut res = ureq::get(url)
			.call()
			.with_context(|| format!("GET {url}"))?;
		let map = res
			.body_mut()
			.read_json::<KeyMap>()
			.context("Decode key map JSON")?;

		// A concurrent first call may have won; either copy is the same document.
		Ok(self.key_map.get_or_init(|| map))
	}

	/// Install a key map without touching the network.
	pub fn preload_key_map(&self, map: KeyMap) {
		let _ = self.key_map.set(map);
	}

	pub fn relic(&self, name: &str) -> Option<&RelicMeta> {
		self.relics.get(name)
	}

	pub fn light_cone(&self, name: &str) -> Option<&LightConeMeta> {
		self.light_cones.get(name)
	}

	pub fn character(&self, name: &str) -> Option<&CharacterMeta> {
		self.characters.get(name)
	}

	/// Characters with one entry per path are keyed `<name><path>`, e.g.
	/// `TrailblazerHarmony` or `March 7thHunt`; everyone else by bare name.
	pub fn character_on_path(&self, name: &str, path: &str) -> Option<&CharacterMeta> {
		self.character(&format!("{name}{}", path_suffix(path)))
			.or_else(|| self.character(name))
	}

	pub fn mini_icons(&self) -> &HashMap<String, String> {
		&self.mini_icons
	}

	pub fn rolls(&self) -> &RollTable {
		&self.rolls
	}

	pub fn closest_relic_name(&self, name: &str) -> (String, usize) {
		closest_match(name, &self.relics)
	}

	pub fn closest_light_cone_name(&self, name: &str) -> (String, usize) {
		closest_match(name, &self.light_cones)
	}

	pub fn closest_main_stat(&self, name: &str) -> (String, usize) {
		closest_match(name, &stats::MAIN_STATS[..])
	}

	pub fn closest_sub_stat(&self, name: &str) -> (String, usize) {
		closest_match(name, &stats::SUB_STATS[..])
	}

	pub fn closest_character_name(&self, name: &str) -> (String, usize) {
		closest_match(name, self.character_names())
	}

	pub fn closest_path(&self, name: &str) -> (String, usize) {
		closest_match(name, &stats::PATHS[..])
	}

	/// Nearest rarity for a sampled rarity-bar pixel (Euclidean distance in RGB).
	pub fn closest_rarity(&self, pixel: [u8; 3]) -> u8 {
		let distance = |reference: &[u8; 3]| {
			reference
				.iter()
				.zip(pixel)
				.map(|(a, b)| (*a as f32 - b as f32).powi(2))
				.sum::<f32>()
		};

		let mut best = 0;
		for (i, reference) in stats::RARITY_COLORS.iter().enumerate() {
			if distance(reference) < distance(&stats::RARITY_COLORS[best]) {
				best = i;
			}
		}
		best as u8 + 1
	}

	/// Character keys for avatar matching: each Trailblazer path is split into
	/// `#M` and `#F` variants since both bodies share a name.
	pub fn character_keys(&self) -> &[String] {
		self.character_keys.get_or_init(|| {
			let mut keys = self.characters.keys().cloned().collect::<Vec<_>>();
			for path in stats::PATHS {
				let key = format!("Trailblazer{}", path_suffix(path));
				if let Some(pos) = keys.iter().position(|v| *v == key) {
					keys.remove(pos);
					keys.push(format!("{key}#M"));
					keys.push(format!("{key}#F"));
				}
			}
			keys
		})
	}

	/// Character names for text correction. March 7th's path variants collide with
	/// path names, so they collapse into the bare name.
	pub fn character_names(&self) -> &[String] {
		self.character_names.get_or_init(|| {
			let mut keys = self.characters.keys().cloned().collect::<Vec<_>>();
			for path in stats::PATHS {
				let key = format!("March 7th{}", path_suffix(path));
				keys.retain(|v| *v != key);
			}
			keys.push("March 7th".to_owned());
			keys
		})
	}
}

/// "The Hunt" -> "Hunt"
fn path_suffix(path: &str) -> &str {
	path.rsplit(' ').next().unwrap_or(path)
}
