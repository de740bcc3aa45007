//! Scanner configuration.
//!
//! Stored as JSON. Every key is optional; missing ones take their defaults.

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use data::Catalog;
use ie::OwnedImage;
use serde::{Deserialize, Serialize};

use crate::{extract::RecordKind, scan::ScanMode, strategy::TrailblazerIcons};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Forward trace and debug messages to the event channel.
	pub debug: bool,

	pub filters: Filters,

	/// Stop a relic scan after this many new relics, newest first.
	pub recent_relics: Option<usize>,

	/// PaddleOCR model files. Required for anything that still needs recognition.
	pub ocr: Option<OcrModels>,

	/// Template icons for the lock and discard flags.
	pub lock_icon: Option<PathBuf>,
	pub discard_icon: Option<PathBuf>,

	/// Trailblazer portraits. Without both the Trailblazer is not recognized.
	pub caelus_icon: Option<PathBuf>,
	pub stelle_icon: Option<PathBuf>,

	/// Reference data. A URL is fetched; anything else is read as a local file.
	pub catalog_url: String,
	pub key_map_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
	pub relic: BTreeMap<String, i64>,
	pub light_cone: BTreeMap<String, i64>,
	pub character: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrModels {
	pub detection: PathBuf,
	pub recognition: PathBuf,
	pub charset: PathBuf,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			debug: false,
			filters: Filters::default(),
			recent_relics: None,
			ocr: None,
			lock_icon: None,
			discard_icon: None,
			caelus_icon: None,
			stelle_icon: None,
			catalog_url: data::GAME_DATA_URL.to_owned(),
			key_map_url: data::KEY_MAP_URL.to_owned(),
		}
	}
}

impl Default for Filters {
	fn default() -> Self {
		let defaults = |rarity: i64, level: i64| {
			BTreeMap::from([("min_rarity".to_owned(), rarity), ("min_level".to_owned(), level)])
		};
		Self {
			relic: defaults(0, 0),
			light_cone: defaults(3, 1),
			character: BTreeMap::from([("min_level".to_owned(), 1)]),
		}
	}
}

impl Filters {
	pub fn for_kind(&self, kind: RecordKind) -> &BTreeMap<String, i64> {
		match kind {
			RecordKind::Relic => &self.relic,
			RecordKind::LightCone => &self.light_cone,
		}
	}
}

impl Config {
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
		let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
		Ok(cfg)
	}

	/// Load configuration from disk, falling back to defaults on a missing or bad file.
	pub fn load_or_default(path: impl AsRef<Path>) -> Self {
		let path = path.as_ref();
		if !path.exists() {
			return Self::default();
		}
		match Self::load(path) {
			Ok(cfg) => cfg,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "failed to load config; using defaults");
				Self::default()
			}
		}
	}

	pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
		}
		let json = serde_json::to_string_pretty(self).context("serialize config")?;
		fs::write(path, json).with_context(|| format!("write {:?}", path))?;
		Ok(())
	}

	pub fn scan_mode(&self, kind: RecordKind) -> ScanMode {
		match (kind, self.recent_relics) {
			(RecordKind::Relic, Some(limit)) => ScanMode::Recent { limit },
			_ => ScanMode::Full,
		}
	}

	pub fn trailblazer_icons(&self) -> Result<Option<TrailblazerIcons>> {
		let (Some(caelus), Some(stelle)) = (&self.caelus_icon, &self.stelle_icon) else {
			return Ok(None);
		};
		Ok(Some(TrailblazerIcons {
			caelus: OwnedImage::open(caelus)?,
			stelle: OwnedImage::open(stelle)?,
		}))
	}

	pub fn load_catalog(&self) -> Result<Catalog> {
		let source = &self.catalog_url;
		let catalog = if source.starts_with("http://") || source.starts_with("https://") {
			Catalog::fetch(source)?
		} else {
			let file = fs::File::open(source).with_context(|| format!("open {source:?}"))?;
			Catalog::from_reader(std::io::BufReader::new(file))?
		};
		Ok(catalog.with_key_map_url(&self.key_map_url))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let cfg = Config::default();
		assert_eq!(cfg.filters.relic["min_level"], 0);
		assert_eq!(cfg.filters.light_cone["min_rarity"], 3);
		assert_eq!(cfg.filters.for_kind(RecordKind::LightCone)["min_level"], 1);
		assert_eq!(cfg.filters.character["min_level"], 1);
		assert_eq!(cfg.catalog_url, data::GAME_DATA_URL);
		assert_eq!(cfg.scan_mode(RecordKind::Relic), ScanMode::Full);
	}

	#[test]
	fn test_partial_file_fills_defaults() {
		let cfg: Config = serde_json::from_str(r#"{"debug": true, "filters": {"relic": {"min_rarity": 5}}}"#).unwrap();
		assert!(cfg.debug);
		assert_eq!(cfg.filters.relic.len(), 1);
		assert_eq!(cfg.filters.light_cone["min_rarity"], 3);
		assert_eq!(cfg.key_map_url, data::KEY_MAP_URL);
	}

	#[test]
	fn test_save_and_load() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("config.json");

		let mut cfg = Config::default();
		cfg.recent_relics = Some(8);
		cfg.lock_icon = Some("icons/lock.png".into());
		cfg.save(&path).unwrap();

		let loaded = Config::load(&path).unwrap();
		assert_eq!(loaded, cfg);
		assert_eq!(loaded.scan_mode(RecordKind::Relic), ScanMode::Recent { limit: 8 });
		assert_eq!(loaded.scan_mode(RecordKind::LightCone), ScanMode::Full);
	}

	#[test]
	fn test_load_or_default() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.json");
		assert_eq!(Config::load_or_default(&missing), Config::default());

		let broken = dir.path().join("broken.json");
		fs::write(&broken, "{not json").unwrap();
		assert!(Config::load(&broken).is_err());
		assert_eq!(Config::load_or_default(&broken), Config::default());
	}

	#[test]
	fn test_trailblazer_icons_need_both_bodies() {
		let dir = tempfile::tempdir().unwrap();
		let caelus = dir.path().join("caelus.png");
		OwnedImage::filled(5, 5, ie::Color::WHITE).to_rgb_image().save(&caelus).unwrap();

		let mut cfg = Config {
			caelus_icon: Some(caelus.clone()),
			..Config::default()
		};
		assert!(cfg.trailblazer_icons().unwrap().is_none());

		cfg.stelle_icon = Some(caelus);
		let icons = cfg.trailblazer_icons().unwrap().unwrap();
		assert_eq!(icons.stelle.width(), 5);

		cfg.stelle_icon = Some(dir.path().join("missing.png"));
		assert!(cfg.trailblazer_icons().is_err());
	}

	#[test]
	fn test_catalog_from_local_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("game_data.json");
		fs::write(&path, r#"{"version": "9", "relics": {}, "light_cones": {}, "characters": {}}"#).unwrap();

		let cfg = Config {
			catalog_url: path.to_string_lossy().into_owned(),
			..Config::default()
		};
		assert_eq!(cfg.load_catalog().unwrap().version, "9");
	}
}
