//! Batch driver: filters and parses an inventory's field bags in display order.

use std::{
	collections::{BTreeMap, HashSet},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use crate::{
	error::FilterError,
	events::{Increment, LogLevel, Notifier},
	field::{CharacterBag, Field, FieldBag, FieldValue},
	filter::{FilterSpec, SortMethod, all_passed},
	record::{CharacterRecord, ParsedRecord},
	strategy::{CharacterParser, ParseStrategy},
};

/// Roster slots holding the active team. They come before the level-sorted
/// part of the roster.
const TEAM_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
	#[default]
	Full,
	/// Newest items first, stopping after `limit` items that pass a `min_rarity`
	/// filter. Without that filter nothing counts towards the limit.
	Recent { limit: usize },
}

pub struct Scanner {
	notifier: Notifier,
	interrupt: Arc<AtomicBool>,
	mode: ScanMode,
}

impl Scanner {
	pub fn new(notifier: Notifier, interrupt: Arc<AtomicBool>) -> Self {
		Self {
			notifier,
			interrupt,
			mode: ScanMode::Full,
		}
	}

	pub fn with_mode(mut self, mode: ScanMode) -> Self {
		self.mode = mode;
		self
	}

	/// Cancel the scan. Bags already handed to the strategy finish; the rest are skipped.
	pub fn stop(&self) {
		self.interrupt.store(true, Ordering::Relaxed);
	}

	pub fn interrupted(&self) -> bool {
		self.interrupt.load(Ordering::Relaxed)
	}

	/// Order the inventory should be sorted in before its bags are captured.
	pub fn sort_method(&self, strategy: &(impl ParseStrategy + ?Sized), filters: &FilterSpec) -> SortMethod {
		match self.mode {
			ScanMode::Full => strategy.optimal_sort_method(filters),
			ScanMode::Recent { .. } => SortMethod::DateObtained,
		}
	}

	/// Filter and parse `bags`, which must be in `sort` order. Item ids start at 1.
	///
	/// A failing filter on the sort key ends the scan since nothing after it can
	/// pass. Bags failing other filters, or whose filters cannot be evaluated, are
	/// skipped.
	pub fn scan_inventory<S, I>(
		&self,
		strategy: &S,
		bags: I,
		filters: &BTreeMap<String, i64>,
		sort: SortMethod,
	) -> Result<Vec<ParsedRecord>, FilterError>
	where
		S: ParseStrategy + ?Sized,
		I: IntoIterator<Item = FieldBag>,
	{
		let filters = FilterSpec::parse(filters)?;
		let label = strategy.kind().label();

		let mut records = Vec::new();
		let mut scanned = 0;
		for (i, mut bag) in bags.into_iter().enumerate() {
			if self.interrupted() {
				tracing::info!(label, "scan interrupted");
				break;
			}
			if matches!(self.mode, ScanMode::Recent { limit } if scanned >= limit) {
				break;
			}

			let uid = i as u32 + 1;
			if !filters.is_empty() {
				let results = match strategy.check_filters(&mut bag, &filters, uid) {
					Ok(v) => v,
					Err(err) => {
						self.notifier.log(
							format!("{label} UID {uid}: Skipping, filters could not be evaluated: {err}"),
							LogLevel::Error,
						);
						continue;
					}
				};

				if sort == SortMethod::Level && results.get("min_level") == Some(&false) {
					self.notifier.log(
						format!("Reached minimum level filter (got level {}).", describe(&bag, Field::Level)),
						LogLevel::Info,
					);
					break;
				}
				if sort == SortMethod::Rarity && results.get("min_rarity") == Some(&false) {
					self.notifier.log(
						format!("Reached minimum rarity filter (got rarity {}).", describe(&bag, Field::Rarity)),
						LogLevel::Info,
					);
					break;
				}
				if matches!(self.mode, ScanMode::Recent { .. })
					&& sort == SortMethod::DateObtained
					&& results.get("min_rarity") == Some(&true)
				{
					scanned += 1;
				}
				if !all_passed(&results) {
					continue;
				}
			}

			self.notifier.progress(strategy.added());
			if let Some(record) = strategy.parse(bag, uid) {
				records.push(record);
			}
		}

		Ok(records)
	}

	/// Identify, filter and parse roster entries in display order.
	///
	/// An entry that cannot be identified ends the scan. Past the active team a
	/// level below `min_level` ends it too; within the team the entry is skipped.
	pub fn scan_characters<I>(
		&self,
		parser: &CharacterParser,
		bags: I,
		filters: &BTreeMap<String, i64>,
	) -> Result<Vec<CharacterRecord>, FilterError>
	where
		I: IntoIterator<Item = CharacterBag>,
	{
		let min_level = FilterSpec::parse(filters)?.threshold("min_level").unwrap_or(1);

		let mut seen = HashSet::new();
		let mut records = Vec::new();
		for (i, mut bag) in bags.into_iter().enumerate() {
			if self.interrupted() {
				tracing::info!("character scan interrupted");
				break;
			}

			let identity = match parser.identify(&mut bag) {
				Ok(v) => v,
				Err(err) => {
					self.notifier.log(
						format!("Failed to parse character name. Got error: {err}. Ending scan early."),
						LogLevel::Error,
					);
					break;
				}
			};
			if seen.insert(identity.name.clone()) {
				self.notifier
					.log(format!("Character {}: {}", i + 1, identity.label()), LogLevel::Trace);
			} else {
				self.notifier.log(
					format!("Duplicate character '{}' scanned. Continuing scan anyway.", identity.label()),
					LogLevel::Error,
				);
			}

			if min_level > 1 {
				let level = parser.level_or_default(&identity.name, &bag.level);
				bag.level = FieldValue::Int(level);
				if level < min_level && i < TEAM_SIZE {
					self.notifier.log(
						format!("{} is below minimum level filter (got level {level}). Skipping...", identity.name),
						LogLevel::Trace,
					);
					continue;
				}
				if level < min_level {
					self.notifier.log(
						format!("Reached minimum level filter (got level {level} for {}).", identity.name),
						LogLevel::Info,
					);
					break;
				}
			}

			self.notifier.progress(Increment::CharacterAdd);
			if let Some(record) = parser.parse(&identity, bag) {
				records.push(record);
			}
		}

		Ok(records)
	}
}

fn describe(bag: &FieldBag, field: Field) -> String {
	bag.get(field).map(ToString::to_string).unwrap_or_default()
}
