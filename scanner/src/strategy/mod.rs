//! Per-record state machines for the two inventories and the roster.
//!
//! Inventory items share the same skeleton: bail out if the scan was cancelled,
//! extract every field, correct and validate, resolve icon flags and the owner,
//! emit a success increment. Any failure past the cancellation check discards
//! the record with an error log; the scan moves on.

mod character;
mod light_cone;
mod relic;

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use data::Catalog;
use ie::{ImageMatcher, OwnedImage, OwnerIdentifier, TextRecognizer};

pub use character::{CharacterParser, Identity, TrailblazerIcons};
pub use light_cone::LightConeStrategy;
pub use relic::RelicStrategy;

use crate::{
	error::ScanError,
	events::{Increment, LogLevel, Notifier},
	extract::{Extractor, RecordKind},
	field::{Field, FieldBag, FieldValue},
	filter::{Filter, FilterResults, FilterSpec, SortMethod},
	record::ParsedRecord,
};

pub trait ParseStrategy {
	fn kind(&self) -> RecordKind;

	/// Increment emitted when a bag is handed to [`ParseStrategy::parse`].
	fn added(&self) -> Increment;

	/// Sort order under which a failing filter ends the scan.
	fn optimal_sort_method(&self, filters: &FilterSpec) -> SortMethod;

	/// Evaluate `filters`, resolving only what they need. Resolved values are
	/// written back to `bag`.
	fn check_filters(&self, bag: &mut FieldBag, filters: &FilterSpec, uid: u32) -> Result<FilterResults, ScanError>;

	fn extract_field(&self, field: Field, value: FieldValue) -> Result<FieldValue, ScanError>;

	/// Full parse. `None` if the scan was cancelled or the record was discarded.
	fn parse(&self, bag: FieldBag, uid: u32) -> Option<ParsedRecord>;
}

/// Collaborators and scan state shared by the strategies.
#[derive(Clone)]
pub struct Context {
	pub catalog: Arc<Catalog>,
	pub recognizer: Arc<dyn TextRecognizer>,
	pub matcher: Arc<dyn ImageMatcher>,
	pub owners: Arc<dyn OwnerIdentifier>,
	pub lock_icon: Arc<OwnedImage>,
	pub notifier: Notifier,
	pub interrupt: Arc<AtomicBool>,
}

impl Context {
	pub fn interrupted(&self) -> bool {
		self.interrupt.load(Ordering::Relaxed)
	}

	fn extractor(&self) -> Extractor<'_> {
		Extractor {
			catalog: &self.catalog,
			recognizer: self.recognizer.as_ref(),
		}
	}

	fn log(&self, kind: RecordKind, uid: u32, message: impl AsRef<str>, level: LogLevel) {
		self.notifier
			.log(format!("{} UID {uid}: {}", kind.label(), message.as_ref()), level);
	}

	/// Resolve `field` in place and return the new value.
	fn resolve<'b>(&self, kind: RecordKind, bag: &'b mut FieldBag, field: Field) -> Result<&'b FieldValue, ScanError> {
		let value = bag.remove(field).ok_or(ScanError::MissingField(field))?;
		let value = self.extractor().extract(kind, field, value)?;
		bag.insert(field, value);
		bag.get(field).ok_or(ScanError::MissingField(field))
	}

	/// Shared parse skeleton around the strategy specific `build`.
	fn run_parse<T>(
		&self,
		kind: RecordKind,
		mut bag: FieldBag,
		uid: u32,
		build: impl FnOnce(&mut FieldBag) -> Result<T, ScanError>,
	) -> Option<T> {
		if self.interrupted() {
			return None;
		}

		let result = self.extract_all(kind, &mut bag).and_then(|_| {
			if self.notifier.debug() {
				self.log(kind, uid, format!("Raw data: {}", bag.redacted()), LogLevel::Debug);
			}
			build(&mut bag)
		});

		match result {
			Ok(record) => Some(record),
			Err(err) => {
				let noun = kind.label().to_lowercase();
				self.notifier.log(
					format!("Failed to parse {noun} {uid}. fields={}, error={err}", bag.redacted()),
					LogLevel::Error,
				);
				None
			}
		}
	}

	fn extract_all(&self, kind: RecordKind, bag: &mut FieldBag) -> Result<(), ScanError> {
		for field in Field::ALL {
			if bag.get(field).is_some() {
				self.resolve(kind, bag, field)?;
			}
		}
		Ok(())
	}

	/// Whether `icon` shows up in the region stored under `field`. Unusable
	/// regions count as "not present".
	fn icon_present(
		&self,
		kind: RecordKind,
		uid: u32,
		bag: &FieldBag,
		field: Field,
		icon: &OwnedImage,
		confidence: f32,
	) -> bool {
		let found = match bag.get(field).and_then(FieldValue::as_image) {
			Some(region) => {
				let side = region.width().min(region.height());
				let needle = icon.resized(side, side);
				self.matcher
					.locate(needle.as_image(), region.as_image(), confidence)
					.map_err(|err| err.to_string())
			}
			None => Err("no image region".to_owned()),
		};

		match found {
			Ok(found) => found,
			Err(reason) => {
				tracing::debug!(%field, reason, "icon match failed");
				self.log(kind, uid, format!("Failed to parse {field}. Setting to False."), LogLevel::Error);
				false
			}
		}
	}

	/// Owner from the avatar next to the "Equipped" marker; empty when unequipped.
	fn owner(&self, kind: RecordKind, uid: u32, bag: &FieldBag) -> Result<(String, Option<String>), ScanError> {
		let marker = bag.get(Field::Equipped).map(text).unwrap_or_default();
		let region = match marker.as_str() {
			"Equipped" => Field::EquippedAvatar,
			// the last glyph is sometimes clipped, with the avatar shifted left
			"Equippe" => Field::EquippedAvatarOffset,
			_ => return Ok((String::new(), None)),
		};

		let avatar = bag
			.get(region)
			.and_then(FieldValue::as_image)
			.ok_or(ScanError::MissingField(region))?;
		let owner = self.owners.identify(avatar.as_image()).map_err(ScanError::Owner)?;

		if let Some(variant) = &owner.variant {
			self.log(
				kind,
				uid,
				format!("Equipped character is {} with variant {variant}.", owner.name),
				LogLevel::Debug,
			);
		}
		Ok((owner.name, owner.variant))
	}
}

fn require(bag: &FieldBag, field: Field) -> Result<&FieldValue, ScanError> {
	bag.get(field).ok_or(ScanError::MissingField(field))
}

/// Text view of a resolved value. Unresolved images read as empty.
fn text(value: &FieldValue) -> String {
	match value {
		FieldValue::Text(v) => v.trim().to_owned(),
		FieldValue::Int(v) => v.to_string(),
		FieldValue::Float(v) => v.to_string(),
		FieldValue::Pending(_) => String::new(),
	}
}

fn integer(filter: &Filter, value: &FieldValue) -> Result<i64, ScanError> {
	value.to_int().ok_or_else(|| ScanError::NotAnInteger {
		key: filter.key.clone(),
		value: text(value),
	})
}

#[cfg(test)]
pub(crate) mod fakes {
	//! Collaborators for strategy tests.

	use std::collections::HashMap;

	use ie::{Image, MatchError, Owner, Recognition};

	use super::*;

	/// Canned recognizer output, keyed by the alphabet of the request.
	#[derive(Default)]
	pub struct ScriptedOcr(HashMap<&'static str, String>);

	impl ScriptedOcr {
		pub fn reply(mut self, kind: RecordKind, field: Field, text: &str) -> Self {
			let request = crate::extract::recognition(kind, field).expect("field is recognized");
			self.0.insert(request.alphabet, text.to_owned());
			self
		}
	}

	impl TextRecognizer for ScriptedOcr {
		fn recognize(&self, _image: Image<'_>, request: &Recognition) -> anyhow::Result<String> {
			self.0
				.get(request.alphabet)
				.cloned()
				.ok_or_else(|| anyhow::anyhow!("unexpected request {request:?}"))
		}
	}

	/// Icon found iff the region's top-left pixel is black.
	pub struct DarkCorner;

	impl ImageMatcher for DarkCorner {
		fn locate(&self, _needle: Image<'_>, haystack: Image<'_>, _confidence: f32) -> Result<bool, MatchError> {
			if haystack.is_empty() {
				return Err(MatchError::Empty);
			}
			Ok(haystack.pixel(0, 0) == ie::Color::BLACK)
		}
	}

	pub struct FixedOwner(pub &'static str);

	impl OwnerIdentifier for FixedOwner {
		fn identify(&self, _avatar: Image<'_>) -> anyhow::Result<Owner> {
			Ok(Owner::from_key(self.0))
		}
	}

	pub fn context(catalog: &str, ocr: ScriptedOcr, debug: bool) -> (Context, std::sync::mpsc::Receiver<crate::events::Event>) {
		let (notifier, rx) = Notifier::channel(debug);
		let ctx = Context {
			catalog: Arc::new(Catalog::from_json(catalog).unwrap()),
			recognizer: Arc::new(ocr),
			matcher: Arc::new(DarkCorner),
			owners: Arc::new(FixedOwner("TrailblazerHarmony#F")),
			lock_icon: Arc::new(OwnedImage::filled(4, 4, ie::Color::BLACK)),
			notifier,
			interrupt: Arc::new(AtomicBool::new(false)),
		};
		(ctx, rx)
	}

	pub fn errors(rx: &std::sync::mpsc::Receiver<crate::events::Event>) -> Vec<String> {
		rx.try_iter()
			.filter_map(|e| match e {
				crate::events::Event::Log { message, level: LogLevel::Error } => Some(message),
				_ => None,
			})
			.collect()
	}
}
