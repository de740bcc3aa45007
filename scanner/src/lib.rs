//! Inventory and roster parsing: field bags in, validated relic, light cone
//! and character records out.

pub mod config;
mod error;
pub mod events;
pub mod export;
pub mod extract;
pub mod field;
pub mod filter;
pub mod record;
pub mod scan;
pub mod strategy;
pub mod substats;

pub use config::Config;
pub use error::{FilterError, ScanError};
pub use events::{Event, Increment, LogLevel, Notifier};
pub use extract::RecordKind;
pub use field::{CharacterBag, Field, FieldBag, FieldValue};
pub use filter::{FilterSpec, SortMethod};
pub use record::{CharacterRecord, LightConeRecord, ParsedRecord, RelicRecord};
pub use scan::{ScanMode, Scanner};
pub use strategy::{CharacterParser, Context, LightConeStrategy, ParseStrategy, RelicStrategy, TrailblazerIcons};
