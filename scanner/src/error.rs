use crate::field::Field;

/// A filter key that cannot be evaluated. Raised before any bag is touched.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
	#[error("\"{0}\" is not a valid filter key")]
	MalformedKey(String),
	#[error("\"{key}\": unknown filter kind \"{kind}\", expected min or max")]
	UnknownKind { key: String, kind: String },
	#[error("\"{key}\": \"{field}\" is not a filterable field")]
	UnknownField { key: String, field: String },
}

/// Why a single record could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
	#[error(transparent)]
	Filter(#[from] FilterError),
	#[error("filter \"{key}\" needs an integer, got {value}")]
	NotAnInteger { key: String, value: String },
	#[error("field {0} is missing")]
	MissingField(Field),
	#[error("field {0} was not resolved")]
	Unresolved(Field),
	#[error("recognizing {field} failed: {reason:#}")]
	Recognition { field: Field, reason: anyhow::Error },
	#[error("no {kind} named \"{name}\"")]
	UnknownName { kind: &'static str, name: String },
	#[error("unexpected substat \"{0}\"")]
	UnknownSubstat(String),
	#[error("expected \"<path> / <name>\", got \"{0}\"")]
	CharacterLabel(String),
	#[error("unknown trace \"{0}\"")]
	UnknownTrace(String),
	#[error("identifying the owner failed: {0:#}")]
	Owner(anyhow::Error),
}
