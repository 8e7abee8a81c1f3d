//! Protocol Errors

use thiserror::Error;

/// Result alias used across the protocol types
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A wire numeral that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{value:?} is not a valid {form} numeral")]
pub struct MalformedNumber {
    pub value: String,
    pub form: NumeralForm,
}

impl MalformedNumber {
    pub(crate) fn new(value: &str, form: NumeralForm) -> Self {
        Self {
            value: value.to_string(),
            form,
        }
    }

    /// Attach the name of the field the numeral was read from
    pub fn in_field(self, field: impl Into<String>) -> Error {
        Error::MalformedNumericField {
            field: field.into(),
            source: self,
        }
    }
}

/// Accepted numeral forms for a wire field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumeralForm {
    /// Hex digits, `0x` prefix optional
    Hex,
    /// `0x`-prefixed hex or plain decimal
    Quantity,
}

impl std::fmt::Display for NumeralForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumeralForm::Hex => f.write_str("hex"),
            NumeralForm::Quantity => f.write_str("hex or decimal"),
        }
    }
}

/// MEV-Share protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed numeric field `{field}`: {source}")]
    MalformedNumericField {
        field: String,
        #[source]
        source: MalformedNumber,
    },

    #[error("Invalid bundle shape at `{path}`: {reason}")]
    InvalidBundleShape { path: String, reason: String },

    #[error("Unexpected payload shape: {0}")]
    Decode(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),
}

impl Error {
    pub(crate) fn shape(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidBundleShape {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Field path of a bundle shape error, if this is one
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::InvalidBundleShape { path, .. } => Some(path),
            Error::MalformedNumericField { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
