//! Error types for configuration loading.
//!
//! Two families of failure exist. Resolution errors ([`Error`]) abort a load
//! before anything is bound. Field errors ([`FieldError`]) are collected for
//! every leaf field and surfaced together as [`FieldErrors`].

use crate::sources::Format;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Main error type for a `load` call.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more mandatory logical files were not found anywhere.
    #[error("\"{}\" file(s) not found", .0.join("\", \""))]
    FilesNotFound(Vec<String>),

    /// The file extension does not map to a known decoder.
    #[error("unsupported file extension {0:?}")]
    UnsupportedExtension(String),

    /// A local file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An embedded asset could not be read.
    #[error("failed to read embedded {path}: {source}")]
    Embedded {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A source could not be decoded into a tree.
    #[error("failed to parse {origin} as {format}: {message}")]
    Parse {
        origin: String,
        format: Format,
        message: String,
    },

    /// Two sources disagree on the shape of a key.
    #[error("cannot merge {incoming} into {existing} at {path:?}")]
    MergeConflict {
        path: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// A `${}` interpolation without a variable name.
    #[error("environment name is missing in {0:?}")]
    EmptyInterpolation(String),

    /// The merged tree could not be decoded into the destination.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// One or more fields failed validation or conversion.
    #[error(transparent)]
    Fields(#[from] FieldErrors),
}

impl Error {
    /// Returns true when the load failed because mandatory files are missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FilesNotFound(_))
    }

    /// Returns the aggregated field errors, if that is what this error is.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Error::Fields(errs) => Some(errs),
            _ => None,
        }
    }
}

/// Result type alias for confucius operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure converting a raw value (string literal or tree node) into a field type.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("invalid {kind} value {value:?}")]
    Invalid { kind: &'static str, value: String },

    #[error("{value} is out of range for {kind}")]
    OutOfRange { kind: &'static str, value: String },

    #[error("invalid duration {value:?}: {source}")]
    Duration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid time {value:?}: {source}")]
    Time {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unsupported type {0}")]
    Unsupported(&'static str),

    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ConvertError {
    pub(crate) fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        ConvertError::Invalid {
            kind,
            value: value.into(),
        }
    }

    pub(crate) fn out_of_range(kind: &'static str, value: impl fmt::Display) -> Self {
        ConvertError::OutOfRange {
            kind,
            value: value.to_string(),
        }
    }
}

/// A conversion failure while decoding the merged tree, tagged with the field path.
#[derive(Error, Debug)]
#[error("decoding {path}: {source}")]
pub struct DecodeError {
    pub path: String,
    #[source]
    pub source: ConvertError,
}

impl DecodeError {
    pub fn new(path: impl Into<String>, source: ConvertError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// The outcome of processing a single leaf field.
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("field cannot have both a required validation and a default value")]
    RequiredAndDefault,

    #[error("required validation failed")]
    Required,

    #[error("unable to set from env {key}: {source}")]
    Env {
        key: String,
        #[source]
        source: ConvertError,
    },

    #[error("unable to set default: {0}")]
    Default(#[source] ConvertError),
}

/// Every field error of a load, keyed by field path.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, err: FieldError) {
        self.0.insert(path.into(), err);
    }

    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, FieldError> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, err)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", path, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}
