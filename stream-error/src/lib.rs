//! # Stream Error
//!
//! `stream-error` is the shared error crate of the streamlib family. It
//! defines the failure taxonomy every transform reports through:
//!
//! - [`StreamError::Io`]: a fault of the wrapped byte source, always
//!   propagated unchanged;
//! - [`StreamError::Transform`]: a failure inside a produce hook, wrapped
//!   with the identity of the failing transform;
//! - [`StreamError::Validation`]: the aggregate of [`ValidationError`]
//!   records collected while translating a document, raised only at
//!   end-of-stream;
//! - [`StreamError::Unsupported`]: seek/write attempted on a forward-only
//!   engine;
//! - [`StreamError::Config`]: invalid construction parameters.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transform `{transform}` failed: {cause}")]
    Transform {
        transform: String,
        cause: anyhow::Error,
    },
    #[error("validation failed with {} pending record(s)", .errors.len())]
    Validation { errors: Vec<ValidationError> },
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StreamError {
    /// Wrap an arbitrary failure with the identity of the transform
    /// whose produce hook raised it. IO and validation failures keep
    /// their own identity and are returned unchanged.
    pub fn in_transform(self, transform: &str) -> Self {
        match self {
            StreamError::Io(_)
            | StreamError::Validation { .. }
            | StreamError::Transform { .. } => self,
            other => StreamError::Transform {
                transform: transform.to_owned(),
                cause: anyhow::Error::new(other),
            },
        }
    }
}

/// How severe a single validation record is.
#[derive(
    Eq, Ord, PartialEq, PartialOrd, Hash, Clone, Copy, Debug, Serialize,
)]
pub enum Severity {
    /// The document is usable but carries a suspicious construct,
    /// e.g. an element the schema does not declare at all.
    Warning,
    /// The document violates the schema.
    Error,
}

/// Which family of constraint was violated.
#[derive(
    Eq, Ord, PartialEq, PartialOrd, Hash, Clone, Copy, Debug, Serialize,
)]
pub enum ValidationCategory {
    /// A datatype/pattern facet did not match the value.
    Pattern,
    /// Anything structural: undeclared elements, misplaced children,
    /// missing required attributes.
    Structural,
}

/// One schema violation captured during XML translation.
///
/// Records are accumulated and never discarded; they surface in aggregate
/// through [`StreamError::Validation`] once the stream is fully consumed.
#[derive(Eq, PartialEq, Clone, Debug, Serialize)]
pub struct ValidationError {
    pub severity: Severity,
    pub node_name: String,
    pub node_namespace: String,
    pub node_value: String,
    pub description: String,
    pub category: ValidationCategory,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?} at `{}`: {}",
            self.severity, self.category, self.node_name, self.description
        )
    }
}
