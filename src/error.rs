//! Error types for the log pipeline.
//!
//! Every stage yields `Result<T, PipelineError>`. The three stage-specific
//! faults are standalone structs so callers can match on them directly, and
//! each converts into `PipelineError` with `?`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::Compression;

/// A log source could not be opened or decoded.
///
/// Fatal: totals computed downstream are meaningless once a source has been
/// skipped, so the pipeline stops at the first one.
#[derive(Debug, Error)]
#[error("failed to read {compression} source {}: {source}", .path.display())]
pub struct SourceOpenError {
    pub path: PathBuf,
    pub compression: Compression,
    #[source]
    pub source: io::Error,
}

/// A captured tuple does not have one value per field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} captured values, got {found}")]
pub struct ArityMismatchError {
    pub expected: usize,
    pub found: usize,
}

/// A field's text could not be converted to its typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce field '{field}' from {value:?}: {reason}")]
pub struct FieldCoercionError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    SourceOpen(#[from] SourceOpenError),

    #[error(transparent)]
    ArityMismatch(#[from] ArityMismatchError),

    #[error(transparent)]
    FieldCoercion(#[from] FieldCoercionError),

    #[error("record has no field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' is not an integer: {value}")]
    NotNumeric { field: String, value: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("sum of field '{field}' overflows")]
    Overflow { field: String },

    #[error("log discovery failed: {0}")]
    Discovery(#[from] glob::GlobError),

    #[error("glob pattern error: {pattern}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl PipelineError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// True for errors that end the run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FieldCoercion(_))
    }
}
