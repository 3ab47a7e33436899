//! Error types for the generation engines.

use datafusion::arrow::error::ArrowError;
use datafusion::parquet::errors::ParquetError;
use thiserror::Error;

/// Errors produced while generating practices and patients.
///
/// None of these are transient: an invalid parameter bundle or a broken
/// entity invariant is a setup or logic error, so there is no retry path
/// anywhere in the crate. An entity is either fully valid or not produced.
#[derive(Error, Debug)]
pub enum SynthEhrError {
    /// A parameter bundle value is outside its documented valid range.
    /// Raised before any sampling for the affected parameter group.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The caller supplied an unusable argument (e.g. zero practices).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A constructed practice or patient violates a structural invariant.
    #[error("entity validation failed: {0}")]
    EntityValidation(String),

    /// Two patients in one roster ended up with the same identifier.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Filesystem failure while writing or reading an output file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure building the Arrow representation of a roster.
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Failure in the parquet writer or reader.
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, SynthEhrError>;
