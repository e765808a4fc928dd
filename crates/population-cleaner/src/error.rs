//! Error types for the population cleaning pipeline.
//!
//! Errors fall into two families: load errors, raised before any cleaning
//! stage runs, and stage errors, raised while the record set is being
//! transformed. Either family aborts the run without writing output.
//!
//! Errors serialize as `{ code, message }` so they can be embedded in JSON
//! run reports.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Input file does not exist.
    #[error("File {} not found", .0.display())]
    InputNotFound(PathBuf),

    /// Input file exists but could not be parsed as a table.
    #[error("Failed to load '{}': {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },

    /// A tracked column is missing from the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A column has missing values but nothing to derive a fill value from.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A cell could not be converted to the column's expected type.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// A gender value outside the known codes under the `Reject` policy.
    #[error("Unknown gender code '{value}'")]
    UnknownGenderCode { value: String },

    /// Catch-all for a stage that failed for another reason.
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with the stage or operation it happened in.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputNotFound(_) => "INPUT_NOT_FOUND",
            Self::LoadFailed { .. } => "LOAD_FAILED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::UnknownGenderCode { .. } => "UNKNOWN_GENDER_CODE",
            Self::StageFailed { .. } => "STAGE_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error happened while loading the input, before any
    /// cleaning stage ran.
    pub fn is_load_error(&self) -> bool {
        match self {
            Self::InputNotFound(_) | Self::LoadFailed { .. } | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_load_error(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        CleaningError::InvalidConfig(err.to_string())
    }
}

impl From<anyhow::Error> for CleaningError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CleaningError>() {
            Ok(cleaning) => cleaning,
            Err(err) => match err.downcast::<polars::error::PolarsError>() {
                Ok(polars) => CleaningError::Polars(polars),
                Err(other) => CleaningError::StageFailed {
                    stage: "unknown".to_string(),
                    reason: other.to_string(),
                },
            },
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for anyhow::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::from(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
