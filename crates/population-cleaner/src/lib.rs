//! Population Dataset Cleaning Library
//!
//! Cleans a tabular population-statistics dataset built with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline runs a fixed sequence of stages over one in-memory table:
//!
//! - **Deduplication**: Exact duplicate rows removed, first occurrence kept
//! - **Imputation**: Median for `population` and `age`, code 3 for `gender`,
//!   mode for `income_groups` and `year`
//! - **Normalization**: Gender codes mapped to labels, income label typos
//!   corrected and whitespace stripped
//! - **Outlier Capping**: `population` capped at a percentile, `age` clamped
//!   to `[0, 120]`
//! - **Type Coercion**: Integer `population` and `year`, integral ages as integers
//! - **Validation**: Rows with a negative population dropped
//! - **Inspection**: Read-only report of the defects in a raw dataset
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use population_cleaner::{CleaningConfig, Pipeline};
//!
//! let result = Pipeline::builder()
//!     .config(CleaningConfig::default())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .clean_file("messy_population_data.csv", "cleaned_population_data.csv")?;
//!
//! println!(
//!     "{} -> {} rows",
//!     result.summary.rows_before, result.summary.rows_after
//! );
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use population_cleaner::{CleaningConfig, QuantileMethod, UnknownGenderPolicy};
//!
//! let config = CleaningConfig::builder()
//!     .population_percentile(0.95)
//!     .percentile_method(QuantileMethod::Linear)
//!     .unknown_gender(UnknownGenderPolicy::Reject)
//!     .income_correction("middle_income_typo", "middle_income")
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{
    AgeRepresentation, CategoricalNormalizer, Deduplicator, NormalizationReport, RangeValidator,
    TypeCoercer,
};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, QuantileMethod,
    UnknownGenderPolicy,
};
pub use error::{CleaningError, Result as CleaningResultType, ResultExt};
pub use imputers::{ImputationReport, MissingValueImputer, StatisticalImputer};
pub use loader::DatasetLoader;
pub use pipeline::{
    CapOutcome, CleaningStage, ClosureProgressReporter, OutlierCapper, Pipeline, PipelineBuilder,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::DataProfiler;
pub use quality::{DataQualityAnalyzer, InspectionReport, QualityIssue, Severity};
pub use reporting::{DatasetWriter, RunReport};
pub use types::{
    ActionType, CleaningAction, CleaningResult, CleaningStatistics, CleaningSummary,
    ColumnDiagnostics, ColumnSummary,
};
