//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline emits a [`ProgressUpdate`] at the start and end of each
//! stage. Updates serialize to JSON with snake_case stage names.
//!
//! # Example
//!
//! ```rust,ignore
//! use population_cleaner::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Computing the diagnostics of the raw data
    Profiling,
    /// Removing exact duplicate rows
    Deduplication,
    /// Filling missing values
    Imputation,
    /// Mapping gender codes and repairing income labels
    Normalization,
    /// Clamping population and age outliers
    OutlierCapping,
    /// Casting columns to their output types
    TypeCoercion,
    /// Dropping rows with invalid populations
    Validation,
    /// Removing rows that became identical while cleaning
    FinalDeduplication,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// The processing stages in execution order (terminal states excluded).
    pub const ORDER: [CleaningStage; 8] = [
        Self::Profiling,
        Self::Deduplication,
        Self::Imputation,
        Self::Normalization,
        Self::OutlierCapping,
        Self::TypeCoercion,
        Self::Validation,
        Self::FinalDeduplication,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Profiling => "Profiling Dataset",
            Self::Deduplication => "Removing Duplicates",
            Self::Imputation => "Imputing Values",
            Self::Normalization => "Normalizing Labels",
            Self::OutlierCapping => "Capping Outliers",
            Self::TypeCoercion => "Coercing Types",
            Self::Validation => "Validating Ranges",
            Self::FinalDeduplication => "Final Deduplication",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Profiling => 0.10,
            Self::Deduplication => 0.10,
            Self::Imputation => 0.25,
            Self::Normalization => 0.15,
            Self::OutlierCapping => 0.15,
            Self::TypeCoercion => 0.10,
            Self::Validation => 0.05,
            Self::FinalDeduplication => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => Self::ORDER
                .iter()
                .take_while(|s| *s != stage)
                .map(|s| s.weight())
                .sum(),
        }
    }
}

/// A progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: CleaningStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Rows in the record set when the update was emitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            rows: None,
        }
    }

    /// Attach the current row count.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
            rows: None,
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            rows: None,
        }
    }
}

/// Trait for receiving progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline holding one can be
/// moved to another thread.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of every stage.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::Imputation, 0.5, "Imputing...");
        assert_eq!(update.stage, CleaningStage::Imputation);
        assert_eq!(update.stage_progress, 0.5);
        assert_eq!(update.message, "Imputing...");
        assert!(update.rows.is_none());
    }

    #[test]
    fn test_progress_is_monotonic_across_stages() {
        let mut last = -1.0f32;
        for stage in CleaningStage::ORDER {
            let start = ProgressUpdate::new(stage, 0.0, "").progress;
            let end = ProgressUpdate::new(stage, 1.0, "").progress;
            assert!(start > last);
            assert!(end >= start);
            last = start;
        }
    }

    #[test]
    fn test_stage_weights_sum() {
        let total_weight: f32 = CleaningStage::ORDER.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done!");
        assert_eq!(update.stage, CleaningStage::Complete);
        assert_eq!(update.progress, 1.0);
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(CleaningStage::Profiling, 0.5, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_json_values() {
        let stage_expectations = [
            (CleaningStage::Deduplication, "\"deduplication\""),
            (CleaningStage::OutlierCapping, "\"outlier_capping\""),
            (CleaningStage::TypeCoercion, "\"type_coercion\""),
            (CleaningStage::FinalDeduplication, "\"final_deduplication\""),
            (CleaningStage::Failed, "\"failed\""),
        ];

        for (stage, expected_json) in stage_expectations {
            let json = serde_json::to_string(&stage).expect("Should serialize");
            assert_eq!(json, expected_json);
        }
    }

    #[test]
    fn test_progress_update_json_serialization() {
        let update = ProgressUpdate::new(CleaningStage::Validation, 1.0, "Validated").with_rows(42);
        let json = serde_json::to_string(&update).expect("Should serialize");
        assert!(json.contains("\"stage\":\"validation\""));
        assert!(json.contains("\"rows\":42"));

        let parsed: ProgressUpdate = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(parsed.stage, CleaningStage::Validation);
        assert_eq!(parsed.rows, Some(42));
    }
}
