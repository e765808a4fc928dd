use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Non-null and distinct counts for one column.
///
/// Logged before and after cleaning as
/// `"{column}: Non-null count = N, Unique count = M"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDiagnostics {
    pub column: String,
    pub dtype: String,
    pub non_null_count: usize,
    /// Distinct values, nulls excluded.
    pub unique_count: usize,
}

/// Reference statistics a run filled and capped with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_mode: Option<f64>,
    /// Population percentile computed before capping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_cap: Option<f64>,
}

// ============================================================================
// Cleaning Summary Types
// ============================================================================

/// Summary of what a cleaning run did.
///
/// # Example
///
/// ```rust,ignore
/// let result = Pipeline::builder().build()?.process(df)?;
/// let summary = &result.summary;
/// println!("{} -> {} rows in {}ms", summary.rows_before, summary.rows_after, summary.duration_ms);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Number of rows before cleaning.
    pub rows_before: usize,
    /// Number of rows after cleaning.
    pub rows_after: usize,
    /// Number of rows removed (duplicates plus invalid rows).
    pub rows_removed: usize,

    /// Exact duplicates removed by the first deduplication pass.
    pub duplicates_removed: usize,
    /// Rows that became identical during cleaning and were removed at the end.
    pub late_duplicates_removed: usize,
    /// Rows dropped for a negative population.
    pub invalid_population_removed: usize,

    /// Statistics used for imputation and capping.
    pub statistics: CleaningStatistics,

    /// Per-column diagnostics of the raw input.
    pub diagnostics_before: Vec<ColumnDiagnostics>,
    /// Per-column diagnostics of the cleaned output.
    pub diagnostics_after: Vec<ColumnDiagnostics>,

    /// Per-column counts of changes.
    pub column_summaries: Vec<ColumnSummary>,

    /// Actions taken, in order.
    pub actions: Vec<CleaningAction>,

    /// Warnings and notes generated while cleaning.
    pub warnings: Vec<String>,
}

impl CleaningSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the summary.
    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    /// Add a warning to the summary.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Mutable access to the summary of `column`, created on first use.
    pub fn column_mut(&mut self, column: &str) -> &mut ColumnSummary {
        let index = match self.column_summaries.iter().position(|c| c.name == column) {
            Some(index) => index,
            None => {
                self.column_summaries.push(ColumnSummary::new(column));
                self.column_summaries.len() - 1
            }
        };
        &mut self.column_summaries[index]
    }

    /// Summary of `column`, if anything was recorded for it.
    pub fn column(&self, column: &str) -> Option<&ColumnSummary> {
        self.column_summaries.iter().find(|c| c.name == column)
    }

    /// Percentage of input rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// Total nulls filled across all columns.
    pub fn total_nulls_imputed(&self) -> usize {
        self.column_summaries.iter().map(|c| c.nulls_imputed).sum()
    }
}

/// A single cleaning action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Column or target affected ("dataset" for whole-table actions).
    pub target: String,
    /// Human-readable description.
    pub description: String,
    /// Optional extra details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    /// Create a new action.
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    /// Add details to the action.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of cleaning actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Exact duplicate rows removed.
    DuplicatesRemoved,
    /// Missing values filled.
    ValuesImputed,
    /// Categorical codes mapped to labels.
    LabelsMapped,
    /// Label typos corrected.
    TyposCorrected,
    /// Surrounding whitespace stripped.
    WhitespaceStripped,
    /// Values clamped to a bound.
    OutliersCapped,
    /// Column type changed.
    TypeCoerced,
    /// Rows with invalid values dropped.
    InvalidRowsRemoved,
}

impl ActionType {
    /// Returns a human-readable name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::ValuesImputed => "Values Imputed",
            Self::LabelsMapped => "Labels Mapped",
            Self::TyposCorrected => "Typos Corrected",
            Self::WhitespaceStripped => "Whitespace Stripped",
            Self::OutliersCapped => "Outliers Capped",
            Self::TypeCoerced => "Type Coerced",
            Self::InvalidRowsRemoved => "Invalid Rows Removed",
        }
    }
}

/// Per-column counts of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub nulls_imputed: usize,
    pub values_capped: usize,
    pub typos_corrected: usize,
    pub whitespace_stripped: usize,
    pub unknown_values: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_dtype: Option<String>,
}

impl ColumnSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Output of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The cleaned record set.
    pub data: DataFrame,
    /// What the run did.
    pub summary: CleaningSummary,
}
