//! Per-column diagnostics.
//!
//! The same diagnostic is produced right after loading and again after the
//! last stage so the two can be compared in the log and in the run report.

use crate::types::ColumnDiagnostics;
use crate::utils::distinct_non_null;
use anyhow::Result;
use polars::prelude::*;
use tracing::info;

/// Computes and logs per-column counts for a dataset.
pub struct DataProfiler;

impl DataProfiler {
    /// Non-null and distinct (non-null) counts for every column, in column order.
    pub fn column_diagnostics(df: &DataFrame) -> Result<Vec<ColumnDiagnostics>> {
        let mut diagnostics = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            diagnostics.push(ColumnDiagnostics {
                column: series.name().to_string(),
                dtype: format!("{:?}", series.dtype()),
                non_null_count: series.len() - series.null_count(),
                unique_count: distinct_non_null(series)?,
            });
        }

        Ok(diagnostics)
    }

    /// Log one line per column.
    pub fn log_diagnostics(label: &str, diagnostics: &[ColumnDiagnostics]) {
        info!("{}", label);
        for diag in diagnostics {
            info!(
                "{}: Non-null count = {}, Unique count = {}",
                diag.column, diag.non_null_count, diag.unique_count
            );
        }
    }

    /// Compute, log and return the diagnostics.
    pub fn profile(label: &str, df: &DataFrame) -> Result<Vec<ColumnDiagnostics>> {
        let diagnostics = Self::column_diagnostics(df)?;
        Self::log_diagnostics(label, &diagnostics);
        Ok(diagnostics)
    }

    /// Number of rows that repeat an earlier row exactly.
    pub fn duplicate_count(df: &DataFrame) -> Result<usize> {
        let unique = df
            .clone()
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        Ok(df.height() - unique.height())
    }
}
