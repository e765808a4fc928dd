//! Statistical imputation methods.
//!
//! Provides median, mode and constant imputation. Every fill value is
//! computed once from the column's non-null values before any cell of that
//! column is filled.

use crate::error::CleaningError;
use crate::utils::{is_numeric_dtype, numeric_cells, numeric_mode, string_mode, text_cells};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Outcome of filling one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFill<T> {
    /// The statistic or constant used. `None` when the column had no values
    /// to derive it from and nothing to fill.
    pub value: Option<T>,
    /// Number of cells filled.
    pub filled: usize,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls in a numeric column with the median of its non-null values.
    pub fn fill_median(df: &mut DataFrame, col_name: &str) -> Result<ColumnFill<f64>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let cells = numeric_cells(&series)?;
        let fill = Series::new(col_name.into(), cells.as_slice()).median();
        Self::fill_numeric(df, col_name, cells, fill, "median")
    }

    /// Fill nulls in a numeric column with its most frequent value.
    ///
    /// Ties go to the value that appears first.
    pub fn fill_numeric_mode(df: &mut DataFrame, col_name: &str) -> Result<ColumnFill<f64>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let cells = numeric_cells(&series)?;
        let fill = numeric_mode(&cells);
        Self::fill_numeric(df, col_name, cells, fill, "mode")
    }

    /// Fill nulls in a text column with its most frequent value.
    ///
    /// Ties go to the value that appears first.
    pub fn fill_text_mode(df: &mut DataFrame, col_name: &str) -> Result<ColumnFill<String>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let cells = text_cells(&series)?;
        let missing = cells.iter().filter(|v| v.is_none()).count();

        let Some(mode) = string_mode(&cells) else {
            return Self::nothing_to_fill(col_name, missing);
        };

        let filled: Vec<Option<String>> = cells
            .into_iter()
            .map(|v| Some(v.unwrap_or_else(|| mode.clone())))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), filled))?;
        debug!("Filled {} nulls in '{}' with mode: '{}'", missing, col_name, mode);

        Ok(ColumnFill {
            value: Some(mode),
            filled: missing,
        })
    }

    /// Fill nulls with a fixed code.
    ///
    /// Numeric columns receive the code as a number, text columns receive
    /// its decimal representation.
    pub fn fill_constant_code(
        df: &mut DataFrame,
        col_name: &str,
        code: i64,
    ) -> Result<ColumnFill<i64>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let missing = series.null_count();

        if is_numeric_dtype(series.dtype()) || series.dtype() == &DataType::Null {
            let cells = numeric_cells(&series)?;
            let filled: Vec<Option<f64>> = cells
                .into_iter()
                .map(|v| Some(v.unwrap_or(code as f64)))
                .collect();
            df.replace(col_name, Series::new(col_name.into(), filled))?;
        } else {
            let cells = text_cells(&series)?;
            let filled: Vec<Option<String>> = cells
                .into_iter()
                .map(|v| Some(v.unwrap_or_else(|| code.to_string())))
                .collect();
            df.replace(col_name, Series::new(col_name.into(), filled))?;
        }

        debug!("Filled {} nulls in '{}' with constant {}", missing, col_name, code);
        Ok(ColumnFill {
            value: Some(code),
            filled: missing,
        })
    }

    fn fill_numeric(
        df: &mut DataFrame,
        col_name: &str,
        cells: Vec<Option<f64>>,
        fill: Option<f64>,
        method: &str,
    ) -> Result<ColumnFill<f64>> {
        let missing = cells.iter().filter(|v| v.is_none()).count();
        let Some(fill) = fill else {
            return Self::nothing_to_fill(col_name, missing);
        };

        let filled: Vec<Option<f64>> = cells.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
        df.replace(col_name, Series::new(col_name.into(), filled))?;
        debug!(
            "Filled {} nulls in '{}' with {}: {}",
            missing, col_name, method, fill
        );

        Ok(ColumnFill {
            value: Some(fill),
            filled: missing,
        })
    }

    fn nothing_to_fill<T>(col_name: &str, missing: usize) -> Result<ColumnFill<T>> {
        if missing > 0 {
            return Err(CleaningError::NoValidValues(col_name.to_string()).into());
        }
        Ok(ColumnFill {
            value: None,
            filled: 0,
        })
    }
}
