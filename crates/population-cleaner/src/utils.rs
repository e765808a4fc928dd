//! Shared utilities for the cleaning pipeline.
//!
//! Cell extraction helpers turn polars columns into plain `Vec<Option<_>>`
//! buffers so the stages can apply their rules row by row, and the
//! statistics helpers compute the reference values (mode,
//! percentile) the stages fill or cap with.

use crate::config::QuantileMethod;
use crate::error::CleaningError;
use anyhow::Result;
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Cell Parsing Utilities
// =============================================================================

/// Text values treated as missing in addition to empty cells.
pub const MISSING_MARKERS: [&str; 10] = [
    "na", "n/a", "nan", "null", "none", "missing", "-", "#n/a", "nat", "<na>",
];

/// Check if a string is a missing value marker.
///
/// # Example
///
/// ```rust,ignore
/// use population_cleaner::utils::is_missing_marker;
///
/// assert!(is_missing_marker("N/A"));
/// assert!(is_missing_marker("  "));
/// assert!(!is_missing_marker("42"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Parse a text cell as a number.
///
/// Returns `Ok(None)` for missing markers and `Err` with the offending text
/// when the cell is present but not numeric.
pub fn parse_numeric_cell(s: &str) -> std::result::Result<Option<f64>, String> {
    if is_missing_marker(s) {
        return Ok(None);
    }
    let trimmed = s.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(trimmed.to_string()),
    }
}

/// Extract a column as `f64` cells, parsing text when needed.
///
/// Numeric columns are cast directly. Text columns go through
/// [`parse_numeric_cell`], so `"42"`, `" 42.0 "` and `"N/A"` become
/// `Some(42.0)`, `Some(42.0)` and `None`. Non-numeric text is a
/// [`CleaningError::TypeConversionFailed`].
pub fn numeric_cells(series: &Series) -> Result<Vec<Option<f64>>> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) || dtype == &DataType::Null {
        let cast = series.cast(&DataType::Float64)?;
        let values = cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        return Ok(values);
    }

    if dtype == &DataType::String {
        let mut values = Vec::with_capacity(series.len());
        for cell in series.str()?.into_iter() {
            match cell {
                Some(text) => match parse_numeric_cell(text) {
                    Ok(v) => values.push(v),
                    Err(bad) => {
                        return Err(CleaningError::TypeConversionFailed {
                            column: series.name().to_string(),
                            target_type: "number".to_string(),
                            reason: format!("value '{}' is not numeric", bad),
                        }
                        .into());
                    }
                },
                None => values.push(None),
            }
        }
        return Ok(values);
    }

    Err(CleaningError::TypeConversionFailed {
        column: series.name().to_string(),
        target_type: "number".to_string(),
        reason: format!("unsupported column type {:?}", dtype),
    }
    .into())
}

/// Extract a column as text cells.
///
/// Numeric values are rendered with [`format_number`], so an integral
/// float such as `1.0` becomes `"1"`.
pub fn text_cells(series: &Series) -> Result<Vec<Option<String>>> {
    let dtype = series.dtype();
    if dtype == &DataType::String {
        return Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect());
    }

    if is_numeric_dtype(dtype) || dtype == &DataType::Null {
        return Ok(numeric_cells(series)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect());
    }

    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Check whether a value has no fractional part.
#[inline]
pub fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if is_integral(value) && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Most frequent non-null number; ties go to the value seen first.
pub fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    // -0.0 and 0.0 count as the same value
    let key = |v: f64| if v == 0.0 { 0u64 } else { v.to_bits() };
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values.iter().flatten() {
        *counts.entry(key(*v)).or_insert(0) += 1;
    }
    first_with_max_count(values.iter().flatten().copied(), |v| {
        counts.get(&key(*v)).copied().unwrap_or(0)
    })
}

/// Most frequent non-null string; ties go to the value seen first.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    first_with_max_count(values.iter().flatten(), |v| {
        counts.get(v.as_str()).copied().unwrap_or(0)
    })
    .cloned()
}

fn first_with_max_count<T>(
    items: impl Iterator<Item = T>,
    count_of: impl Fn(&T) -> usize,
) -> Option<T> {
    let mut best: Option<(T, usize)> = None;
    for item in items {
        let count = count_of(&item);
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((item, count)),
        }
    }
    best.map(|(item, _)| item)
}

/// Percentile `q` (0.0 - 1.0) of the non-null values.
///
/// The position of the percentile in the sorted values is `q * (n - 1)`;
/// `method` decides what happens when that position falls between two
/// observations.
pub fn quantile(values: &[Option<f64>], q: f64, method: QuantileMethod) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    let (low, high) = (sorted[lo], sorted[hi]);

    let value = match method {
        QuantileMethod::Linear => low + (high - low) * frac,
        QuantileMethod::Lower => low,
        QuantileMethod::Higher => high,
        QuantileMethod::Nearest => {
            if frac < 0.5 || (frac == 0.5 && lo % 2 == 0) {
                low
            } else {
                high
            }
        }
        QuantileMethod::Midpoint => (low + high) / 2.0,
    };
    Some(value)
}

/// Number of distinct non-null values in a Series.
pub fn distinct_non_null(series: &Series) -> PolarsResult<usize> {
    series.drop_nulls().n_unique()
}

// =============================================================================
// Tests
// =============================================================================
