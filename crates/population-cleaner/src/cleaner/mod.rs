//! Row and value cleaning stages.
//!
//! This module provides:
//! - Exact duplicate row removal
//! - Categorical label normalization (gender codes, income typos)
//! - Type coercion of the numeric columns
//! - Range validation of the population column

mod converters;
mod normalizers;
mod validators;

pub use converters::{AgeRepresentation, TypeCoercer};
pub use normalizers::{CategoricalNormalizer, NormalizationReport};
pub(crate) use normalizers::resolve_gender_label;
pub use validators::RangeValidator;

use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Removes rows that repeat an earlier row exactly.
pub struct Deduplicator;

impl Deduplicator {
    /// Remove exact duplicate rows, keeping the first occurrence.
    ///
    /// All columns take part in the comparison and nulls compare equal.
    /// Surviving rows keep their original order.
    ///
    /// Returns the deduplicated frame and the number of rows removed.
    pub fn remove_duplicates(df: DataFrame) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let deduplicated = df
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        let removed = before - deduplicated.height();

        if removed > 0 {
            debug!(
                "Duplicates: {} of {} rows ({:.1}%)",
                removed,
                before,
                (removed as f64 / before as f64) * 100.0
            );
        }
        info!("Removed {} duplicate rows", removed);

        Ok((deduplicated, removed))
    }
}
