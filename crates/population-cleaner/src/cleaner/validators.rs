//! Range validation.

use crate::schema::POPULATION;
use crate::utils::numeric_cells;
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Final gate that drops rows whose values cannot be repaired.
pub struct RangeValidator;

impl RangeValidator {
    /// Drop rows with a negative or missing population.
    ///
    /// Negative populations are treated as missing, and rows missing a
    /// population are removed. Returns the filtered frame and the number of
    /// rows dropped.
    pub fn drop_invalid_population(df: DataFrame) -> Result<(DataFrame, usize)> {
        let series = df.column(POPULATION)?.as_materialized_series();
        let cells = numeric_cells(series)?;

        let negative = cells.iter().flatten().filter(|v| **v < 0.0).count();
        let keep: Vec<bool> = cells
            .iter()
            .map(|v| matches!(v, Some(x) if *x >= 0.0))
            .collect();

        let before = df.height();
        let mask = BooleanChunked::from_slice("valid_population".into(), &keep);
        let filtered = df.filter(&mask)?;
        let dropped = before - filtered.height();

        if negative > 0 {
            debug!("{} negative population values marked as missing", negative);
        }
        info!("Removed {} rows with an invalid population", dropped);

        Ok((filtered, dropped))
    }
}
