//! Outlier capping.
//!
//! Values beyond a bound are clamped to the bound, never removed.

use crate::config::{CleaningConfig, QuantileMethod};
use crate::schema::{AGE, POPULATION};
use crate::utils::{numeric_cells, quantile};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Result of capping one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapOutcome {
    /// Upper bound applied, if one could be computed.
    pub upper: Option<f64>,
    /// Values raised to the lower bound.
    pub raised: usize,
    /// Values lowered to the upper bound.
    pub lowered: usize,
}

impl CapOutcome {
    pub fn total(&self) -> usize {
        self.raised + self.lowered
    }
}

/// Clamps population and age values.
pub struct OutlierCapper;

impl OutlierCapper {
    /// Cap both columns using the configured bounds.
    pub fn cap(df: &mut DataFrame, config: &CleaningConfig) -> Result<(CapOutcome, CapOutcome)> {
        let population =
            Self::cap_population(df, config.population_percentile, config.percentile_method)?;
        let age = Self::cap_age(df, config.min_age, config.max_age)?;
        Ok((population, age))
    }

    /// Clamp populations above the `percentile` of the current distribution.
    ///
    /// The percentile is computed once over all non-null values before any
    /// value is changed.
    pub fn cap_population(
        df: &mut DataFrame,
        percentile: f64,
        method: QuantileMethod,
    ) -> Result<CapOutcome> {
        let series = df.column(POPULATION)?.as_materialized_series().clone();
        let cells = numeric_cells(&series)?;

        let Some(cap) = quantile(&cells, percentile, method) else {
            debug!("No population values to cap");
            return Ok(CapOutcome {
                upper: None,
                raised: 0,
                lowered: 0,
            });
        };

        let (capped, lowered) = clamp_cells(&cells, f64::NEG_INFINITY, cap);
        df.replace(POPULATION, Series::new(POPULATION.into(), capped))?;
        info!(
            "Capped {} population values at the {:.0}th percentile ({})",
            lowered,
            percentile * 100.0,
            cap
        );

        Ok(CapOutcome {
            upper: Some(cap),
            raised: 0,
            lowered,
        })
    }

    /// Clamp ages into `[min_age, max_age]`.
    pub fn cap_age(df: &mut DataFrame, min_age: f64, max_age: f64) -> Result<CapOutcome> {
        let series = df.column(AGE)?.as_materialized_series().clone();
        let cells = numeric_cells(&series)?;

        let (raised_cells, raised) = raise_cells(&cells, min_age);
        let (capped, lowered) = clamp_cells(&raised_cells, min_age, max_age);
        df.replace(AGE, Series::new(AGE.into(), capped))?;
        info!(
            "Capped {} ages above {} and raised {} ages below {}",
            lowered, max_age, raised, min_age
        );

        Ok(CapOutcome {
            upper: Some(max_age),
            raised,
            lowered,
        })
    }
}

/// Lower values above `upper` to `upper`; returns the cells and how many changed.
fn clamp_cells(cells: &[Option<f64>], lower: f64, upper: f64) -> (Vec<Option<f64>>, usize) {
    let mut changed = 0;
    let out: Vec<Option<f64>> = cells
        .iter()
        .map(|v| {
            v.map(|x| {
                if x > upper {
                    changed += 1;
                    upper
                } else {
                    x.max(lower)
                }
            })
        })
        .collect();
    (out, changed)
}

/// Raise values below `lower` to `lower`; returns the cells and how many changed.
fn raise_cells(cells: &[Option<f64>], lower: f64) -> (Vec<Option<f64>>, usize) {
    let mut changed = 0;
    let out: Vec<Option<f64>> = cells
        .iter()
        .map(|v| {
            v.map(|x| {
                if x < lower {
                    changed += 1;
                    lower
                } else {
                    x
                }
            })
        })
        .collect();
    (out, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(df: &DataFrame, col: &str) -> Vec<Option<f64>> {
        df.column(col)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_cap_population_linear() {
        let mut df = df!["population" => [1.0, 2.0, 100.0]].unwrap();
        let outcome =
            OutlierCapper::cap_population(&mut df, 0.99, QuantileMethod::Linear).unwrap();

        let cap = outcome.upper.unwrap();
        assert!((cap - 98.04).abs() < 1e-9);
        assert_eq!(outcome.lowered, 1);
        assert_eq!(floats(&df, "population"), vec![Some(1.0), Some(2.0), Some(cap)]);
    }

    #[test]
    fn test_cap_population_lower_is_stable() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let mut df = df!["population" => values].unwrap();

        let first = OutlierCapper::cap_population(&mut df, 0.99, QuantileMethod::Lower).unwrap();
        assert_eq!(first.upper, Some(99.0));
        assert_eq!(first.lowered, 1);

        let second = OutlierCapper::cap_population(&mut df, 0.99, QuantileMethod::Lower).unwrap();
        assert_eq!(second.upper, Some(99.0));
        assert_eq!(second.lowered, 0);
    }

    #[test]
    fn test_cap_population_leaves_negatives() {
        let mut df = df!["population" => [-50.0, 10.0, 20.0]].unwrap();
        OutlierCapper::cap_population(&mut df, 0.99, QuantileMethod::Lower).unwrap();
        assert_eq!(floats(&df, "population")[0], Some(-50.0));
    }

    #[test]
    fn test_cap_age() {
        let mut df = df!["age" => [Some(200.0), Some(-3.0), Some(45.5), Some(120.0)]].unwrap();
        let outcome = OutlierCapper::cap_age(&mut df, 0.0, 120.0).unwrap();

        assert_eq!(outcome.lowered, 1);
        assert_eq!(outcome.raised, 1);
        assert_eq!(outcome.total(), 2);
        assert_eq!(
            floats(&df, "age"),
            vec![Some(120.0), Some(0.0), Some(45.5), Some(120.0)]
        );
    }

    #[test]
    fn test_cap_empty_population() {
        let mut df = df!["population" => Vec::<f64>::new()].unwrap();
        let outcome =
            OutlierCapper::cap_population(&mut df, 0.99, QuantileMethod::Linear).unwrap();
        assert_eq!(outcome.upper, None);
        assert_eq!(outcome.total(), 0);
    }
}
