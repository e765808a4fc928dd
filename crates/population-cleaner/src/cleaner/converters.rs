//! Type coercion for the numeric columns.

use crate::schema::{AGE, POPULATION, YEAR};
use crate::utils::{format_number, is_integral, numeric_cells};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// How the age column was stored after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeRepresentation {
    /// Every age was integral: stored as `Int64`.
    Integer,
    /// At least one fractional age: each value rendered as text, integral
    /// values without a fractional part.
    Mixed,
}

/// Casts the numeric columns to their output types.
pub struct TypeCoercer;

impl TypeCoercer {
    /// Truncate `population` to integers.
    ///
    /// Returns the number of values that had a fractional part.
    pub fn coerce_population(df: &mut DataFrame) -> Result<usize> {
        Self::truncate_to_int(df, POPULATION)
    }

    /// Truncate `year` to integers.
    pub fn coerce_year(df: &mut DataFrame) -> Result<usize> {
        Self::truncate_to_int(df, YEAR)
    }

    /// Store integral ages as integers while keeping fractional ones.
    ///
    /// A polars column has one type, so when fractional ages are present
    /// the column becomes text with per-value formatting (`"34"`, `"34.5"`).
    pub fn coerce_age(df: &mut DataFrame) -> Result<AgeRepresentation> {
        let series = df.column(AGE)?.as_materialized_series().clone();
        let cells = numeric_cells(&series)?;

        if cells.iter().flatten().all(|v| is_integral(*v)) {
            let ints: Vec<Option<i64>> = cells.iter().map(|v| v.map(|x| x as i64)).collect();
            df.replace(AGE, Series::new(AGE.into(), ints))?;
            debug!("Age column stored as integers");
            return Ok(AgeRepresentation::Integer);
        }

        let fractional = cells.iter().flatten().filter(|v| !is_integral(**v)).count();
        let rendered: Vec<Option<String>> = cells.iter().map(|v| v.map(format_number)).collect();
        df.replace(AGE, Series::new(AGE.into(), rendered))?;
        debug!(
            "Age column keeps {} fractional values; stored with per-value formatting",
            fractional
        );

        Ok(AgeRepresentation::Mixed)
    }

    fn truncate_to_int(df: &mut DataFrame, col_name: &str) -> Result<usize> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let cells = numeric_cells(&series)?;

        let fractional = cells
            .iter()
            .flatten()
            .filter(|v| !is_integral(**v))
            .count();
        let ints: Vec<Option<i64>> = cells.iter().map(|v| v.map(|x| x.trunc() as i64)).collect();

        df.replace(col_name, Series::new(col_name.into(), ints))?;
        debug!(
            "Cast '{}' to integers ({} fractional values truncated)",
            col_name, fractional
        );

        Ok(fractional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(df: &DataFrame, col: &str) -> Vec<Option<i64>> {
        df.column(col)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_population_truncates_toward_zero() {
        let mut df = df!["population" => [Some(500.9), Some(-0.5), Some(12.0), None]].unwrap();
        let fractional = TypeCoercer::coerce_population(&mut df).unwrap();

        assert_eq!(fractional, 2);
        assert_eq!(ints(&df, "population"), vec![Some(500), Some(0), Some(12), None]);
    }

    #[test]
    fn test_year_from_text() {
        let mut df = df!["year" => ["2020", "2021.0", " 2019 "]].unwrap();
        TypeCoercer::coerce_year(&mut df).unwrap();
        assert_eq!(ints(&df, "year"), vec![Some(2020), Some(2021), Some(2019)]);
    }

    #[test]
    fn test_integral_ages_become_int() {
        let mut df = df!["age" => [30.0, 120.0, 0.0]].unwrap();
        let repr = TypeCoercer::coerce_age(&mut df).unwrap();

        assert_eq!(repr, AgeRepresentation::Integer);
        assert_eq!(ints(&df, "age"), vec![Some(30), Some(120), Some(0)]);
    }

    #[test]
    fn test_fractional_ages_preserved() {
        let mut df = df!["age" => [30.0, 34.5, 120.0]].unwrap();
        let repr = TypeCoercer::coerce_age(&mut df).unwrap();

        assert_eq!(repr, AgeRepresentation::Mixed);
        let values: Vec<Option<&str>> = df
            .column("age")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some("30"), Some("34.5"), Some("120")]);
    }

    #[test]
    fn test_age_text_column_parsed_then_tested() {
        let mut df = df!["age" => ["41", "42.0"]].unwrap();
        let repr = TypeCoercer::coerce_age(&mut df).unwrap();
        assert_eq!(repr, AgeRepresentation::Integer);
        assert_eq!(ints(&df, "age"), vec![Some(41), Some(42)]);
    }
}
