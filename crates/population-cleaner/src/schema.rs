//! Column names of the population dataset.

use crate::error::{CleaningError, Result};
use polars::prelude::*;

pub const POPULATION: &str = "population";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const INCOME_GROUPS: &str = "income_groups";
pub const YEAR: &str = "year";

/// Columns every input file must provide. Any other column is passed
/// through untouched.
pub const TRACKED_COLUMNS: [&str; 5] = [POPULATION, AGE, GENDER, INCOME_GROUPS, YEAR];

/// Canonical gender labels, indexed by `code - 1`.
pub const GENDER_LABELS: [&str; 3] = ["Male", "Female", "Other"];

/// Ensure all tracked columns are present.
pub fn require_columns(df: &DataFrame) -> Result<()> {
    let names = df.get_column_names();
    for required in TRACKED_COLUMNS {
        if !names.iter().any(|name| name.as_str() == required) {
            return Err(CleaningError::ColumnNotFound(required.to_string()));
        }
    }
    Ok(())
}
