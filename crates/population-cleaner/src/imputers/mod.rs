//! Missing value imputation.

mod statistical;

pub use statistical::{ColumnFill, StatisticalImputer};

use crate::config::CleaningConfig;
use crate::schema::{AGE, GENDER, INCOME_GROUPS, POPULATION, YEAR};
use crate::types::CleaningStatistics;
use anyhow::Result;
use polars::prelude::*;
use tracing::info;

/// Fill counts for every tracked column plus the statistics used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationReport {
    pub statistics: CleaningStatistics,
    /// `(column, cells filled)` in the order the columns were processed.
    pub filled: Vec<(String, usize)>,
}

impl ImputationReport {
    /// Total cells filled.
    pub fn total_filled(&self) -> usize {
        self.filled.iter().map(|(_, n)| n).sum()
    }
}

/// Applies the fixed imputation policy of the population dataset.
pub struct MissingValueImputer;

impl MissingValueImputer {
    /// Fill every null in the tracked columns.
    ///
    /// - `population`, `age`: median
    /// - `gender`: `config.gender_fill_code`
    /// - `income_groups`, `year`: mode
    pub fn impute(df: &mut DataFrame, config: &CleaningConfig) -> Result<ImputationReport> {
        let mut report = ImputationReport::default();

        let population = StatisticalImputer::fill_median(df, POPULATION)?;
        report.statistics.population_median = population.value;
        report.filled.push((POPULATION.to_string(), population.filled));

        let age = StatisticalImputer::fill_median(df, AGE)?;
        report.statistics.age_median = age.value;
        report.filled.push((AGE.to_string(), age.filled));

        let gender = StatisticalImputer::fill_constant_code(df, GENDER, config.gender_fill_code)?;
        report.filled.push((GENDER.to_string(), gender.filled));

        let income = StatisticalImputer::fill_text_mode(df, INCOME_GROUPS)?;
        report.statistics.income_mode = income.value;
        report.filled.push((INCOME_GROUPS.to_string(), income.filled));

        let year = StatisticalImputer::fill_numeric_mode(df, YEAR)?;
        report.statistics.year_mode = year.value;
        report.filled.push((YEAR.to_string(), year.filled));

        info!("Missing values completed ({} cells filled)", report.total_filled());
        Ok(report)
    }
}
