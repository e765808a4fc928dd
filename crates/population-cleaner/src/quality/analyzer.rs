use crate::cleaner::resolve_gender_label;
use crate::config::CleaningConfig;
use crate::profiler::DataProfiler;
use crate::schema::{AGE, GENDER, INCOME_GROUPS, POPULATION};
use crate::utils::{format_number, is_integral, numeric_cells, quantile, text_cells};
use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

static TYPO_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)_typo$").expect("Invalid regex: typo suffix"));

/// How much an issue matters for the cleaned output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub issue_type: String,
    pub severity: Severity,
    pub column: String,
    pub description: String,
    pub affected_rows: usize,
}

/// Null and distinct counts for one raw column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInspection {
    pub column: String,
    pub dtype: String,
    pub null_count: usize,
    pub distinct_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Defects found in a raw record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub rows: usize,
    pub columns: Vec<ColumnInspection>,
    pub duplicate_rows: usize,

    /// Raw gender values in order of first appearance.
    pub gender_counts: Vec<ValueCount>,
    /// Raw income labels in order of first appearance.
    pub income_counts: Vec<ValueCount>,

    /// Income labels the correction table rewrites.
    pub typo_labels: usize,
    /// Income labels ending in `_typo` that the correction table misses.
    pub unmapped_typo_labels: usize,
    pub whitespace_labels: usize,
    /// Gender values that are neither a code nor a label.
    pub unknown_gender_values: usize,

    pub ages_above_max: usize,
    pub ages_below_min: usize,
    pub fractional_ages: usize,

    pub negative_populations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_percentile_value: Option<f64>,
    pub populations_above_percentile: usize,

    pub issues: Vec<QualityIssue>,
}

impl InspectionReport {
    /// Total missing cells across all columns.
    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| c.null_count).sum()
    }
}

/// Read-only exploratory pass over the raw data.
pub struct DataQualityAnalyzer;

impl DataQualityAnalyzer {
    /// Inspect `df` for the defects the pipeline repairs.
    ///
    /// Bounds and the correction table come from `config`. The frame is not
    /// modified.
    pub fn inspect(df: &DataFrame, config: &CleaningConfig) -> Result<InspectionReport> {
        let columns = Self::inspect_columns(df)?;
        let duplicate_rows = DataProfiler::duplicate_count(df)?;

        let genders = text_cells(df.column(GENDER)?.as_materialized_series())?;
        let incomes = text_cells(df.column(INCOME_GROUPS)?.as_materialized_series())?;
        let ages = numeric_cells(df.column(AGE)?.as_materialized_series())?;
        let populations = numeric_cells(df.column(POPULATION)?.as_materialized_series())?;

        let mut typo_labels = 0;
        let mut unmapped_typo_labels = 0;
        let mut whitespace_labels = 0;
        for label in incomes.iter().flatten() {
            let trimmed = label.trim();
            if trimmed.len() != label.len() {
                whitespace_labels += 1;
            }
            if config.income_corrections.contains_key(label.as_str())
                || config.income_corrections.contains_key(trimmed)
            {
                typo_labels += 1;
            } else if TYPO_SUFFIX.is_match(trimmed) {
                unmapped_typo_labels += 1;
            }
        }

        let unknown_gender_values = genders
            .iter()
            .flatten()
            .filter(|g| resolve_gender_label(g).is_none())
            .count();

        let present_ages: Vec<f64> = ages.iter().flatten().copied().collect();
        let ages_above_max = present_ages.iter().filter(|a| **a > config.max_age).count();
        let ages_below_min = present_ages.iter().filter(|a| **a < config.min_age).count();
        let fractional_ages = present_ages.iter().filter(|a| !is_integral(**a)).count();

        let negative_populations = populations.iter().flatten().filter(|p| **p < 0.0).count();
        let population_percentile_value = quantile(
            &populations,
            config.population_percentile,
            config.percentile_method,
        );
        let populations_above_percentile = population_percentile_value
            .map(|cap| populations.iter().flatten().filter(|p| **p > cap).count())
            .unwrap_or(0);

        let mut report = InspectionReport {
            rows: df.height(),
            columns,
            duplicate_rows,
            gender_counts: value_counts(&genders),
            income_counts: value_counts(&incomes),
            typo_labels,
            unmapped_typo_labels,
            whitespace_labels,
            unknown_gender_values,
            ages_above_max,
            ages_below_min,
            fractional_ages,
            negative_populations,
            population_percentile_value,
            populations_above_percentile,
            issues: Vec::new(),
        };
        report.issues = Self::identify_issues(&report, config);

        info!(
            "Inspection found {} issues in {} rows",
            report.issues.len(),
            report.rows
        );
        Ok(report)
    }

    fn inspect_columns(df: &DataFrame) -> Result<Vec<ColumnInspection>> {
        let diagnostics = DataProfiler::column_diagnostics(df)?;
        Ok(diagnostics
            .into_iter()
            .map(|d| ColumnInspection {
                null_count: df.height() - d.non_null_count,
                distinct_count: d.unique_count,
                column: d.column,
                dtype: d.dtype,
            })
            .collect())
    }

    fn identify_issues(report: &InspectionReport, config: &CleaningConfig) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        for col in report.columns.iter().filter(|c| c.null_count > 0) {
            let pct = col.null_count as f64 / report.rows.max(1) as f64 * 100.0;
            issues.push(QualityIssue {
                issue_type: "missing_values".to_string(),
                severity: if pct > 20.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                column: col.column.clone(),
                description: format!("{} missing values ({:.1}%)", col.null_count, pct),
                affected_rows: col.null_count,
            });
        }

        let mut push = |issue_type: &str, severity, column: &str, count: usize, description: String| {
            if count > 0 {
                issues.push(QualityIssue {
                    issue_type: issue_type.to_string(),
                    severity,
                    column: column.to_string(),
                    description,
                    affected_rows: count,
                });
            }
        };

        push(
            "duplicate_rows",
            Severity::Medium,
            "dataset",
            report.duplicate_rows,
            format!("{} rows repeat an earlier row", report.duplicate_rows),
        );
        push(
            "label_typos",
            Severity::Medium,
            INCOME_GROUPS,
            report.typo_labels,
            format!("{} labels have a known typo", report.typo_labels),
        );
        push(
            "unmapped_typo_labels",
            Severity::High,
            INCOME_GROUPS,
            report.unmapped_typo_labels,
            format!(
                "{} labels end in '_typo' but have no correction",
                report.unmapped_typo_labels
            ),
        );
        push(
            "label_whitespace",
            Severity::Low,
            INCOME_GROUPS,
            report.whitespace_labels,
            format!("{} labels have surrounding whitespace", report.whitespace_labels),
        );
        push(
            "unknown_gender",
            Severity::High,
            GENDER,
            report.unknown_gender_values,
            format!(
                "{} values are not a known gender code or label",
                report.unknown_gender_values
            ),
        );
        push(
            "age_above_max",
            Severity::Medium,
            AGE,
            report.ages_above_max,
            format!(
                "{} ages above {}",
                report.ages_above_max,
                format_number(config.max_age)
            ),
        );
        push(
            "age_below_min",
            Severity::Medium,
            AGE,
            report.ages_below_min,
            format!(
                "{} ages below {}",
                report.ages_below_min,
                format_number(config.min_age)
            ),
        );
        push(
            "fractional_ages",
            Severity::Low,
            AGE,
            report.fractional_ages,
            format!("{} ages have a fractional part", report.fractional_ages),
        );
        push(
            "negative_population",
            Severity::High,
            POPULATION,
            report.negative_populations,
            format!("{} negative populations", report.negative_populations),
        );
        if let Some(cap) = report.population_percentile_value {
            push(
                "population_outliers",
                Severity::Medium,
                POPULATION,
                report.populations_above_percentile,
                format!(
                    "{} populations above the {} percentile ({})",
                    report.populations_above_percentile,
                    config.population_percentile,
                    format_number(cap)
                ),
            );
        }

        debug!("Identified {} quality issues", issues.len());
        issues
    }
}

/// Counts of non-null values in order of first appearance.
fn value_counts(cells: &[Option<String>]) -> Vec<ValueCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();

    for value in cells.iter().flatten() {
        match index.get(value.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value.as_str(), counts.len());
                counts.push(ValueCount {
                    value: value.clone(),
                    count: 1,
                });
            }
        }
    }

    counts
}
