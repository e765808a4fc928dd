//! Integration tests for the population cleaning pipeline.
//!
//! These tests run the pipeline end to end over the CSV fixtures and check
//! the written output.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use population_cleaner::utils::{numeric_cells, text_cells};
use population_cleaner::{
    CleaningConfig, CleaningError, CleaningStage, DataProfiler, DataQualityAnalyzer,
    DatasetLoader, DatasetWriter, Pipeline, RunReport, UnknownGenderPolicy,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(filename: &str) -> PathBuf {
    fixtures_path().join(filename)
}

/// Fresh per-test output directory.
fn output_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "population-cleaner-it-{}-{}",
        test_name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create output directory");
    dir
}

fn load_csv(path: &PathBuf) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.clone()))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn clean(input: &str, test_name: &str) -> (PathBuf, DataFrame) {
    let output = output_dir(test_name).join("cleaned.csv");
    Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture(input), &output)
        .expect("Cleaning should succeed");
    let df = load_csv(&output);
    (output, df)
}

fn ints(df: &DataFrame, col: &str) -> Vec<Option<i64>> {
    df.column(col)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

fn numbers(df: &DataFrame, col: &str) -> Vec<Option<f64>> {
    numeric_cells(df.column(col).unwrap().as_materialized_series()).unwrap()
}

fn strings(df: &DataFrame, col: &str) -> Vec<Option<String>> {
    text_cells(df.column(col).unwrap().as_materialized_series()).unwrap()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_typo_row_is_fully_repaired() {
    let (_, df) = clean("scenario_typo_row.csv", "typo_row");

    assert_eq!(df.height(), 3);
    assert_eq!(ints(&df, "population")[0], Some(500));
    assert_eq!(ints(&df, "age")[0], Some(120));
    assert_eq!(strings(&df, "gender")[0].as_deref(), Some("Male"));
    assert_eq!(strings(&df, "income_groups")[0].as_deref(), Some("low_income"));
    assert_eq!(ints(&df, "year")[0], Some(2020));
}

#[test]
fn test_identical_rows_collapse_to_one() {
    let output = output_dir("duplicates").join("cleaned.csv");
    let result = Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture("scenario_duplicates.csv"), &output)
        .unwrap();

    assert_eq!(result.summary.duplicates_removed, 1);
    assert_eq!(load_csv(&output).height(), 2);
}

#[test]
fn test_negative_population_row_dropped() {
    let output = output_dir("negative").join("cleaned.csv");
    let result = Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture("scenario_negative_population.csv"), &output)
        .unwrap();

    assert_eq!(result.summary.invalid_population_removed, 1);
    let df = load_csv(&output);
    assert_eq!(df.height(), 2);
    assert!(ints(&df, "population").iter().all(|p| p.unwrap() >= 0));
    assert_eq!(ints(&df, "year"), vec![Some(2021), Some(2019)]);
}

#[test]
fn test_null_gender_becomes_other() {
    let (_, df) = clean("scenario_null_gender.csv", "null_gender");

    assert_eq!(
        strings(&df, "gender"),
        vec![Some("Other".to_string()), Some("Male".to_string())]
    );
}

#[test]
fn test_missing_input_writes_nothing() {
    let dir = output_dir("missing_input");
    let output = dir.join("cleaned.csv");

    let err = Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture("does_not_exist.csv"), &output)
        .unwrap_err();

    assert!(matches!(err, CleaningError::InputNotFound(_)));
    assert!(err.is_load_error());
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

// ============================================================================
// Load and Stage Failures
// ============================================================================

#[test]
fn test_missing_tracked_column() {
    let err = DatasetLoader::load(fixture("missing_column.csv")).unwrap_err();
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    assert!(err.to_string().contains("year"));
}

#[test]
fn test_non_numeric_population_aborts_without_output() {
    let output = output_dir("non_numeric").join("cleaned.csv");

    let err = Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture("non_numeric_population.csv"), &output)
        .unwrap_err();

    assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
    assert!(!err.is_load_error());
    assert!(!output.exists());
}

#[test]
fn test_unknown_gender_policies() {
    let (_, df) = clean("unknown_gender.csv", "unknown_gender_default");
    assert_eq!(strings(&df, "gender")[1].as_deref(), Some("Other"));

    let config = CleaningConfig::builder()
        .unknown_gender(UnknownGenderPolicy::Reject)
        .build()
        .unwrap();
    let output = output_dir("unknown_gender_reject").join("cleaned.csv");
    let err = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .clean_file(fixture("unknown_gender.csv"), &output)
        .unwrap_err();

    assert_eq!(err.error_code(), "UNKNOWN_GENDER_CODE");
    assert!(!output.exists());
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_messy_dataset_invariants() {
    let output = output_dir("invariants").join("cleaned.csv");
    let raw = DatasetLoader::load(fixture("messy_population.csv")).unwrap();
    let result = Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture("messy_population.csv"), &output)
        .unwrap();
    let df = load_csv(&output);

    // same columns in the same order
    assert_eq!(df.get_column_names(), raw.get_column_names());
    assert!(df.height() <= raw.height());
    assert_eq!(DataProfiler::duplicate_count(&df).unwrap(), 0);

    for col in ["population", "age", "gender", "income_groups", "year"] {
        assert_eq!(df.column(col).unwrap().null_count(), 0, "nulls left in {}", col);
    }

    let cap = result.summary.statistics.population_cap.unwrap();
    for p in numbers(&df, "population").into_iter().flatten() {
        assert!(p >= 0.0 && p <= cap, "population {} outside [0, {}]", p, cap);
    }
    for a in numbers(&df, "age").into_iter().flatten() {
        assert!((0.0..=120.0).contains(&a), "age {} outside [0, 120]", a);
    }
    for g in strings(&df, "gender").into_iter().flatten() {
        assert!(["Male", "Female", "Other"].contains(&g.as_str()), "gender {}", g);
    }
    for label in strings(&df, "income_groups").into_iter().flatten() {
        assert!(!label.ends_with("_typo"), "typo label {}", label);
        assert_eq!(label.trim(), label);
    }
}

#[test]
fn test_messy_dataset_summary() {
    let output = output_dir("summary").join("cleaned.csv");
    let result = Pipeline::builder()
        .build()
        .unwrap()
        .clean_file(fixture("messy_population.csv"), &output)
        .unwrap();
    let summary = &result.summary;

    assert_eq!(summary.rows_before, 15);
    assert_eq!(summary.duplicates_removed, 2);
    assert_eq!(summary.invalid_population_removed, 1);
    assert_eq!(summary.late_duplicates_removed, 0);
    assert_eq!(summary.rows_after, 12);
    assert_eq!(summary.rows_removed, 3);

    assert_eq!(summary.statistics.population_median, Some(1375.0));
    assert_eq!(summary.statistics.age_median, Some(45.0));
    assert_eq!(summary.statistics.income_mode.as_deref(), Some("low_income"));
    assert_eq!(summary.statistics.year_mode, Some(2020.0));
    assert_eq!(summary.statistics.population_cap, Some(3100.0));

    let income = summary.column("income_groups").unwrap();
    assert_eq!(income.typos_corrected, 5);
    assert_eq!(income.whitespace_stripped, 2);
    assert_eq!(summary.column("age").map(|c| c.values_capped), Some(2));
    assert_eq!(summary.total_nulls_imputed(), 6);
}

#[test]
fn test_fractional_ages_preserved() {
    let (_, df) = clean("messy_population.csv", "fractional_ages");
    let ages = numbers(&df, "age");

    assert!(ages.contains(&Some(61.5)));
    assert!(ages.contains(&Some(120.0)));
}

#[test]
fn test_extra_columns_pass_through() {
    let (_, df) = clean("extra_column.csv", "extra_column");

    assert_eq!(df.width(), 6);
    assert_eq!(
        strings(&df, "region"),
        vec![Some("north".to_string()), Some("south".to_string())]
    );
}

#[test]
fn test_cleaning_is_idempotent() {
    let dir = output_dir("idempotent");
    let first = dir.join("first.csv");
    let second = dir.join("second.csv");
    let pipeline = Pipeline::builder().build().unwrap();

    pipeline
        .clean_file(fixture("messy_population.csv"), &first)
        .unwrap();
    let rerun = pipeline.clean_file(&first, &second).unwrap();

    let once = load_csv(&first);
    let twice = load_csv(&second);
    assert!(once.equals_missing(&twice), "{}\n{}", once, twice);
    assert_eq!(rerun.summary.rows_removed, 0);
    assert_eq!(rerun.summary.total_nulls_imputed(), 0);
}

#[test]
fn test_capping_settles_when_late_duplicates_shrink_the_table() {
    // The two largest populations become identical once their ages are
    // clamped, so the table shrinks after the percentile was taken.
    let dir = output_dir("late_duplicate_outliers");
    let first = dir.join("first.csv");
    let second = dir.join("second.csv");
    let pipeline = Pipeline::builder().build().unwrap();

    let result = pipeline
        .clean_file(fixture("late_duplicate_outliers.csv"), &first)
        .unwrap();
    assert_eq!(result.summary.late_duplicates_removed, 1);
    assert_eq!(result.summary.statistics.population_cap, Some(3.0));

    let once = load_csv(&first);
    assert_eq!(ints(&once, "population"), vec![Some(1), Some(2), Some(3), Some(3)]);
    assert_eq!(ints(&once, "age"), vec![Some(10), Some(20), Some(30), Some(120)]);

    let rerun = pipeline.clean_file(&first, &second).unwrap();
    let twice = load_csv(&second);
    assert!(once.equals_missing(&twice), "{}\n{}", once, twice);
    assert_eq!(rerun.summary.rows_removed, 0);
    assert_eq!(rerun.summary.statistics.population_cap, Some(3.0));
}

// ============================================================================
// Progress and Reports
// ============================================================================

#[test]
fn test_progress_stages_reported() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let updates_clone = updates.clone();
    let output = output_dir("progress").join("cleaned.csv");

    Pipeline::builder()
        .on_progress(move |update| {
            updates_clone.lock().unwrap().push(update);
        })
        .build()
        .unwrap()
        .clean_file(fixture("messy_population.csv"), &output)
        .unwrap();

    let updates = updates.lock().unwrap();
    for stage in CleaningStage::ORDER {
        assert!(
            updates.iter().any(|u| u.stage == stage && u.stage_progress == 1.0),
            "stage {:?} never finished",
            stage
        );
    }

    let last = updates.last().unwrap();
    assert_eq!(last.stage, CleaningStage::Complete);
    assert_eq!(last.progress, 1.0);
    assert_eq!(last.rows, Some(12));
}

#[test]
fn test_run_report_written() {
    let dir = output_dir("report");
    let output = dir.join("cleaned.csv");
    let report_path = dir.join("reports").join("run.json");
    let config = CleaningConfig::default();

    let result = Pipeline::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .clean_file(fixture("scenario_duplicates.csv"), &output)
        .unwrap();
    let report = RunReport::new(fixture("scenario_duplicates.csv"), &output, &config, &result.summary);
    DatasetWriter::write_report(&report, &report_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["rows_after"], 2);
    assert_eq!(json["summary"]["duplicates_removed"], 1);
    assert_eq!(json["config"]["percentile_method"], "lower");
    assert_eq!(json["summary"]["actions"][0]["action_type"], "duplicates_removed");
    assert!(json["generated_at"].as_str().is_some());
}

#[test]
fn test_inspection_of_messy_dataset() {
    let df = DatasetLoader::load(fixture("messy_population.csv")).unwrap();
    let report = DataQualityAnalyzer::inspect(&df, &CleaningConfig::default()).unwrap();

    assert_eq!(report.rows, 15);
    assert_eq!(report.duplicate_rows, 2);
    assert_eq!(report.typo_labels, 5);
    assert_eq!(report.whitespace_labels, 2);
    assert_eq!(report.ages_above_max, 2);
    assert_eq!(report.fractional_ages, 1);
    assert_eq!(report.negative_populations, 1);
    assert!(report.populations_above_percentile >= 1);
    assert!(!report.issues.is_empty());
}
