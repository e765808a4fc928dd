//! Data quality inspection module.
//!
//! This module inspects a raw record set for the defects the pipeline
//! repairs (missing values, duplicates, label inconsistencies and
//! out-of-range values) without modifying it.

mod analyzer;

pub use analyzer::{
    ColumnInspection, DataQualityAnalyzer, InspectionReport, QualityIssue, Severity, ValueCount,
};
