//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! Defaults reproduce the conventional cleaning rules for the population
//! dataset: 99th percentile population cap, age capped at 120, null gender
//! filled with code 3.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Interpolation used when a percentile falls between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantileMethod {
    /// Interpolate linearly between the two neighbouring observations
    Linear,
    /// Take the lower neighbouring observation
    #[default]
    Lower,
    /// Take the higher neighbouring observation
    Higher,
    /// Take the nearest observation (ties round to even index)
    Nearest,
    /// Average of the two neighbouring observations
    Midpoint,
}

/// What to do with gender values that are neither a known code nor a
/// canonical label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownGenderPolicy {
    /// Map the value to "Other" and log a warning
    #[default]
    MapToOther,
    /// Abort the run with an error
    Reject,
}

/// Default population percentile used for capping.
pub const DEFAULT_POPULATION_PERCENTILE: f64 = 0.99;
/// Default upper bound for ages.
pub const DEFAULT_MAX_AGE: f64 = 120.0;
/// Default lower bound for ages.
pub const DEFAULT_MIN_AGE: f64 = 0.0;
/// Default code used for missing gender values ("Other").
pub const DEFAULT_GENDER_FILL_CODE: i64 = 3;

/// Known income label typos and their canonical replacements.
pub fn default_income_corrections() -> BTreeMap<String, String> {
    [
        ("low_income_typo", "low_income"),
        ("lower_middle_income_typo", "lower_middle_income"),
        ("high_income_typo", "high_income"),
        ("upper_middle_income_typo", "upper_middle_income"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use population_cleaner::config::{CleaningConfig, QuantileMethod};
///
/// let config = CleaningConfig::builder()
///     .population_percentile(0.95)
///     .percentile_method(QuantileMethod::Linear)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Percentile (0.0 - 1.0] of the population distribution used as the cap.
    /// Default: 0.99
    pub population_percentile: f64,

    /// Interpolation used to compute the population cap.
    /// Default: Lower
    pub percentile_method: QuantileMethod,

    /// Ages above this value are clamped down to it.
    /// Default: 120
    pub max_age: f64,

    /// Ages below this value are clamped up to it.
    /// Default: 0
    pub min_age: f64,

    /// Gender code written into missing gender cells before mapping.
    /// Default: 3 ("Other")
    pub gender_fill_code: i64,

    /// Handling for gender values outside the known codes.
    /// Default: MapToOther
    pub unknown_gender: UnknownGenderPolicy,

    /// Exact-match income label corrections.
    pub income_corrections: BTreeMap<String, String>,

    /// Run the deduplicator again after all transformations.
    /// Default: true
    pub final_deduplication: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            population_percentile: DEFAULT_POPULATION_PERCENTILE,
            percentile_method: QuantileMethod::default(),
            max_age: DEFAULT_MAX_AGE,
            min_age: DEFAULT_MIN_AGE,
            gender_fill_code: DEFAULT_GENDER_FILL_CODE,
            unknown_gender: UnknownGenderPolicy::default(),
            income_corrections: default_income_corrections(),
            final_deduplication: true,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Load a configuration from a JSON file.
    ///
    /// Fields missing from the file take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigValidationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigValidationError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: CleaningConfig =
            serde_json::from_str(&content).map_err(|e| ConfigValidationError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Turn this configuration back into a builder so individual fields can
    /// be overridden (used by the CLI to layer flags over a config file).
    pub fn to_builder(&self) -> CleaningConfigBuilder {
        CleaningConfigBuilder {
            population_percentile: Some(self.population_percentile),
            percentile_method: Some(self.percentile_method),
            max_age: Some(self.max_age),
            min_age: Some(self.min_age),
            gender_fill_code: Some(self.gender_fill_code),
            unknown_gender: Some(self.unknown_gender),
            income_corrections: Some(self.income_corrections.clone()),
            final_deduplication: Some(self.final_deduplication),
        }
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.population_percentile > 0.0 && self.population_percentile <= 1.0) {
            return Err(ConfigValidationError::InvalidPercentile(
                self.population_percentile,
            ));
        }

        if !self.max_age.is_finite() || !self.min_age.is_finite() || self.min_age > self.max_age
        {
            return Err(ConfigValidationError::InvalidAgeRange {
                min: self.min_age,
                max: self.max_age,
            });
        }

        if !(1..=3).contains(&self.gender_fill_code) {
            return Err(ConfigValidationError::InvalidGenderCode(
                self.gender_fill_code,
            ));
        }

        if let Some((from, _)) = self
            .income_corrections
            .iter()
            .find(|(from, to)| from.trim().is_empty() || to.trim().is_empty())
        {
            return Err(ConfigValidationError::InvalidCorrection(from.clone()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid population percentile: {0} (must be in (0.0, 1.0])")]
    InvalidPercentile(f64),

    #[error("Invalid age range: min {min} must not exceed max {max}")]
    InvalidAgeRange { min: f64, max: f64 },

    #[error("Invalid gender fill code: {0} (must be 1, 2 or 3)")]
    InvalidGenderCode(i64),

    #[error("Invalid income correction for '{0}': labels must not be blank")]
    InvalidCorrection(String),

    #[error("Could not read configuration file '{path}': {reason}")]
    Unreadable { path: String, reason: String },
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    population_percentile: Option<f64>,
    percentile_method: Option<QuantileMethod>,
    max_age: Option<f64>,
    min_age: Option<f64>,
    gender_fill_code: Option<i64>,
    unknown_gender: Option<UnknownGenderPolicy>,
    income_corrections: Option<BTreeMap<String, String>>,
    final_deduplication: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Set the population percentile used as the cap.
    ///
    /// # Arguments
    /// * `percentile` - Value in (0.0, 1.0] (e.g., 0.99 = 99th percentile)
    pub fn population_percentile(mut self, percentile: f64) -> Self {
        self.population_percentile = Some(percentile);
        self
    }

    /// Set the interpolation used for the population cap.
    pub fn percentile_method(mut self, method: QuantileMethod) -> Self {
        self.percentile_method = Some(method);
        self
    }

    /// Set the maximum allowed age.
    pub fn max_age(mut self, max_age: f64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set the minimum allowed age.
    pub fn min_age(mut self, min_age: f64) -> Self {
        self.min_age = Some(min_age);
        self
    }

    /// Set the code written into missing gender cells.
    pub fn gender_fill_code(mut self, code: i64) -> Self {
        self.gender_fill_code = Some(code);
        self
    }

    /// Set the policy for unknown gender values.
    pub fn unknown_gender(mut self, policy: UnknownGenderPolicy) -> Self {
        self.unknown_gender = Some(policy);
        self
    }

    /// Replace the income label correction table.
    pub fn income_corrections(mut self, corrections: BTreeMap<String, String>) -> Self {
        self.income_corrections = Some(corrections);
        self
    }

    /// Add a single income label correction on top of the current table.
    pub fn income_correction(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.income_corrections
            .get_or_insert_with(default_income_corrections)
            .insert(from.into(), to.into());
        self
    }

    /// Enable or disable the final deduplication pass.
    pub fn final_deduplication(mut self, enable: bool) -> Self {
        self.final_deduplication = Some(enable);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            population_percentile: self
                .population_percentile
                .unwrap_or(DEFAULT_POPULATION_PERCENTILE),
            percentile_method: self.percentile_method.unwrap_or_default(),
            max_age: self.max_age.unwrap_or(DEFAULT_MAX_AGE),
            min_age: self.min_age.unwrap_or(DEFAULT_MIN_AGE),
            gender_fill_code: self.gender_fill_code.unwrap_or(DEFAULT_GENDER_FILL_CODE),
            unknown_gender: self.unknown_gender.unwrap_or_default(),
            income_corrections: self
                .income_corrections
                .unwrap_or_else(default_income_corrections),
            final_deduplication: self.final_deduplication.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.population_percentile, 0.99);
        assert_eq!(config.percentile_method, QuantileMethod::Lower);
        assert_eq!(config.max_age, 120.0);
        assert_eq!(config.min_age, 0.0);
        assert_eq!(config.gender_fill_code, 3);
        assert_eq!(config.unknown_gender, UnknownGenderPolicy::MapToOther);
        assert_eq!(config.income_corrections.len(), 4);
        assert!(config.final_deduplication);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = CleaningConfig::builder().build().unwrap();
        assert_eq!(config, CleaningConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .population_percentile(0.95)
            .percentile_method(QuantileMethod::Linear)
            .max_age(110.0)
            .unknown_gender(UnknownGenderPolicy::Reject)
            .final_deduplication(false)
            .build()
            .unwrap();

        assert_eq!(config.population_percentile, 0.95);
        assert_eq!(config.percentile_method, QuantileMethod::Linear);
        assert_eq!(config.max_age, 110.0);
        assert_eq!(config.unknown_gender, UnknownGenderPolicy::Reject);
        assert!(!config.final_deduplication);
    }

    #[test]
    fn test_income_correction_extends_defaults() {
        let config = CleaningConfig::builder()
            .income_correction("hi_income", "high_income")
            .build()
            .unwrap();
        assert_eq!(config.income_corrections.len(), 5);
        assert_eq!(
            config.income_corrections.get("hi_income").map(String::as_str),
            Some("high_income")
        );
    }

    #[test]
    fn test_validation_invalid_percentile() {
        assert!(matches!(
            CleaningConfig::builder().population_percentile(0.0).build(),
            Err(ConfigValidationError::InvalidPercentile(_))
        ));
        assert!(matches!(
            CleaningConfig::builder().population_percentile(1.5).build(),
            Err(ConfigValidationError::InvalidPercentile(_))
        ));
        assert!(matches!(
            CleaningConfig::builder().population_percentile(f64::NAN).build(),
            Err(ConfigValidationError::InvalidPercentile(_))
        ));
    }

    #[test]
    fn test_validation_invalid_age_range() {
        let result = CleaningConfig::builder().min_age(50.0).max_age(10.0).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidAgeRange { .. })
        ));
    }

    #[test]
    fn test_validation_invalid_gender_code() {
        let result = CleaningConfig::builder().gender_fill_code(4).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidGenderCode(4))
        ));
    }

    #[test]
    fn test_validation_blank_correction() {
        let result = CleaningConfig::builder()
            .income_correction("  ", "low_income")
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidCorrection(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = CleaningConfig::builder()
            .percentile_method(QuantileMethod::Midpoint)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"percentile_method\":\"midpoint\""));
        assert!(json.contains("\"unknown_gender\":\"map_to_other\""));

        let parsed: CleaningConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: CleaningConfig = serde_json::from_str(r#"{"max_age": 100.0}"#).unwrap();
        assert_eq!(parsed.max_age, 100.0);
        assert_eq!(parsed.population_percentile, 0.99);
        assert_eq!(parsed.income_corrections, default_income_corrections());
    }

    #[test]
    fn test_to_builder_round_trip() {
        let config = CleaningConfig::builder().max_age(99.0).build().unwrap();
        let rebuilt = config.to_builder().min_age(1.0).build().unwrap();
        assert_eq!(rebuilt.max_age, 99.0);
        assert_eq!(rebuilt.min_age, 1.0);
    }
}
