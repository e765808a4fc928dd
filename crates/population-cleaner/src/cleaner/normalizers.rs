//! Categorical label normalization.

use crate::config::{CleaningConfig, UnknownGenderPolicy};
use crate::error::CleaningError;
use crate::schema::{GENDER, GENDER_LABELS, INCOME_GROUPS};
use crate::utils::{is_integral, text_cells};
use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Counts of what the normalizer changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Gender cells holding a numeric code that were mapped to a label.
    pub gender_codes_mapped: usize,
    /// Gender cells that matched neither a code nor a label.
    pub gender_unknown: usize,
    /// Income cells rewritten through the correction table.
    pub income_typos_corrected: usize,
    /// Income cells that had leading or trailing whitespace.
    pub income_whitespace_stripped: usize,
}

/// Maps gender codes to labels and repairs income group labels.
pub struct CategoricalNormalizer;

impl CategoricalNormalizer {
    /// Normalize both categorical columns.
    pub fn normalize(df: &mut DataFrame, config: &CleaningConfig) -> Result<NormalizationReport> {
        let (gender_codes_mapped, gender_unknown) = Self::normalize_gender(df, config.unknown_gender)?;
        let (income_typos_corrected, income_whitespace_stripped) =
            Self::normalize_income(df, &config.income_corrections)?;

        Ok(NormalizationReport {
            gender_codes_mapped,
            gender_unknown,
            income_typos_corrected,
            income_whitespace_stripped,
        })
    }

    /// Map gender codes {1, 2, 3} to "Male", "Female", "Other".
    ///
    /// Cells already holding a label (any case, surrounding whitespace
    /// ignored) are rewritten in canonical form. Anything else follows
    /// `policy`. Returns `(codes mapped, unknown values)`.
    pub fn normalize_gender(
        df: &mut DataFrame,
        policy: UnknownGenderPolicy,
    ) -> Result<(usize, usize)> {
        let series = df.column(GENDER)?.as_materialized_series().clone();
        let cells = text_cells(&series)?;

        let mut mapped = 0;
        let mut unknown: Vec<String> = Vec::new();
        let mut labels: Vec<Option<&'static str>> = Vec::with_capacity(cells.len());

        for cell in &cells {
            let Some(raw) = cell else {
                labels.push(None);
                continue;
            };

            if let Some(label) = gender_label_for_code(raw) {
                mapped += 1;
                labels.push(Some(label));
            } else if let Some(label) = canonical_gender_label(raw) {
                labels.push(Some(label));
            } else {
                match policy {
                    UnknownGenderPolicy::Reject => {
                        return Err(CleaningError::UnknownGenderCode { value: raw.clone() }.into());
                    }
                    UnknownGenderPolicy::MapToOther => {
                        unknown.push(raw.clone());
                        labels.push(Some(GENDER_LABELS[2]));
                    }
                }
            }
        }

        if !unknown.is_empty() {
            let sample: Vec<&str> = unknown.iter().take(5).map(String::as_str).collect();
            warn!(
                "Mapped {} unrecognised gender values to 'Other' (e.g. {:?})",
                unknown.len(),
                sample
            );
        }

        df.replace(GENDER, Series::new(GENDER.into(), labels))?;
        debug!("Mapped {} gender codes to labels", mapped);

        Ok((mapped, unknown.len()))
    }

    /// Rewrite known income label typos and strip surrounding whitespace.
    ///
    /// The correction table is looked up with the raw value first and then
    /// with the trimmed value, so `" low_income_typo "` becomes
    /// `"low_income"`. Returns `(typos corrected, values trimmed)`.
    pub fn normalize_income(
        df: &mut DataFrame,
        corrections: &BTreeMap<String, String>,
    ) -> Result<(usize, usize)> {
        let series = df.column(INCOME_GROUPS)?.as_materialized_series().clone();
        let cells = text_cells(&series)?;

        let mut corrected = 0;
        let mut stripped = 0;
        let mut values: Vec<Option<String>> = Vec::with_capacity(cells.len());

        for cell in cells {
            let Some(raw) = cell else {
                values.push(None);
                continue;
            };

            let trimmed = raw.trim();
            if trimmed.len() != raw.len() {
                stripped += 1;
            }

            let replacement = corrections
                .get(raw.as_str())
                .or_else(|| corrections.get(trimmed));
            match replacement {
                Some(fixed) => {
                    corrected += 1;
                    values.push(Some(fixed.trim().to_string()));
                }
                None => values.push(Some(trimmed.to_string())),
            }
        }

        df.replace(INCOME_GROUPS, Series::new(INCOME_GROUPS.into(), values))?;
        info!(
            "Income groups normalized: {} typos corrected, {} values trimmed",
            corrected, stripped
        );

        Ok((corrected, stripped))
    }
}

/// Label a gender cell resolves to, either through its code or because it
/// already holds a label.
pub(crate) fn resolve_gender_label(raw: &str) -> Option<&'static str> {
    gender_label_for_code(raw).or_else(|| canonical_gender_label(raw))
}

/// Label for a numeric gender code, if the cell holds one of 1, 2 or 3.
fn gender_label_for_code(raw: &str) -> Option<&'static str> {
    let code = raw.trim().parse::<f64>().ok()?;
    if !is_integral(code) || !(1.0..=3.0).contains(&code) {
        return None;
    }
    GENDER_LABELS.get(code as usize - 1).copied()
}

/// Canonical label for a cell that already holds one.
fn canonical_gender_label(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    GENDER_LABELS
        .iter()
        .find(|label| label.eq_ignore_ascii_case(trimmed))
        .copied()
}
