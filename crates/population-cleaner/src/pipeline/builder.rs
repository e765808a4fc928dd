//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the population cleaning workflow.

use crate::cleaner::{
    AgeRepresentation, CategoricalNormalizer, Deduplicator, RangeValidator, TypeCoercer,
};
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{Result, ResultExt};
use crate::imputers::MissingValueImputer;
use crate::loader::DatasetLoader;
use crate::pipeline::outliers::OutlierCapper;
use crate::pipeline::progress::{
    CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::profiler::DataProfiler;
use crate::reporting::DatasetWriter;
use crate::schema::{AGE, GENDER, INCOME_GROUPS, POPULATION, TRACKED_COLUMNS, YEAR};
use crate::types::{ActionType, CleaningAction, CleaningResult, CleaningSummary};
use crate::utils::format_number;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The population cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use population_cleaner::{CleaningConfig, Pipeline};
///
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().max_age(110.0).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// println!("{} rows left", result.summary.rows_after);
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Pipeline can be moved to a worker thread.
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a record set.
    ///
    /// Stages run in a fixed order; the first failing stage aborts the run.
    pub fn process(&self, df: DataFrame) -> Result<CleaningResult> {
        match self.process_internal(df) {
            Ok(result) => {
                self.report_progress(
                    ProgressUpdate::complete("Cleaning completed successfully")
                        .with_rows(result.data.height()),
                );
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("An error occurred during the cleaning process: {}", e);
                Err(e)
            }
        }
    }

    /// Load `input`, clean it and write the result to `output`.
    ///
    /// Nothing is written unless every stage succeeded.
    pub fn clean_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<CleaningResult> {
        let df = DatasetLoader::load(input)?;
        let mut result = self.process(df)?;
        DatasetWriter::write_csv(&mut result.data, output)
            .inspect_err(|e| error!("Failed to save the cleaned dataset: {}", e))?;
        Ok(result)
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage_started(&self, stage: CleaningStage, message: &str, rows: usize) {
        self.report_progress(ProgressUpdate::new(stage, 0.0, message).with_rows(rows));
    }

    fn stage_finished(&self, stage: CleaningStage, message: impl Into<String>, rows: usize) {
        self.report_progress(ProgressUpdate::new(stage, 1.0, message).with_rows(rows));
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline...");

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();

        // Step 1: Diagnostics of the raw data
        let stage = CleaningStage::Profiling;
        self.stage_started(stage, "Profiling dataset...", df.height());
        info!("Step 1: Profiling dataset...");

        summary.diagnostics_before =
            DataProfiler::profile("Diagnostics before cleaning", &df).context(stage.display_name())?;

        self.stage_finished(stage, "Profiling complete", df.height());

        // Step 2: Exact duplicates
        let stage = CleaningStage::Deduplication;
        self.stage_started(stage, "Removing duplicate rows...", df.height());
        info!("Step 2: Removing duplicate rows...");

        let (mut df, duplicates) =
            Deduplicator::remove_duplicates(df).context(stage.display_name())?;
        summary.duplicates_removed = duplicates;
        if duplicates > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate rows", duplicates),
            ));
        }

        self.stage_finished(
            stage,
            format!("Removed {} duplicate rows", duplicates),
            df.height(),
        );

        // Step 3: Missing values
        let stage = CleaningStage::Imputation;
        self.stage_started(stage, "Filling missing values...", df.height());
        info!("Step 3: Filling missing values...");

        let imputation =
            MissingValueImputer::impute(&mut df, &self.config).context(stage.display_name())?;
        summary.statistics = imputation.statistics.clone();
        for (column, filled) in &imputation.filled {
            summary.column_mut(column).nulls_imputed = *filled;
            if *filled > 0 {
                let details = self.fill_description(column, &summary);
                summary.add_action(
                    CleaningAction::new(
                        ActionType::ValuesImputed,
                        column.as_str(),
                        format!("Filled {} missing values", filled),
                    )
                    .with_details(details),
                );
            }
        }

        self.stage_finished(
            stage,
            format!("Filled {} missing values", imputation.total_filled()),
            df.height(),
        );

        // Step 4: Categorical labels
        let stage = CleaningStage::Normalization;
        self.stage_started(stage, "Normalizing categorical labels...", df.height());
        info!("Step 4: Normalizing categorical labels...");

        let normalization =
            CategoricalNormalizer::normalize(&mut df, &self.config).context(stage.display_name())?;
        summary.column_mut(GENDER).unknown_values = normalization.gender_unknown;
        summary.column_mut(INCOME_GROUPS).typos_corrected = normalization.income_typos_corrected;
        summary.column_mut(INCOME_GROUPS).whitespace_stripped =
            normalization.income_whitespace_stripped;

        summary.add_action(CleaningAction::new(
            ActionType::LabelsMapped,
            GENDER,
            format!("Mapped {} gender codes to labels", normalization.gender_codes_mapped),
        ));
        if normalization.gender_unknown > 0 {
            summary.add_warning(format!(
                "{} unrecognised gender values mapped to 'Other'",
                normalization.gender_unknown
            ));
        }
        if normalization.income_typos_corrected > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::TyposCorrected,
                INCOME_GROUPS,
                format!(
                    "Corrected {} income group typos",
                    normalization.income_typos_corrected
                ),
            ));
        }
        if normalization.income_whitespace_stripped > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::WhitespaceStripped,
                INCOME_GROUPS,
                format!(
                    "Stripped whitespace from {} income group labels",
                    normalization.income_whitespace_stripped
                ),
            ));
        }

        self.stage_finished(stage, "Labels normalized", df.height());

        // Steps 5-8: Bounds, output types, ranges, late duplicates
        let (df, bounds) = self.apply_bounds(df)?;

        summary.statistics.population_cap = bounds.population_cap;
        summary.column_mut(POPULATION).values_capped = bounds.population_capped;
        summary.column_mut(AGE).values_capped = bounds.ages_raised + bounds.ages_lowered;
        summary.invalid_population_removed = bounds.invalid_rows;
        summary.late_duplicates_removed = bounds.late_duplicates;

        if let Some(cap) = bounds.population_cap {
            summary.add_action(
                CleaningAction::new(
                    ActionType::OutliersCapped,
                    POPULATION,
                    format!("Capped {} population values", bounds.population_capped),
                )
                .with_details(format!(
                    "{:?} percentile {} = {}",
                    self.config.percentile_method,
                    self.config.population_percentile,
                    format_number(cap)
                )),
            );
        }
        summary.add_action(
            CleaningAction::new(
                ActionType::OutliersCapped,
                AGE,
                format!("Capped {} age values", bounds.ages_raised + bounds.ages_lowered),
            )
            .with_details(format!(
                "{} above {}, {} below {}",
                bounds.ages_lowered,
                format_number(self.config.max_age),
                bounds.ages_raised,
                format_number(self.config.min_age)
            )),
        );

        summary.add_action(
            CleaningAction::new(
                ActionType::TypeCoerced,
                POPULATION,
                "Cast population to integers",
            )
            .with_details(format!(
                "{} fractional values truncated",
                bounds.truncated_population
            )),
        );
        summary.add_action(
            CleaningAction::new(ActionType::TypeCoerced, YEAR, "Cast year to integers")
                .with_details(format!("{} fractional values truncated", bounds.truncated_year)),
        );
        let age_description = match bounds.age_repr {
            AgeRepresentation::Integer => "Stored ages as integers",
            AgeRepresentation::Mixed => "Kept fractional ages; integral ages written without decimals",
        };
        summary.add_action(CleaningAction::new(
            ActionType::TypeCoerced,
            AGE,
            age_description,
        ));

        if bounds.invalid_rows > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::InvalidRowsRemoved,
                POPULATION,
                format!(
                    "Removed {} rows with a negative population",
                    bounds.invalid_rows
                ),
            ));
        }
        if bounds.late_duplicates > 0 {
            summary.add_action(
                CleaningAction::new(
                    ActionType::DuplicatesRemoved,
                    "dataset",
                    format!(
                        "Removed {} rows made identical by cleaning",
                        bounds.late_duplicates
                    ),
                )
                .with_details("final deduplication pass"),
            );
        }
        if bounds.passes > 1 {
            summary.add_warning(format!(
                "Rows removed after capping; bounds applied {} times until stable",
                bounds.passes
            ));
        }

        summary.diagnostics_after = DataProfiler::profile("Diagnostics after cleaning", &df)
            .context(CleaningStage::Complete.display_name())?;
        for column in TRACKED_COLUMNS {
            let dtype = df.column(column)?.dtype().to_string();
            summary.column_mut(column).final_dtype = Some(dtype);
        }

        summary.rows_after = df.height();
        summary.rows_removed = summary.rows_before.saturating_sub(summary.rows_after);
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Cleaning finished: {} -> {} rows ({:.1}% removed) in {}ms",
            summary.rows_before,
            summary.rows_after,
            summary.rows_removed_percentage(),
            summary.duration_ms
        );

        Ok(CleaningResult { data: df, summary })
    }

    /// Apply steps 5 to 8 until a pass removes no row.
    ///
    /// Rows dropped after capping move the population percentile. The
    /// returned table is capped at its own percentile. Each repeated pass
    /// removes at least one row.
    fn apply_bounds(&self, df: DataFrame) -> Result<(DataFrame, BoundsOutcome)> {
        let (mut df, mut total) = self.bounds_pass(df, true)?;
        let mut removed = total.rows_removed();

        while removed > 0 {
            debug!(
                "{} rows removed after capping, applying bounds again (pass {})",
                removed,
                total.passes + 1
            );
            let (next, outcome) = self.bounds_pass(df, false)?;
            df = next;
            removed = outcome.rows_removed();
            total.absorb(outcome);
        }

        Ok((df, total))
    }

    /// One pass of capping, coercion, validation and final deduplication.
    ///
    /// Progress is only reported on the first pass.
    fn bounds_pass(&self, mut df: DataFrame, report: bool) -> Result<(DataFrame, BoundsOutcome)> {
        // Step 5: Outliers
        let stage = CleaningStage::OutlierCapping;
        if report {
            self.stage_started(stage, "Capping outliers...", df.height());
            info!("Step 5: Capping outliers...");
        }

        let (population_cap, age_cap) =
            OutlierCapper::cap(&mut df, &self.config).context(stage.display_name())?;

        if report {
            self.stage_finished(
                stage,
                format!(
                    "Capped {} values",
                    population_cap.total() + age_cap.total()
                ),
                df.height(),
            );
        }

        // Step 6: Output types
        let stage = CleaningStage::TypeCoercion;
        if report {
            self.stage_started(stage, "Coercing column types...", df.height());
            info!("Step 6: Coercing column types...");
        }

        let truncated_population =
            TypeCoercer::coerce_population(&mut df).context(stage.display_name())?;
        let truncated_year = TypeCoercer::coerce_year(&mut df).context(stage.display_name())?;
        let age_repr = TypeCoercer::coerce_age(&mut df).context(stage.display_name())?;

        if report {
            self.stage_finished(stage, "Types coerced", df.height());
        }

        // Step 7: Ranges
        let stage = CleaningStage::Validation;
        if report {
            self.stage_started(stage, "Validating population range...", df.height());
            info!("Step 7: Validating population range...");
        }

        let (mut df, invalid_rows) =
            RangeValidator::drop_invalid_population(df).context(stage.display_name())?;

        if report {
            self.stage_finished(
                stage,
                format!("Removed {} invalid rows", invalid_rows),
                df.height(),
            );
        }

        // Step 8: Rows made identical by the previous stages
        let stage = CleaningStage::FinalDeduplication;
        let mut late_duplicates = 0;
        if self.config.final_deduplication {
            if report {
                self.stage_started(
                    stage,
                    "Removing rows made identical by cleaning...",
                    df.height(),
                );
                info!("Step 8: Final deduplication...");
            }

            let (deduplicated, late) =
                Deduplicator::remove_duplicates(df).context(stage.display_name())?;
            df = deduplicated;
            late_duplicates = late;

            if report {
                self.stage_finished(stage, format!("Removed {} late duplicates", late), df.height());
            }
        } else if report {
            debug!("Step 8: Final deduplication disabled");
        }

        Ok((
            df,
            BoundsOutcome {
                passes: 1,
                population_cap: population_cap.upper,
                population_capped: population_cap.total(),
                ages_raised: age_cap.raised,
                ages_lowered: age_cap.lowered,
                truncated_population,
                truncated_year,
                age_repr,
                invalid_rows,
                late_duplicates,
            },
        ))
    }

    fn fill_description(&self, column: &str, summary: &CleaningSummary) -> String {
        let stats = &summary.statistics;
        match column {
            POPULATION => stats
                .population_median
                .map(|v| format!("median {}", format_number(v))),
            AGE => stats.age_median.map(|v| format!("median {}", format_number(v))),
            GENDER => Some(format!("code {}", self.config.gender_fill_code)),
            INCOME_GROUPS => stats.income_mode.as_ref().map(|v| format!("mode '{}'", v)),
            YEAR => stats.year_mode.map(|v| format!("mode {}", format_number(v))),
            _ => None,
        }
        .unwrap_or_default()
    }
}

/// Counts from the bounds passes, summed over every pass.
#[derive(Debug)]
struct BoundsOutcome {
    passes: usize,
    /// Cap computed by the last pass, the one the output satisfies.
    population_cap: Option<f64>,
    population_capped: usize,
    ages_raised: usize,
    ages_lowered: usize,
    truncated_population: usize,
    truncated_year: usize,
    age_repr: AgeRepresentation,
    invalid_rows: usize,
    late_duplicates: usize,
}

impl BoundsOutcome {
    fn rows_removed(&self) -> usize {
        self.invalid_rows + self.late_duplicates
    }

    fn absorb(&mut self, pass: BoundsOutcome) {
        self.passes += pass.passes;
        self.population_cap = pass.population_cap;
        self.population_capped += pass.population_capped;
        self.ages_raised += pass.ages_raised;
        self.ages_lowered += pass.ages_lowered;
        self.truncated_population += pass.truncated_population;
        self.truncated_year += pass.truncated_year;
        self.age_repr = pass.age_repr;
        self.invalid_rows += pass.invalid_rows;
        self.late_duplicates += pass.late_duplicates;
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
