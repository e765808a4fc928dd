//! CLI entry point for the population cleaning pipeline.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use population_cleaner::{
    CleaningConfig, CleaningResult, DataQualityAnalyzer, DatasetLoader, DatasetWriter,
    InspectionReport, Pipeline, QuantileMethod, RunReport, UnknownGenderPolicy,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

/// CLI-compatible percentile interpolation enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliQuantileMethod {
    /// Interpolate between the two closest values
    Linear,
    /// Take the lower of the two closest values
    Lower,
    /// Take the higher of the two closest values
    Higher,
    /// Take the closest value
    Nearest,
    /// Average the two closest values
    Midpoint,
}

impl From<CliQuantileMethod> for QuantileMethod {
    fn from(cli: CliQuantileMethod) -> Self {
        match cli {
            CliQuantileMethod::Linear => QuantileMethod::Linear,
            CliQuantileMethod::Lower => QuantileMethod::Lower,
            CliQuantileMethod::Higher => QuantileMethod::Higher,
            CliQuantileMethod::Nearest => QuantileMethod::Nearest,
            CliQuantileMethod::Midpoint => QuantileMethod::Midpoint,
        }
    }
}

/// CLI-compatible policy for gender values outside the known codes
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliUnknownGender {
    /// Map the value to "Other" and log a warning
    MapToOther,
    /// Abort the run
    Reject,
}

impl From<CliUnknownGender> for UnknownGenderPolicy {
    fn from(cli: CliUnknownGender) -> Self {
        match cli {
            CliUnknownGender::MapToOther => UnknownGenderPolicy::MapToOther,
            CliUnknownGender::Reject => UnknownGenderPolicy::Reject,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Population dataset cleaning pipeline",
    long_about = "Cleans a population-statistics CSV: removes duplicates, fills missing \
                  values, normalizes gender and income labels, caps outliers and drops \
                  rows with an invalid population.\n\n\
                  EXAMPLES:\n  \
                  # Clean with the default file names\n  \
                  population-cleaner\n\n  \
                  # Explicit input and output\n  \
                  population-cleaner -i raw.csv -o clean.csv\n\n  \
                  # Inspect the raw data without cleaning\n  \
                  population-cleaner -i raw.csv --inspect\n\n  \
                  # Machine-readable run report\n  \
                  population-cleaner -i raw.csv --json | jq .summary.rows_after"
)]
struct Args {
    /// Path to the raw CSV file
    #[arg(short, long, default_value = "messy_population_data.csv")]
    input: PathBuf,

    /// Path of the cleaned CSV file
    #[arg(short, long, default_value = "cleaned_population_data.csv")]
    output: PathBuf,

    /// JSON configuration file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Population percentile used as the upper cap (0.0 - 1.0]
    #[arg(long)]
    percentile: Option<f64>,

    /// How the percentile is picked between two observations
    #[arg(long, value_enum)]
    percentile_method: Option<CliQuantileMethod>,

    /// Ages above this value are capped
    #[arg(long)]
    max_age: Option<f64>,

    /// What to do with gender values that are neither 1, 2, 3 nor a label
    #[arg(long, value_enum)]
    unknown_gender: Option<CliUnknownGender>,

    /// Skip the deduplication pass after the other stages
    #[arg(long)]
    no_final_dedup: bool,

    /// Inspect the raw data for quality issues without cleaning it
    #[arg(long)]
    inspect: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the JSON report is written to stdout.
    #[arg(long)]
    json: bool,

    /// Write the JSON run report to this file
    #[arg(long)]
    emit_report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No subscriber is installed under --json.
            if args.json {
                eprintln!("Error: {:#}", e);
            } else {
                error!("Cleaning failed: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;

    if args.inspect {
        return run_inspection(args, &config);
    }

    let pipeline = build_pipeline(args, config)?;
    run_pipeline(&pipeline, args)
}

/// Merge the optional config file with the command line flags.
fn build_config(args: &Args) -> Result<CleaningConfig> {
    let base = match &args.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            CleaningConfig::from_json_file(path)?
        }
        None => CleaningConfig::default(),
    };

    let mut builder = base.to_builder();
    if let Some(percentile) = args.percentile {
        builder = builder.population_percentile(percentile);
    }
    if let Some(method) = args.percentile_method {
        builder = builder.percentile_method(method.into());
    }
    if let Some(max_age) = args.max_age {
        builder = builder.max_age(max_age);
    }
    if let Some(policy) = args.unknown_gender {
        builder = builder.unknown_gender(policy.into());
    }
    if args.no_final_dedup {
        builder = builder.final_deduplication(false);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            debug!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

fn run_pipeline(pipeline: &Pipeline, args: &Args) -> Result<()> {
    info!("Cleaning {} -> {}", args.input.display(), args.output.display());

    let result = pipeline.clean_file(&args.input, &args.output)?;

    handle_pipeline_output(&result, pipeline.config(), args)
}

/// Handle pipeline output based on CLI flags.
///
/// - Default: print a human-readable summary to stdout
/// - `--json`: print the run report as JSON to stdout only
/// - `--emit-report`: also write the run report to a file
fn handle_pipeline_output(
    result: &CleaningResult,
    config: &CleaningConfig,
    args: &Args,
) -> Result<()> {
    let report = RunReport::new(&args.input, &args.output, config, &result.summary);

    if let Some(path) = &args.emit_report {
        DatasetWriter::write_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !args.quiet {
        print_human_readable_summary(&report);
    }

    Ok(())
}

/// Print a human-readable summary of a cleaning run.
///
/// Uses `println!` for user-facing output so it shows regardless of the
/// log level.
fn print_human_readable_summary(report: &RunReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows)", report.input_file, summary.rows_before);
    println!("Output: {} ({} rows)", report.output_file, summary.rows_after);
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.1}%)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed,
        summary.rows_removed_percentage()
    );
    println!(
        "  Duplicates: {} removed ({} more after cleaning)",
        summary.duplicates_removed, summary.late_duplicates_removed
    );
    println!(
        "  Invalid populations: {} rows removed",
        summary.invalid_population_removed
    );
    println!("  Missing values filled: {}", summary.total_nulls_imputed());
    if let Some(cap) = summary.statistics.population_cap {
        println!("  Population cap: {}", cap);
    }
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in &summary.actions {
            match &action.details {
                Some(details) => println!(
                    "  - [{}] {}: {} ({})",
                    action.action_type.display_name(),
                    action.target,
                    action.description,
                    details
                ),
                None => println!(
                    "  - [{}] {}: {}",
                    action.action_type.display_name(),
                    action.target,
                    action.description
                ),
            }
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report <PATH> to save the JSON run report");
}

/// Inspect the raw data and print what the pipeline would repair.
fn run_inspection(args: &Args, config: &CleaningConfig) -> Result<()> {
    let df = DatasetLoader::load(&args.input)?;
    let report = DataQualityAnalyzer::inspect(&df, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_inspection(args, &report);
    }

    Ok(())
}

fn print_inspection(args: &Args, report: &InspectionReport) {
    println!("\n{}", "=".repeat(80));
    println!("INSPECTION - {}", args.input.display());
    println!("{}\n", "=".repeat(80));

    println!("COLUMNS ({} rows)", report.rows);
    println!("{}", "-".repeat(40));
    println!(
        "  {:<16} {:<10} {:>10} {:>10}",
        "Column", "Type", "Nulls", "Distinct"
    );
    for col in &report.columns {
        println!(
            "  {:<16} {:<10} {:>10} {:>10}",
            col.column, col.dtype, col.null_count, col.distinct_count
        );
    }
    println!();

    println!("VALUE COUNTS");
    println!("{}", "-".repeat(40));
    println!("  gender:");
    for vc in &report.gender_counts {
        println!("    {:?}: {}", vc.value, vc.count);
    }
    println!("  income_groups:");
    for vc in &report.income_counts {
        println!("    {:?}: {}", vc.value, vc.count);
    }
    println!();

    println!("DATA QUALITY ISSUES");
    println!("{}", "-".repeat(40));
    if report.issues.is_empty() {
        println!("  No data quality issues detected");
    } else {
        for issue in &report.issues {
            println!(
                "  - [{:?}] {}: {}",
                issue.severity, issue.column, issue.description
            );
        }
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To clean this dataset, run without --inspect");
    println!("{}", "=".repeat(80));
}
