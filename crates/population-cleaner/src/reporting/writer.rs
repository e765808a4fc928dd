//! Writing the cleaned dataset and the JSON run report.

use crate::config::CleaningConfig;
use crate::types::CleaningSummary;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;

/// Report of one cleaning run, written as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub input_file: String,
    pub output_file: String,
    pub config: CleaningConfig,
    pub summary: CleaningSummary,
}

impl RunReport {
    /// Build a report stamped with the current local time.
    pub fn new(
        input_file: impl AsRef<Path>,
        output_file: impl AsRef<Path>,
        config: &CleaningConfig,
        summary: &CleaningSummary,
    ) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.as_ref().display().to_string(),
            output_file: output_file.as_ref().display().to_string(),
            config: config.clone(),
            summary: summary.clone(),
        }
    }
}

/// Writes cleaned data and reports to disk.
pub struct DatasetWriter;

impl DatasetWriter {
    /// Write `df` as comma-separated values with a header and no index column.
    ///
    /// The data goes to a temporary file next to `path` which is renamed
    /// into place once complete, so a failed write never leaves a partial
    /// output behind.
    pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path_for(path);
        let written = File::create(&tmp_path)
            .map_err(Into::into)
            .and_then(|mut file| {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .with_separator(b',')
                    .with_quote_char(b'"')
                    .finish(df)
                    .map_err(crate::error::CleaningError::from)
            });

        let moved = written.and_then(|_| fs::rename(&tmp_path, path).map_err(Into::into));
        if let Err(e) = moved {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!("Wrote {} rows to {}", df.height(), path.display());
        info!("Cleaned dataset saved successfully to {}", path.display());

        Ok(path.to_path_buf())
    }

    /// Write a run report as pretty JSON.
    pub fn write_report(report: &RunReport, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;
        info!("Report saved: {}", path.display());

        Ok(path.to_path_buf())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.csv".to_string());
    path.with_file_name(format!(".{}.partial", file_name))
}
