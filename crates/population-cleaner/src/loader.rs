//! Loading the raw dataset from a delimited file.

use crate::error::{CleaningError, Result};
use crate::schema::require_columns;
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Reads the raw record set and checks it carries the tracked columns.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a CSV file with a header row.
    ///
    /// The whole file is scanned for schema inference so a column whose
    /// first rows are integers and later rows fractional still loads as a
    /// float column.
    ///
    /// # Errors
    ///
    /// - [`CleaningError::InputNotFound`] if `path` does not exist
    /// - [`CleaningError::LoadFailed`] if the content cannot be parsed
    /// - [`CleaningError::ColumnNotFound`] if a tracked column is missing
    pub fn load(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();

        if !path.is_file() {
            let err = CleaningError::InputNotFound(path.to_path_buf());
            error!("Error: {}.", err);
            return Err(err);
        }

        debug!("Reading {}", path.display());
        let df = Self::read_csv(path).map_err(|e| {
            let err = CleaningError::LoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
            error!("An error occurred while loading the file: {}", err);
            err
        })?;

        if let Err(err) = require_columns(&df) {
            error!("An error occurred while loading the file: {}", err);
            return Err(err);
        }

        info!("Dataset loaded successfully. Shape: {:?}", df.shape());
        Ok(df)
    }

    fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_csv(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "population-cleaner-loader-{}-{}",
            name,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("input.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_missing_file() {
        let result = DatasetLoader::load("/definitely/not/here.csv");
        match result {
            Err(CleaningError::InputNotFound(path)) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.csv"))
            }
            other => panic!("expected InputNotFound, got {:?}", other.map(|df| df.shape())),
        }
    }

    #[test]
    fn test_load_valid_file() {
        let path = temp_csv(
            "valid",
            "population,age,gender,income_groups,year\n\
             100,30,1,low_income,2020\n\
             ,45.5,,high_income,\n",
        );
        let df = DatasetLoader::load(&path).unwrap();
        assert_eq!(df.shape(), (2, 5));
        assert_eq!(df.column("population").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_missing_column() {
        let path = temp_csv("nocol", "population,age,gender,year\n1,2,1,2020\n");
        let err = DatasetLoader::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_load_error());
    }
}
