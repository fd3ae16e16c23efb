//! Raw input tables.
//!
//! The three source extracts are read once from CSV and handed to the
//! builder as plain DataFrames. Nothing here interprets column contents.

use crate::error::{DataError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Locations of the raw CSV extracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPaths {
    /// Claims extract.
    pub claims: PathBuf,
    /// Policyholder extract.
    pub policyholder: PathBuf,
    /// Third-party extract.
    pub third_party: PathBuf,
}

impl Default for RawPaths {
    fn default() -> Self {
        Self::in_dir("data/raw")
    }
}

impl RawPaths {
    /// Standard file names inside a directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            claims: dir.join("claims.csv"),
            policyholder: dir.join("policyholder.csv"),
            third_party: dir.join("third_party.csv"),
        }
    }
}

/// The three raw tables feeding the ABT.
#[derive(Debug, Clone)]
pub struct RawTables {
    /// One row per claim.
    pub claims: DataFrame,
    /// One row per policy.
    pub policyholder: DataFrame,
    /// Zero or one row per claim.
    pub third_party: DataFrame,
}

impl RawTables {
    /// Wrap already-loaded tables.
    pub const fn new(claims: DataFrame, policyholder: DataFrame, third_party: DataFrame) -> Self {
        Self {
            claims,
            policyholder,
            third_party,
        }
    }

    /// Read all three extracts from disk.
    pub fn load(paths: &RawPaths) -> Result<Self> {
        info!("Loading raw data...");
        let claims = read_csv(&paths.claims)?;
        let policyholder = read_csv(&paths.policyholder)?;
        let third_party = read_csv(&paths.third_party)?;

        info!(
            claims = claims.height(),
            policyholder = policyholder.height(),
            third_party = third_party.height(),
            "Raw tables loaded"
        );

        Ok(Self::new(claims, policyholder, third_party))
    }
}

/// Read a comma-separated file with a header row.
///
/// Column dtypes are inferred from every row, so a late decimal or a column
/// whose first values are all empty still gets a numeric dtype.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Write a DataFrame as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    CsvWriter::new(&mut writer).include_header(true).finish(df)?;
    writer.flush()?;
    Ok(())
}

/// Fail with [`DataError::MissingColumn`] unless `df` has every column.
pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    for &column in columns {
        if df.column(column).is_err() {
            return Err(DataError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Whether `df` has a column called `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = RawPaths::default();
        assert_eq!(paths.claims, PathBuf::from("data/raw/claims.csv"));
        assert_eq!(paths.policyholder, PathBuf::from("data/raw/policyholder.csv"));
        assert_eq!(paths.third_party, PathBuf::from("data/raw/third_party.csv"));
    }

    #[test]
    fn test_require_columns() {
        let df = df!("Claim_ID" => ["C1"], "Policy_ID" => ["P1"]).unwrap();
        assert!(require_columns(&df, "claims", &["Claim_ID", "Policy_ID"]).is_ok());

        let err = require_columns(&df, "claims", &["Claim_ID", "FNOL_Date"]).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "FNOL_Date"));
    }

    #[test]
    fn test_csv_round_trip_keeps_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.csv");

        let mut df = df!(
            "Claim_ID" => ["C1", "C2"],
            "Amount" => [Some(10.5), None]
        )
        .unwrap();
        write_csv(&mut df, &path).unwrap();

        let read = read_csv(&path).unwrap();
        assert_eq!(read.height(), 2);
        assert_eq!(read.column("Amount").unwrap().null_count(), 1);
        assert!(has_column(&read, "Claim_ID"));
        assert!(!has_column(&read, "Status"));
    }
}
