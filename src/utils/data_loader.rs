//! Data loading utilities

use crate::error::{AirfuseError, Result};
use crate::utils::frame::{column_names, parse_f64};
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Loader for the pipeline's tabular inputs.
///
/// CSV cells are first read as text and then promoted to `Float64` only when
/// every non-blank cell of a column parses as a number, so a malformed cell
/// never aborts a load.
pub struct DataLoader {
    /// Promote all-numeric text columns to `Float64`
    infer_numeric: bool,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self { infer_numeric: true }
    }

    /// Keep every CSV column as text
    pub fn with_infer_numeric(mut self, infer_numeric: bool) -> Self {
        self.infer_numeric = infer_numeric;
        self
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| AirfuseError::DataError(format!("{}: {}", path.display(), e)))?;

        if self.infer_numeric {
            infer_numeric_columns(df)
        } else {
            Ok(df)
        }
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;

        ParquetReader::new(file)
            .finish()
            .map_err(|e| AirfuseError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: &Path) -> Result<DataFrame> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => self.load_parquet(path),
            _ => self.load_csv(path),
        }
    }

    /// Load an input the run cannot do without
    pub fn load_required(&self, path: &Path, role: &str) -> Result<DataFrame> {
        if !path.exists() {
            return Err(AirfuseError::MissingInput {
                role: role.to_string(),
                path: path.to_path_buf(),
            });
        }
        let df = self.load_auto(path)?;
        debug!(role, rows = df.height(), cols = df.width(), "loaded input");
        Ok(df)
    }

    /// Load an input the run can proceed without. A missing or unreadable
    /// file yields `Ok(None)`.
    pub fn load_optional(&self, path: &Path, role: &str) -> Result<Option<DataFrame>> {
        if !path.exists() {
            return Ok(None);
        }
        match self.load_auto(path) {
            Ok(df) => {
                debug!(role, rows = df.height(), cols = df.width(), "loaded input");
                Ok(Some(df))
            }
            Err(e) => {
                warn!(role, path = %path.display(), error = %e, "optional input unreadable");
                Ok(None)
            }
        }
    }
}

/// Promote text columns whose non-blank cells all parse as numbers
fn infer_numeric_columns(mut df: DataFrame) -> Result<DataFrame> {
    for name in column_names(&df) {
        let parsed = {
            let series = df.column(&name)?.as_materialized_series();
            if series.dtype() != &DataType::String {
                continue;
            }
            parse_numeric_text(series.str()?)
        };

        if let Some(values) = parsed {
            df.with_column(Column::new(name.as_str().into(), values))?;
        }
    }
    Ok(df)
}

fn parse_numeric_text(ca: &StringChunked) -> Option<Vec<Option<f64>>> {
    let mut values = Vec::with_capacity(ca.len());
    let mut any = false;

    for cell in ca.into_iter() {
        match cell {
            None => values.push(None),
            Some(raw) if raw.trim().is_empty() => values.push(None),
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.eq_ignore_ascii_case("nan") {
                    values.push(None);
                    continue;
                }
                let value = parse_f64(trimmed)?;
                any = true;
                values.push(Some(value));
            }
        }
    }

    any.then_some(values)
}

/// Save DataFrames and JSON artefacts
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating the parent directory if needed
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| AirfuseError::DataError(e.to_string()))
    }

    /// Save a serializable value as pretty-printed JSON
    pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "location_id,value,parameter").unwrap();
        writeln!(file, "101,12.5,pm25").unwrap();
        writeln!(file, "101,oops,no2").unwrap();
        writeln!(file, "102,,so2").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let loader = DataLoader::new();

        let df = loader.load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("location_id").unwrap().dtype(), &DataType::Float64);
        // one malformed cell keeps the whole column as text
        assert_eq!(df.column("value").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("parameter").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_load_required_missing_file() {
        let loader = DataLoader::new();
        let err = loader
            .load_required(Path::new("/nonexistent/weather.csv"), "weather")
            .unwrap_err();
        assert!(matches!(err, AirfuseError::MissingInput { .. }));
    }

    #[test]
    fn test_load_optional_missing_file() {
        let loader = DataLoader::new();
        let df = loader
            .load_optional(Path::new("/nonexistent/geo.csv"), "geography")
            .unwrap();
        assert!(df.is_none());
    }

    #[test]
    fn test_save_csv() {
        let mut df = DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0]),
            Column::new("b".into(), &["x", "y", "z"]),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        DataSaver::save_csv(&mut df, &path).unwrap();

        let loaded = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }
}
