//! Column access helpers shared by the pipeline stages.
//!
//! Stages exchange polars `DataFrame`s but do their row-level work on plain
//! vectors. These helpers are the only place where that conversion happens,
//! so parse failures degrade to `None` in exactly one way everywhere.

use crate::error::{AirfuseError, Result};
use crate::schema::is_numeric_dtype;
use polars::prelude::*;
use std::collections::HashSet;

/// Whether `df` has a column called `name`
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Column names in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Parse a text cell as a float. Blank cells are missing, not malformed.
pub fn parse_f64(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Numeric view of a column. Unparsable cells and NaN become `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| AirfuseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();

    match series.dtype() {
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_f64))
            .collect()),
        _ => {
            let casted = series.cast(&DataType::Float64)?;
            Ok(casted
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect())
        }
    }
}

/// Text view of a column. Non-text columns are rendered through a cast.
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .map_err(|_| AirfuseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();

    let casted = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };

    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Build a `Float64` column
pub fn f64_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::new(name.into(), values)
}

/// Build a `String` column
pub fn str_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::new(name.into(), values)
}

/// Build an `Int32` column
pub fn i32_column(name: &str, values: Vec<Option<i32>>) -> Column {
    Column::new(name.into(), values)
}

/// Reorder (or subset) rows by position
pub fn take_rows(df: &DataFrame, order: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        order.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Keep rows whose mask entry is `true`
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    Ok(df.filter(&mask)?)
}

/// Gather one column through an optional row mapping: `None` yields a null
/// cell. Numeric columns come out as `Float64`, everything else as text.
pub fn gather_column(
    df: &DataFrame,
    name: &str,
    output_name: &str,
    mapping: &[Option<usize>],
) -> Result<Column> {
    let dtype = df
        .column(name)
        .map_err(|_| AirfuseError::FeatureNotFound(name.to_string()))?
        .dtype()
        .clone();

    if is_numeric_dtype(&dtype) {
        let values = f64_values(df, name)?;
        let gathered = mapping
            .iter()
            .map(|m| m.and_then(|i| values[i]))
            .collect();
        Ok(f64_column(output_name, gathered))
    } else {
        let values = str_values(df, name)?;
        let gathered = mapping
            .iter()
            .map(|m| m.and_then(|i| values[i].clone()))
            .collect();
        Ok(str_column(output_name, gathered))
    }
}

/// Drop rows that are exact duplicates of an earlier row.
/// Returns the deduplicated frame and the number of rows removed.
pub fn drop_duplicate_rows(df: &DataFrame) -> Result<(DataFrame, usize)> {
    let names = column_names(df);
    let views = names
        .iter()
        .map(|n| str_values(df, n))
        .collect::<Result<Vec<_>>>()?;

    let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(df.height());
    let keep: Vec<bool> = (0..df.height())
        .map(|row| {
            let key: Vec<Option<String>> = views.iter().map(|v| v[row].clone()).collect();
            seen.insert(key)
        })
        .collect();

    let removed = keep.iter().filter(|k| !**k).count();
    if removed == 0 {
        return Ok((df.clone(), 0));
    }
    Ok((filter_rows(df, &keep)?, removed))
}
