//! Source cleaning: schema normalization, pollutant pivoting, weather cleanup
//!
//! Provides:
//! - Canonical timestamp/parameter/coordinate columns per source
//! - Long-to-wide pivot of pollutant readings
//! - Deduplication and coordinate filtering of weather observations

mod normalizer;
mod pivot;
pub mod timestamp;

pub use normalizer::{canonical_location_id, parse_coordinates, NormalizationReport, SchemaNormalizer, SourceKind};
pub use pivot::{PivotReport, PollutantPivoter, RawMeasurement};
pub use timestamp::{format_timestamp, parse_timestamp, timestamps};

use crate::error::Result;
use crate::schema::{LATITUDE, LONGITUDE};
use crate::utils::frame::{drop_duplicate_rows, f64_values, filter_rows, has_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Row accounting for weather cleanup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherCleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub missing_coordinates: usize,
}

/// Drop exact-duplicate weather rows, then rows without coordinates.
/// Tables without a coordinate pair are only deduplicated.
pub fn clean_weather(df: &DataFrame) -> Result<(DataFrame, WeatherCleaningReport)> {
    let mut report = WeatherCleaningReport {
        input_rows: df.height(),
        ..Default::default()
    };

    let (deduped, removed) = drop_duplicate_rows(df)?;
    report.duplicates_removed = removed;

    if !(has_column(&deduped, LATITUDE) && has_column(&deduped, LONGITUDE)) {
        return Ok((deduped, report));
    }

    let lats = f64_values(&deduped, LATITUDE)?;
    let lons = f64_values(&deduped, LONGITUDE)?;
    let keep: Vec<bool> = lats
        .iter()
        .zip(&lons)
        .map(|(lat, lon)| lat.is_some() && lon.is_some())
        .collect();
    report.missing_coordinates = keep.iter().filter(|k| !**k).count();

    let cleaned = if report.missing_coordinates > 0 {
        filter_rows(&deduped, &keep)?
    } else {
        deduped
    };
    Ok((cleaned, report))
}
