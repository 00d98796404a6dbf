//! Imputation engine
//!
//! Two phases over the fused table:
//! - Per-location linear interpolation along time (never across locations)
//! - Batch-median backfill of whatever interpolation left open

mod interpolate;

pub use interpolate::interpolate_series;

use crate::cleaning::timestamps;
use crate::error::{AirfuseError, Result};
use crate::schema::{IMPUTE_COLUMNS, LATITUDE, LOCATION_ID, LONGITUDE};
use crate::utils::frame::{f64_column, f64_values, has_column, str_values, take_rows};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info};

/// What the interpolation x-axis measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationAxis {
    /// Seconds since the epoch of each row's timestamp
    Time,
    /// Position of the row within its time-sorted location group
    RowOrder,
}

/// Configuration for the imputation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationConfig {
    /// Interpolation x-axis
    pub axis: InterpolationAxis,
    /// Minimum observed points a location needs before it is interpolated
    pub min_points: usize,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            axis: InterpolationAxis::Time,
            min_points: 2,
        }
    }
}

impl ImputationConfig {
    /// Builder method to set the interpolation axis
    pub fn with_axis(mut self, axis: InterpolationAxis) -> Self {
        self.axis = axis;
        self
    }

    /// Builder method to set the minimum number of anchors
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_points == 0 {
            return Err(AirfuseError::InvalidParameter {
                name: "min_points".to_string(),
                value: "0".to_string(),
                reason: "interpolation needs at least one observed point".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-column accounting of one imputation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    /// Whether the temporal phase ran (some timestamp was present)
    pub interpolation_ran: bool,
    /// Location partitions interpolated
    pub partitions: usize,
    /// Cells filled by interpolation
    pub interpolated: BTreeMap<String, usize>,
    /// Cells filled by median backfill
    pub median_filled: BTreeMap<String, usize>,
    /// Medians used for backfill
    pub medians: BTreeMap<String, f64>,
    /// Target columns with no values anywhere in the batch
    pub degenerate_columns: Vec<String>,
}

/// Fills missing pollutant and weather values
pub struct ImputationEngine {
    config: ImputationConfig,
}

impl Default for ImputationEngine {
    fn default() -> Self {
        Self::new(ImputationConfig::default())
    }
}

impl ImputationEngine {
    /// Create an engine with the given configuration
    pub fn new(config: ImputationConfig) -> Self {
        Self { config }
    }

    /// Impute the target columns of a fused table. When timestamps are
    /// present the output is sorted by `(location_id, timestamp)`.
    pub fn impute(&self, df: &DataFrame) -> Result<(DataFrame, ImputationReport)> {
        self.config.validate()?;

        let mut report = ImputationReport::default();
        let targets: Vec<&str> = IMPUTE_COLUMNS
            .iter()
            .copied()
            .filter(|c| has_column(df, c))
            .collect();

        let mut frame = if timestamps(df)?.iter().any(Option::is_some) {
            report.interpolation_ran = true;
            self.interpolate(df, &targets, &mut report)?
        } else {
            debug!("no timestamps present; skipping temporal interpolation");
            df.clone()
        };

        for name in &targets {
            let mut values = f64_values(&frame, name)?;
            match median(&values) {
                Some(med) => {
                    let mut filled = 0;
                    for v in values.iter_mut().filter(|v| v.is_none()) {
                        *v = Some(med);
                        filled += 1;
                    }
                    report.medians.insert(name.to_string(), med);
                    report.median_filled.insert(name.to_string(), filled);
                }
                None => {
                    debug!(column = *name, "column has no values; median undefined, left null");
                    report.degenerate_columns.push(name.to_string());
                }
            }
            frame.with_column(f64_column(name, values))?;
        }

        for name in [LATITUDE, LONGITUDE] {
            if has_column(&frame, name) {
                let coerced = f64_values(&frame, name)?;
                frame.with_column(f64_column(name, coerced))?;
            }
        }

        info!(
            partitions = report.partitions,
            interpolated = report.interpolated.values().sum::<usize>(),
            median_filled = report.median_filled.values().sum::<usize>(),
            degenerate = report.degenerate_columns.len(),
            "imputed missing values"
        );
        Ok((frame, report))
    }

    /// Sort by location and time, then interpolate each location partition
    /// independently.
    fn interpolate(&self, df: &DataFrame, targets: &[&str], report: &mut ImputationReport) -> Result<DataFrame> {
        let keys = location_keys(df)?;
        let times = timestamps(df)?;

        let mut order: Vec<usize> = (0..df.height()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]).then_with(|| nulls_last(&times[a], &times[b])));

        let mut sorted = take_rows(df, &order)?;
        let keys: Vec<LocationKey> = order.iter().map(|&i| keys[i].clone()).collect();
        let times: Vec<_> = order.iter().map(|&i| times[i]).collect();

        let partitions = partition_by_location(&keys);
        report.partitions = partitions.len();

        let xs: Vec<Option<f64>> = match self.config.axis {
            InterpolationAxis::Time => times
                .iter()
                .map(|t| t.map(|t| t.timestamp_millis() as f64 / 1000.0))
                .collect(),
            InterpolationAxis::RowOrder => {
                let mut xs = vec![None; keys.len()];
                for range in &partitions {
                    for (pos, row) in range.clone().enumerate() {
                        xs[row] = Some(pos as f64);
                    }
                }
                xs
            }
        };

        let min_points = self.config.min_points;
        for name in targets {
            let values = f64_values(&sorted, name)?;
            let pieces: Vec<(Vec<Option<f64>>, usize)> = partitions
                .par_iter()
                .map(|range| {
                    let mut segment = values[range.clone()].to_vec();
                    let filled = interpolate_series(&xs[range.clone()], &mut segment, min_points);
                    (segment, filled)
                })
                .collect();

            let mut rebuilt = Vec::with_capacity(values.len());
            let mut filled = 0;
            for (segment, n) in pieces {
                rebuilt.extend(segment);
                filled += n;
            }
            report.interpolated.insert(name.to_string(), filled);
            sorted.with_column(f64_column(name, rebuilt))?;
        }

        Ok(sorted)
    }
}

/// Partition key of a row. Rows without an id fall back to their coordinate
/// pair; rows with neither stand alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocationKey {
    Id(String),
    Coordinates(u64, u64),
    Row(usize),
}

fn location_keys(df: &DataFrame) -> Result<Vec<LocationKey>> {
    let n = df.height();
    let ids = if has_column(df, LOCATION_ID) {
        str_values(df, LOCATION_ID)?
    } else {
        vec![None; n]
    };
    let (lats, lons) = if has_column(df, LATITUDE) && has_column(df, LONGITUDE) {
        (f64_values(df, LATITUDE)?, f64_values(df, LONGITUDE)?)
    } else {
        (vec![None; n], vec![None; n])
    };

    Ok((0..n)
        .map(|row| match (&ids[row], lats[row], lons[row]) {
            (Some(id), _, _) => LocationKey::Id(id.clone()),
            (None, Some(lat), Some(lon)) => LocationKey::Coordinates(lat.to_bits(), lon.to_bits()),
            _ => LocationKey::Row(row),
        })
        .collect())
}

/// Contiguous row ranges sharing a location key in a location-sorted table
fn partition_by_location(keys: &[LocationKey]) -> Vec<Range<usize>> {
    let mut partitions = Vec::new();
    let mut start = 0;
    for row in 1..=keys.len() {
        if row == keys.len() || keys[row] != keys[start] {
            if row > start {
                partitions.push(start..row);
            }
            start = row;
        }
    }
    partitions
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Median of the non-null values; mean of the middle pair for even counts
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    Some(if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0), Some(2.0), Some(3.0)]), Some(2.5));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn test_partition_by_location() {
        let keys = vec![
            LocationKey::Id("a".to_string()),
            LocationKey::Id("a".to_string()),
            LocationKey::Id("b".to_string()),
            LocationKey::Coordinates(1, 2),
            LocationKey::Row(4),
            LocationKey::Row(5),
        ];
        assert_eq!(partition_by_location(&keys), vec![0..2, 2..3, 3..4, 4..5, 5..6]);
        assert!(partition_by_location(&[]).is_empty());
    }

    #[test]
    fn test_rows_without_id_partition_by_coordinates() {
        let df = df!(
            "latitude" => &[10.0, 10.0, 50.0, 10.0],
            "longitude" => &[10.0, 10.0, 50.0, 10.0],
            "timestamp" => &[
                "2024-01-01T00:00:00Z",
                "2024-01-01T01:00:00Z",
                "2024-01-01T02:00:00Z",
                "2024-01-01T04:00:00Z"
            ],
            "pm25" => &[Some(10.0), Some(20.0), Some(1000.0), None]
        )
        .unwrap();

        let (out, report) = ImputationEngine::default().impute(&df).unwrap();
        assert_eq!(report.partitions, 2);
        assert_eq!(report.interpolated.get("pm25"), Some(&1));

        let lats = out.column("latitude").unwrap().f64().unwrap();
        let times = out.column("timestamp").unwrap().str().unwrap();
        let pm25 = out.column("pm25").unwrap().f64().unwrap();
        let row = (0..out.height())
            .find(|&i| lats.get(i) == Some(10.0) && times.get(i) == Some("2024-01-01T04:00:00Z"))
            .unwrap();
        // clamped to the site's own last reading, not the other site's 1000
        assert_eq!(pm25.get(row), Some(20.0));
    }

    #[test]
    fn test_impute_sorts_and_interpolates_per_location() {
        let df = df!(
            "location_id" => &["b", "a", "a", "a"],
            "timestamp" => &[
                "2024-01-01T00:00:00Z",
                "2024-01-01T02:00:00Z",
                "2024-01-01T00:00:00Z",
                "2024-01-01T01:00:00Z"
            ],
            "pm25" => &[Some(100.0), Some(30.0), Some(10.0), None]
        )
        .unwrap();

        let (out, report) = ImputationEngine::default().impute(&df).unwrap();

        let ids = out.column("location_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("a"));
        assert_eq!(ids.get(3), Some("b"));
        let pm25 = out.column("pm25").unwrap().f64().unwrap();
        assert_eq!(pm25.get(1), Some(20.0));
        assert_eq!(report.interpolated.get("pm25"), Some(&1));
        assert_eq!(report.partitions, 2);
    }

    #[test]
    fn test_all_null_column_is_degenerate_not_fatal() {
        let df = df!(
            "location_id" => &["a", "a"],
            "humidity" => &[None::<f64>, None]
        )
        .unwrap();

        let (out, report) = ImputationEngine::default().impute(&df).unwrap();
        assert_eq!(out.column("humidity").unwrap().null_count(), 2);
        assert_eq!(report.degenerate_columns, vec!["humidity".to_string()]);
        assert!(!report.interpolation_ran);
    }

    #[test]
    fn test_zero_min_points_rejected() {
        let engine = ImputationEngine::new(ImputationConfig::default().with_min_points(0));
        let df = df!("pm25" => &[1.0]).unwrap();
        assert!(engine.impute(&df).is_err());
    }
}
