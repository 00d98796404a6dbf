//! Pollutant pivoter: long-form readings to one wide row per location+time

use super::timestamp::{format_timestamp, timestamps};
use crate::error::Result;
use crate::schema::{
    PollutantKind, LATITUDE, LOCATION_ID, LOCATION_NAME, LONGITUDE, PARAMETER, TIMESTAMP, VALUE,
};
use crate::utils::frame::{drop_duplicate_rows, f64_column, f64_values, has_column, str_column, str_values};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One pollutant reading after normalization and filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RawMeasurement {
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: PollutantKind,
    pub value: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Row accounting for one pivot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub missing_coordinates: usize,
    pub missing_value: usize,
    pub untracked_parameter: usize,
    pub output_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    location_id: Option<String>,
    location_name: Option<String>,
    latitude: u64,
    longitude: u64,
    timestamp: Option<DateTime<Utc>>,
}

struct GroupAccumulator {
    location_id: Option<String>,
    location_name: Option<String>,
    latitude: f64,
    longitude: f64,
    timestamp: Option<DateTime<Utc>>,
    sums: [f64; 6],
    counts: [usize; 6],
}

impl GroupAccumulator {
    fn new(m: &RawMeasurement) -> Self {
        Self {
            location_id: m.location_id.clone(),
            location_name: m.location_name.clone(),
            latitude: m.latitude,
            longitude: m.longitude,
            timestamp: m.timestamp,
            sums: [0.0; 6],
            counts: [0; 6],
        }
    }

    fn add(&mut self, kind: PollutantKind, value: f64) {
        self.sums[kind.index()] += value;
        self.counts[kind.index()] += 1;
    }

    fn mean(&self, kind: PollutantKind) -> Option<f64> {
        let n = self.counts[kind.index()];
        (n > 0).then(|| self.sums[kind.index()] / n as f64)
    }
}

/// Collapses long-form readings (one row per pollutant per reading) into
/// wide rows keyed by `(location_id, location_name, latitude, longitude,
/// timestamp)`, one column per target pollutant.
pub struct PollutantPivoter;

impl PollutantPivoter {
    /// Pivot a normalized pollutant table
    pub fn pivot(df: &DataFrame) -> Result<(DataFrame, PivotReport)> {
        let mut report = PivotReport {
            input_rows: df.height(),
            ..Default::default()
        };

        let (deduped, removed) = drop_duplicate_rows(df)?;
        report.duplicates_removed = removed;

        let measurements = Self::extract(&deduped, &mut report)?;

        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<GroupAccumulator> = Vec::new();
        for m in &measurements {
            let key = GroupKey {
                location_id: m.location_id.clone(),
                location_name: m.location_name.clone(),
                latitude: m.latitude.to_bits(),
                longitude: m.longitude.to_bits(),
                timestamp: m.timestamp,
            };
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(GroupAccumulator::new(m));
                groups.len() - 1
            });
            groups[slot].add(m.kind, m.value);
        }

        report.output_rows = groups.len();
        debug!(
            readings = measurements.len(),
            rows = groups.len(),
            duplicates = report.duplicates_removed,
            untracked = report.untracked_parameter,
            "pivoted pollutant readings"
        );

        Ok((Self::assemble(&groups)?, report))
    }

    /// Filter rows into typed readings. Rows without coordinates or value
    /// are dropped, as are parameters outside the six targets.
    fn extract(df: &DataFrame, report: &mut PivotReport) -> Result<Vec<RawMeasurement>> {
        let n = df.height();
        if !has_column(df, PARAMETER) || !has_column(df, VALUE) {
            warn!("pollutant table has no parameter/value columns; no readings to pivot");
            report.missing_value = n;
            return Ok(Vec::new());
        }

        let text = |name: &str| -> Result<Vec<Option<String>>> {
            if has_column(df, name) {
                str_values(df, name)
            } else {
                Ok(vec![None; n])
            }
        };
        let number = |name: &str| -> Result<Vec<Option<f64>>> {
            if has_column(df, name) {
                f64_values(df, name)
            } else {
                Ok(vec![None; n])
            }
        };

        let ids = text(LOCATION_ID)?;
        let names = text(LOCATION_NAME)?;
        let lats = number(LATITUDE)?;
        let lons = number(LONGITUDE)?;
        let params = text(PARAMETER)?;
        let values = number(VALUE)?;
        let times = timestamps(df)?;

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let (Some(latitude), Some(longitude)) = (lats[i], lons[i]) else {
                report.missing_coordinates += 1;
                continue;
            };
            let Some(value) = values[i] else {
                report.missing_value += 1;
                continue;
            };
            let Some(kind) = params[i].as_deref().and_then(|p| p.parse::<PollutantKind>().ok()) else {
                report.untracked_parameter += 1;
                continue;
            };
            out.push(RawMeasurement {
                location_id: ids[i].clone(),
                location_name: names[i].clone(),
                latitude,
                longitude,
                kind,
                value,
                timestamp: times[i],
            });
        }
        Ok(out)
    }

    fn assemble(groups: &[GroupAccumulator]) -> Result<DataFrame> {
        let mut columns = vec![
            str_column(LOCATION_ID, groups.iter().map(|g| g.location_id.clone()).collect()),
            str_column(LOCATION_NAME, groups.iter().map(|g| g.location_name.clone()).collect()),
            f64_column(LATITUDE, groups.iter().map(|g| Some(g.latitude)).collect()),
            f64_column(LONGITUDE, groups.iter().map(|g| Some(g.longitude)).collect()),
            str_column(
                TIMESTAMP,
                groups.iter().map(|g| g.timestamp.as_ref().map(format_timestamp)).collect(),
            ),
        ];
        for kind in PollutantKind::ALL {
            columns.push(f64_column(
                kind.as_str(),
                groups.iter().map(|g| g.mean(kind)).collect(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }
}
