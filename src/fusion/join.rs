//! Record fuser: attaches weather observations to pivoted pollutant rows

use crate::cleaning::timestamps;
use crate::error::{AirfuseError, Result};
use crate::schema::{LATITUDE, LOCATION_ID, LONGITUDE, WEATHER_COLLISION_SUFFIX, WEATHER_COLUMNS};
use crate::utils::frame::{column_names, f64_column, f64_values, gather_column, has_column, str_values};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Earth radius used for great-circle distances, in km
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Great-circle distance between two points given in decimal degrees
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );
    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin() * EARTH_RADIUS_KM
}

/// Join configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Maximum distance for the coordinate join; `0.0` requires exact
    /// equality of the `(latitude, longitude)` pair
    pub coordinate_tolerance_km: f64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            coordinate_tolerance_km: 0.0,
        }
    }
}

impl JoinConfig {
    /// Builder method to set the coordinate tolerance
    pub fn with_coordinate_tolerance_km(mut self, km: f64) -> Self {
        self.coordinate_tolerance_km = km;
        self
    }

    /// Reject nonsensical settings
    pub fn validate(&self) -> Result<()> {
        if !self.coordinate_tolerance_km.is_finite() || self.coordinate_tolerance_km < 0.0 {
            return Err(AirfuseError::InvalidParameter {
                name: "coordinate_tolerance_km".to_string(),
                value: self.coordinate_tolerance_km.to_string(),
                reason: "must be a finite, non-negative distance".to_string(),
            });
        }
        Ok(())
    }
}

/// How pollutant rows are matched to weather rows, decided once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Both tables carry `location_id`
    Identity,
    /// Both tables carry a coordinate pair
    Coordinates,
    /// No shared key; weather is not attached
    Unavailable,
}

impl JoinStrategy {
    /// Pick the strategy from the columns both tables expose. An id column
    /// with no values does not count as carrying the identity key.
    pub fn select(pollutants: &DataFrame, weather: &DataFrame) -> Self {
        let both = |name: &str| has_column(pollutants, name) && has_column(weather, name);
        let keyed = |df: &DataFrame| {
            df.column(LOCATION_ID)
                .map(|col| col.null_count() < df.height())
                .unwrap_or(false)
        };

        if keyed(pollutants) && keyed(weather) {
            JoinStrategy::Identity
        } else if both(LATITUDE) && both(LONGITUDE) {
            JoinStrategy::Coordinates
        } else {
            JoinStrategy::Unavailable
        }
    }

    /// Weather columns consumed as join keys
    fn key_columns(&self) -> &'static [&'static str] {
        match self {
            JoinStrategy::Identity => &[LOCATION_ID],
            JoinStrategy::Coordinates => &[LATITUDE, LONGITUDE],
            JoinStrategy::Unavailable => &[],
        }
    }
}

/// Outcome of one fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionReport {
    pub strategy: JoinStrategy,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    /// Weather columns carried into the fused table (after renaming)
    pub carried_columns: Vec<String>,
    /// Weather columns synthesized as all-null
    pub synthesized_columns: Vec<String>,
}

/// Left-joins weather observations onto pivoted pollutant rows.
///
/// Every pollutant row is kept exactly once. Among the weather rows sharing
/// its key, the one closest in time is attached; ties and rows without a
/// timestamp take the first candidate in input order.
pub struct RecordFuser {
    config: JoinConfig,
}

impl Default for RecordFuser {
    fn default() -> Self {
        Self::new(JoinConfig::default())
    }
}

impl RecordFuser {
    /// Create a fuser with the given configuration
    pub fn new(config: JoinConfig) -> Self {
        Self { config }
    }

    /// Fuse `pollutants` (pivoted) with `weather` (cleaned)
    pub fn fuse(&self, pollutants: &DataFrame, weather: &DataFrame) -> Result<(DataFrame, FusionReport)> {
        self.config.validate()?;

        let strategy = JoinStrategy::select(pollutants, weather);
        info!(?strategy, "selected weather join strategy");

        let mapping = match strategy {
            JoinStrategy::Identity => self.match_by_identity(pollutants, weather)?,
            JoinStrategy::Coordinates => self.match_by_coordinates(pollutants, weather)?,
            JoinStrategy::Unavailable => vec![None; pollutants.height()],
        };
        let matched_rows = mapping.iter().filter(|m| m.is_some()).count();

        let mut fused = pollutants.clone();
        let mut carried_columns = Vec::new();
        if strategy != JoinStrategy::Unavailable {
            let keys = strategy.key_columns();
            for name in column_names(weather) {
                if keys.contains(&name.as_str()) {
                    continue;
                }
                let output_name = if has_column(pollutants, &name) {
                    format!("{name}{WEATHER_COLLISION_SUFFIX}")
                } else {
                    name.clone()
                };
                fused.with_column(gather_column(weather, &name, &output_name, &mapping)?)?;
                carried_columns.push(output_name);
            }
        }

        let mut synthesized_columns = Vec::new();
        for name in WEATHER_COLUMNS {
            if !has_column(&fused, name) {
                fused.with_column(f64_column(name, vec![None; fused.height()]))?;
                synthesized_columns.push(name.to_string());
            }
        }

        debug!(
            matched = matched_rows,
            carried = carried_columns.len(),
            synthesized = ?synthesized_columns,
            "fused weather observations"
        );

        Ok((
            fused,
            FusionReport {
                strategy,
                matched_rows,
                unmatched_rows: pollutants.height() - matched_rows,
                carried_columns,
                synthesized_columns,
            },
        ))
    }

    fn match_by_identity(&self, pollutants: &DataFrame, weather: &DataFrame) -> Result<Vec<Option<usize>>> {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, id) in str_values(weather, LOCATION_ID)?.into_iter().enumerate() {
            if let Some(id) = id {
                index.entry(id).or_default().push(row);
            }
        }

        let weather_times = timestamps(weather)?;
        let pollutant_times = timestamps(pollutants)?;

        Ok(str_values(pollutants, LOCATION_ID)?
            .iter()
            .zip(&pollutant_times)
            .map(|(id, time)| {
                let candidates = index.get(id.as_deref()?)?;
                nearest_in_time(candidates, *time, &weather_times)
            })
            .collect())
    }

    fn match_by_coordinates(&self, pollutants: &DataFrame, weather: &DataFrame) -> Result<Vec<Option<usize>>> {
        // distinct weather coordinates, in first-seen order
        let mut sites: Vec<(f64, f64, Vec<usize>)> = Vec::new();
        let mut site_index: HashMap<(u64, u64), usize> = HashMap::new();
        let w_lat = f64_values(weather, LATITUDE)?;
        let w_lon = f64_values(weather, LONGITUDE)?;
        for (row, (lat, lon)) in w_lat.iter().zip(&w_lon).enumerate() {
            let (Some(lat), Some(lon)) = (*lat, *lon) else { continue };
            let slot = *site_index.entry((lat.to_bits(), lon.to_bits())).or_insert_with(|| {
                sites.push((lat, lon, Vec::new()));
                sites.len() - 1
            });
            sites[slot].2.push(row);
        }

        let weather_times = timestamps(weather)?;
        let pollutant_times = timestamps(pollutants)?;
        let p_lat = f64_values(pollutants, LATITUDE)?;
        let p_lon = f64_values(pollutants, LONGITUDE)?;
        let tolerance = self.config.coordinate_tolerance_km;

        Ok((0..pollutants.height())
            .map(|row| {
                let (lat, lon) = (p_lat[row]?, p_lon[row]?);
                let site = if tolerance > 0.0 {
                    sites
                        .iter()
                        .enumerate()
                        .map(|(i, s)| (i, haversine_km(lon, lat, s.1, s.0)))
                        .filter(|(_, d)| *d <= tolerance)
                        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
                        .map(|(i, _)| i)?
                } else {
                    *site_index.get(&(lat.to_bits(), lon.to_bits()))?
                };
                nearest_in_time(&sites[site].2, pollutant_times[row], &weather_times)
            })
            .collect())
    }
}

/// Candidate closest in time to `target`; the first candidate when there is
/// no time information to compare
fn nearest_in_time(
    candidates: &[usize],
    target: Option<DateTime<Utc>>,
    weather_times: &[Option<DateTime<Utc>>],
) -> Option<usize> {
    let first = *candidates.first()?;
    let Some(target) = target else {
        return Some(first);
    };

    candidates
        .iter()
        .filter_map(|&c| weather_times[c].map(|t| (c, (t - target).num_seconds().abs())))
        .min_by_key(|&(c, gap)| (gap, c))
        .map(|(c, _)| c)
        .or(Some(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pollutants() -> DataFrame {
        df!(
            "location_id" => &["1", "1", "2", "3"],
            "latitude" => &[28.6, 28.6, 19.0, 10.0],
            "longitude" => &[77.2, 77.2, 72.8, 10.0],
            "timestamp" => &[
                "2024-01-01T00:00:00Z",
                "2024-01-01T06:00:00Z",
                "2024-01-01T00:00:00Z",
                "2024-01-01T00:00:00Z"
            ],
            "pm25" => &[50.0, 60.0, 70.0, 80.0]
        )
        .unwrap()
    }

    fn weather() -> DataFrame {
        df!(
            "location_id" => &["1", "1", "2"],
            "latitude" => &[28.6, 28.6, 19.0],
            "longitude" => &[77.2, 77.2, 72.8],
            "timestamp" => &[
                "2024-01-01T01:00:00Z",
                "2024-01-01T05:00:00Z",
                "2024-01-01T00:00:00Z"
            ],
            "temperature" => &[10.0, 15.0, 30.0],
            "humidity" => &[80.0, 70.0, 35.0]
        )
        .unwrap()
    }

    #[test]
    fn test_identity_join_nearest_in_time() {
        let (fused, report) = RecordFuser::default().fuse(&pollutants(), &weather()).unwrap();

        assert_eq!(report.strategy, JoinStrategy::Identity);
        assert_eq!(fused.height(), 4);
        assert_eq!(report.matched_rows, 3);

        let temp = fused.column("temperature").unwrap().f64().unwrap();
        assert_eq!(temp.get(0), Some(10.0));
        assert_eq!(temp.get(1), Some(15.0));
        assert_eq!(temp.get(2), Some(30.0));
        assert_eq!(temp.get(3), None);

        // colliding weather columns keep the pollutant side canonical
        assert!(fused.column("timestamp_w").is_ok());
        assert!(fused.column("latitude_w").is_ok());
        assert!(fused.column("wind_speed").is_ok());
        assert!(report.synthesized_columns.contains(&"wind_direction".to_string()));
    }

    #[test]
    fn test_coordinate_fallback() {
        let weather = weather().drop("location_id").unwrap();
        let (fused, report) = RecordFuser::default().fuse(&pollutants(), &weather).unwrap();

        assert_eq!(report.strategy, JoinStrategy::Coordinates);
        let humidity = fused.column("humidity").unwrap().f64().unwrap();
        assert_eq!(humidity.get(2), Some(35.0));
        assert_eq!(humidity.get(3), None);
    }

    #[test]
    fn test_empty_id_column_falls_back_to_coordinates() {
        let pollutants = df!(
            "location_id" => &[None::<&str>],
            "latitude" => &[19.0],
            "longitude" => &[72.8],
            "pm25" => &[70.0]
        )
        .unwrap();
        let weather = df!(
            "location_id" => &["7"],
            "latitude" => &[19.0],
            "longitude" => &[72.8],
            "humidity" => &[35.0]
        )
        .unwrap();

        let (fused, report) = RecordFuser::default().fuse(&pollutants, &weather).unwrap();
        assert_eq!(report.strategy, JoinStrategy::Coordinates);
        assert_eq!(report.matched_rows, 1);
        assert_eq!(fused.column("humidity").unwrap().f64().unwrap().get(0), Some(35.0));
        assert_eq!(fused.column("location_id_w").unwrap().str().unwrap().get(0), Some("7"));
    }

    #[test]
    fn test_coordinate_tolerance() {
        let weather = df!(
            "latitude" => &[19.001],
            "longitude" => &[72.8],
            "temperature" => &[31.0]
        )
        .unwrap();
        let pollutants = pollutants().drop("location_id").unwrap();

        let exact = RecordFuser::default().fuse(&pollutants, &weather).unwrap().1;
        assert_eq!(exact.matched_rows, 0);

        let fuser = RecordFuser::new(JoinConfig::default().with_coordinate_tolerance_km(1.0));
        let (fused, report) = fuser.fuse(&pollutants, &weather).unwrap();
        assert_eq!(report.matched_rows, 1);
        assert_eq!(fused.column("temperature").unwrap().f64().unwrap().get(2), Some(31.0));
    }

    #[test]
    fn test_no_shared_key_does_not_raise() {
        let weather = df!("temperature" => &[20.0]).unwrap();
        let (fused, report) = RecordFuser::default().fuse(&pollutants(), &weather).unwrap();

        assert_eq!(report.strategy, JoinStrategy::Unavailable);
        assert_eq!(fused.height(), 4);
        for name in WEATHER_COLUMNS {
            let col = fused.column(name).unwrap();
            assert_eq!(col.null_count(), 4);
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // one degree of latitude is ~111 km on this sphere
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.13).abs() < 0.1);
    }
}
