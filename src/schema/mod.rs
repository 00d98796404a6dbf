//! Canonical column vocabulary and the schema descriptor
//!
//! Every stage refers to columns through the constants defined here so the
//! pipeline has a single canonical schema regardless of how the upstream
//! sources spell their fields.

mod descriptor;

pub use descriptor::{ColumnDescriptor, SchemaDescriptor, SemanticType};
pub(crate) use descriptor::is_numeric_dtype;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const LOCATION_ID: &str = "location_id";
pub const LOCATION_NAME: &str = "location_name";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const COORDINATES: &str = "coordinates";
pub const TIMESTAMP: &str = "timestamp";
pub const PARAMETER: &str = "parameter";
pub const VALUE: &str = "value";

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const WIND_SPEED: &str = "wind_speed";
pub const WIND_DIRECTION: &str = "wind_direction";

pub const HOUR: &str = "hour";
pub const DAY_OF_WEEK: &str = "dayofweek";
pub const MONTH: &str = "month";
pub const SEASON: &str = "season";

pub const POLLUTION_SOURCE: &str = "pollution_source";

/// Source-side timestamp spellings for pollutant tables, in precedence order
pub const POLLUTANT_TIMESTAMP_ALIASES: [&str; 3] = ["datetime", "date.utc", "fetched_timestamp"];

/// Source-side timestamp spellings for weather tables, in precedence order
pub const WEATHER_TIMESTAMP_ALIASES: [&str; 2] = ["api_timestamp", "fetched_timestamp"];

/// Source-side spellings of the pollutant identifier
pub const PARAMETER_ALIASES: [&str; 2] = ["parameter", "param"];

/// Weather attributes every fused table carries
pub const WEATHER_COLUMNS: [&str; 4] = [TEMPERATURE, HUMIDITY, WIND_SPEED, WIND_DIRECTION];

/// Columns filled by the imputation engine
pub const IMPUTE_COLUMNS: [&str; 9] = [
    "pm25", "pm10", "no2", "co", "so2", "o3", TEMPERATURE, HUMIDITY, WIND_SPEED,
];

/// Columns offered to the normalizer
pub const NORMALIZE_COLUMNS: [&str; 9] = IMPUTE_COLUMNS;

/// Suffix of distance columns in the geographic summary
pub const PROXIMITY_SOURCE_SUFFIX: &str = "_closest_km";

/// Suffix of distance columns in the fused table
pub const PROXIMITY_SUFFIX: &str = "_dist_km";

/// Suffix of min-max scaled companion columns
pub const NORM_SUFFIX: &str = "_norm";

/// Suffix given to weather columns that collide with pollutant columns
pub const WEATHER_COLLISION_SUFFIX: &str = "_w";

/// Geographic feature kinds the extraction collaborator produces
pub const PROXIMITY_FEATURES: [&str; 6] = [
    "roads",
    "industrial_zones",
    "dump_sites",
    "agricultural_fields",
    "water_bodies",
    "green_spaces",
];

/// Fused-table distance column for a geographic feature kind
pub fn proximity_column(feature: &str) -> String {
    format!("{feature}{PROXIMITY_SUFFIX}")
}

/// Companion column name for a normalized column
pub fn norm_column(column: &str) -> String {
    format!("{column}{NORM_SUFFIX}")
}

/// Target pollutants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollutantKind {
    Pm25,
    Pm10,
    No2,
    Co,
    So2,
    O3,
}

impl PollutantKind {
    /// All target pollutants in output column order
    pub const ALL: [PollutantKind; 6] = [
        PollutantKind::Pm25,
        PollutantKind::Pm10,
        PollutantKind::No2,
        PollutantKind::Co,
        PollutantKind::So2,
        PollutantKind::O3,
    ];

    /// Canonical column name
    pub fn as_str(&self) -> &'static str {
        match self {
            PollutantKind::Pm25 => "pm25",
            PollutantKind::Pm10 => "pm10",
            PollutantKind::No2 => "no2",
            PollutantKind::Co => "co",
            PollutantKind::So2 => "so2",
            PollutantKind::O3 => "o3",
        }
    }

    /// Position in [`PollutantKind::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for PollutantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollutantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pm25" => Ok(PollutantKind::Pm25),
            "pm10" => Ok(PollutantKind::Pm10),
            "no2" => Ok(PollutantKind::No2),
            "co" => Ok(PollutantKind::Co),
            "so2" => Ok(PollutantKind::So2),
            "o3" => Ok(PollutantKind::O3),
            other => Err(format!("unknown pollutant: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollutant_round_trip_names() {
        for kind in PollutantKind::ALL {
            assert_eq!(kind.as_str().parse::<PollutantKind>().unwrap(), kind);
            assert_eq!(PollutantKind::ALL[kind.index()], kind);
        }
        assert_eq!("PM25".parse::<PollutantKind>().unwrap(), PollutantKind::Pm25);
        assert!("bc".parse::<PollutantKind>().is_err());
    }

    #[test]
    fn test_derived_column_names() {
        assert_eq!(proximity_column("roads"), "roads_dist_km");
        assert_eq!(norm_column("pm25"), "pm25_norm");
    }
}
