//! Calendar features derived from the canonical timestamp

use crate::cleaning::timestamps;
use crate::error::Result;
use crate::schema::{DAY_OF_WEEK, HOUR, MONTH, SEASON};
use crate::utils::frame::{i32_column, str_column};
use chrono::{Datelike, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Meteorological season (northern hemisphere)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Season of a calendar month; `None` outside 1..=12
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Autumn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "autumn" | "fall" => Ok(Season::Autumn),
            other => Err(format!("unknown season: {other}")),
        }
    }
}

/// Appends `hour`, `dayofweek`, `month` and `season`
pub struct TemporalFeatureDeriver;

impl TemporalFeatureDeriver {
    /// Derive calendar columns. Rows without a timestamp get nulls in all four.
    /// `dayofweek` counts from Monday = 0.
    pub fn derive(df: &DataFrame) -> Result<DataFrame> {
        let times = timestamps(df)?;

        let hours = times.iter().map(|t| t.map(|t| t.hour() as i32)).collect();
        let weekdays = times
            .iter()
            .map(|t| t.map(|t| t.weekday().num_days_from_monday() as i32))
            .collect();
        let months: Vec<Option<i32>> = times.iter().map(|t| t.map(|t| t.month() as i32)).collect();
        let seasons = months
            .iter()
            .map(|m| {
                m.and_then(|m| u32::try_from(m).ok())
                    .and_then(Season::from_month)
                    .map(|s| s.as_str().to_string())
            })
            .collect();

        let mut out = df.clone();
        out.with_column(i32_column(HOUR, hours))?;
        out.with_column(i32_column(DAY_OF_WEEK, weekdays))?;
        out.with_column(i32_column(MONTH, months))?;
        out.with_column(str_column(SEASON, seasons))?;

        info!(
            rows = out.height(),
            missing_timestamps = times.iter().filter(|t| t.is_none()).count(),
            "derived temporal features"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_totality() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (4, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (7, Season::Summer),
            (8, Season::Summer),
            (9, Season::Autumn),
            (10, Season::Autumn),
            (11, Season::Autumn),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), Some(season), "month {month}");
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_derive_calendar_fields() {
        // 2024-07-15 is a Monday
        let df = df!(
            "timestamp" => &[Some("2024-07-15T13:30:00Z"), None, Some("2024-12-01T00:00:00Z")]
        )
        .unwrap();

        let out = TemporalFeatureDeriver::derive(&df).unwrap();

        let hour = out.column("hour").unwrap().i32().unwrap();
        assert_eq!(hour.get(0), Some(13));
        assert_eq!(hour.get(1), None);
        let dow = out.column("dayofweek").unwrap().i32().unwrap();
        assert_eq!(dow.get(0), Some(0));
        assert_eq!(dow.get(2), Some(6));
        let season = out.column("season").unwrap().str().unwrap();
        assert_eq!(season.get(0), Some("summer"));
        assert_eq!(season.get(1), None);
        assert_eq!(season.get(2), Some("winter"));
    }

    #[test]
    fn test_missing_timestamp_column_yields_nulls() {
        let df = df!("pm25" => &[1.0, 2.0]).unwrap();
        let out = TemporalFeatureDeriver::derive(&df).unwrap();
        assert_eq!(out.column("month").unwrap().null_count(), 2);
        assert_eq!(out.column("season").unwrap().null_count(), 2);
    }
}
