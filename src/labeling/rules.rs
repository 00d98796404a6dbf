//! Source labels, rule thresholds and the per-row evidence the rules read

use crate::cleaning::timestamps;
use crate::error::{AirfuseError, Result};
use crate::features::Season;
use crate::schema::{proximity_column, HUMIDITY, SEASON};
use crate::utils::frame::{f64_values, has_column, str_values};
use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pollution source classes, declared in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceLabel {
    Industrial,
    Vehicular,
    Agricultural,
    Burning,
    Natural,
}

impl SourceLabel {
    /// Tie-break order: the first matching label wins
    pub const PRIORITY: [SourceLabel; 5] = [
        SourceLabel::Industrial,
        SourceLabel::Vehicular,
        SourceLabel::Agricultural,
        SourceLabel::Burning,
        SourceLabel::Natural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLabel::Industrial => "Industrial",
            SourceLabel::Vehicular => "Vehicular",
            SourceLabel::Agricultural => "Agricultural",
            SourceLabel::Burning => "Burning",
            SourceLabel::Natural => "Natural",
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SourceLabel::PRIORITY
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown pollution source: {s}"))
    }
}

/// Rule thresholds. Concentrations in µg/m³, distances in km, humidity in %.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub no2_high: f64,
    pub so2_high: f64,
    pub pm_high: f64,
    pub humidity_low: f64,
    pub road_km: f64,
    pub industrial_km: f64,
    pub agricultural_km: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            no2_high: 80.0,
            so2_high: 50.0,
            pm_high: 100.0,
            humidity_low: 40.0,
            road_km: 0.5,
            industrial_km: 1.0,
            agricultural_km: 1.0,
        }
    }
}

impl RuleThresholds {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("no2_high", self.no2_high),
            ("so2_high", self.so2_high),
            ("pm_high", self.pm_high),
            ("humidity_low", self.humidity_low),
            ("road_km", self.road_km),
            ("industrial_km", self.industrial_km),
            ("agricultural_km", self.agricultural_km),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(AirfuseError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be a finite non-negative number".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Inputs the rule predicates read for one row. `None` means the value is
/// missing or its column is absent; either way the predicate reading it is false.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceEvidence {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub humidity: Option<f64>,
    pub season: Option<Season>,
    pub roads_km: Option<f64>,
    pub industrial_km: Option<f64>,
    pub agricultural_km: Option<f64>,
}

impl SourceEvidence {
    /// Extract evidence for every row of a fused table
    pub fn from_frame(df: &DataFrame) -> Result<Vec<SourceEvidence>> {
        let n = df.height();
        let pm25 = optional_f64(df, "pm25")?;
        let pm10 = optional_f64(df, "pm10")?;
        let no2 = optional_f64(df, "no2")?;
        let so2 = optional_f64(df, "so2")?;
        let humidity = optional_f64(df, HUMIDITY)?;
        let roads = optional_f64(df, &proximity_column("roads"))?;
        let industrial = optional_f64(df, &proximity_column("industrial_zones"))?;
        let agricultural = optional_f64(df, &proximity_column("agricultural_fields"))?;
        let seasons = seasons(df)?;

        Ok((0..n)
            .map(|i| SourceEvidence {
                pm25: pm25[i],
                pm10: pm10[i],
                no2: no2[i],
                so2: so2[i],
                humidity: humidity[i],
                season: seasons[i],
                roads_km: roads[i],
                industrial_km: industrial[i],
                agricultural_km: agricultural[i],
            })
            .collect())
    }

    fn high_particulates(&self, t: &RuleThresholds) -> bool {
        at_least(self.pm25, t.pm_high) || at_least(self.pm10, t.pm_high)
    }

    /// Whether the predicate for `label` fires. `Natural` fires only when
    /// no other predicate does.
    pub fn satisfies(&self, label: SourceLabel, t: &RuleThresholds) -> bool {
        match label {
            SourceLabel::Vehicular => below(self.roads_km, t.road_km) && at_least(self.no2, t.no2_high),
            SourceLabel::Industrial => below(self.industrial_km, t.industrial_km) && at_least(self.so2, t.so2_high),
            SourceLabel::Agricultural => {
                below(self.agricultural_km, t.agricultural_km)
                    && matches!(self.season, Some(Season::Summer | Season::Autumn))
                    && self.high_particulates(t)
            }
            SourceLabel::Burning => self.high_particulates(t) && below(self.humidity, t.humidity_low),
            SourceLabel::Natural => SourceLabel::PRIORITY[..4].iter().all(|l| !self.satisfies(*l, t)),
        }
    }
}

fn at_least(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v >= threshold)
}

fn below(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v < threshold)
}

fn optional_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if has_column(df, name) {
        f64_values(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

/// Season per row from the `season` column, or from the timestamp when the
/// table has no season column
fn seasons(df: &DataFrame) -> Result<Vec<Option<Season>>> {
    if has_column(df, SEASON) {
        return Ok(str_values(df, SEASON)?
            .into_iter()
            .map(|s| s.and_then(|s| s.parse().ok()))
            .collect());
    }
    Ok(timestamps(df)?
        .into_iter()
        .map(|t| t.and_then(|t| Season::from_month(t.month())))
        .collect())
}

/// True when the table carries any of the distance columns the rules read
pub fn has_rule_proximity(df: &DataFrame) -> bool {
    ["roads", "industrial_zones", "agricultural_fields"]
        .iter()
        .any(|f| has_column(df, &proximity_column(f)))
}
