//! Schema normalizer: canonical column names and encodings per source

use super::timestamp::{format_timestamp, parse_timestamp};
use crate::error::Result;
use crate::schema::{
    COORDINATES, LATITUDE, LOCATION_ID, LONGITUDE, PARAMETER, PARAMETER_ALIASES,
    POLLUTANT_TIMESTAMP_ALIASES, TIMESTAMP, WEATHER_TIMESTAMP_ALIASES,
};
use crate::utils::frame::{f64_column, f64_values, has_column, parse_f64, str_column, str_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which upstream source a table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pollutant,
    Weather,
    Geography,
}

impl SourceKind {
    /// Timestamp spellings accepted for this source, in precedence order.
    /// An already-canonical `timestamp` column is the last resort.
    fn timestamp_aliases(&self) -> Vec<&'static str> {
        let mut aliases = match self {
            SourceKind::Pollutant => POLLUTANT_TIMESTAMP_ALIASES.to_vec(),
            SourceKind::Weather => WEATHER_TIMESTAMP_ALIASES.to_vec(),
            SourceKind::Geography => Vec::new(),
        };
        aliases.push(TIMESTAMP);
        aliases
    }
}

/// What the normalizer had to degrade while rewriting a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Column the canonical timestamp was taken from
    pub timestamp_source: Option<String>,
    /// Non-blank timestamps that could not be parsed
    pub unparsable_timestamps: usize,
    /// Non-blank coordinate cells that could not be parsed
    pub unparsable_coordinates: usize,
}

/// Maps each source's column spellings onto the canonical schema.
///
/// Rewrites fields only; rows are never filtered here.
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Normalize a table from `source`
    pub fn normalize(df: &DataFrame, source: SourceKind) -> Result<(DataFrame, NormalizationReport)> {
        let mut out = df.clone();
        let mut report = NormalizationReport::default();

        if source != SourceKind::Geography {
            Self::canonical_timestamp(&mut out, source, &mut report)?;
        }
        if source == SourceKind::Pollutant {
            Self::canonical_parameter(&mut out)?;
        }
        Self::canonical_coordinates(&mut out, &mut report)?;
        Self::canonical_location_id(&mut out)?;

        debug!(
            ?source,
            timestamp_source = ?report.timestamp_source,
            bad_timestamps = report.unparsable_timestamps,
            bad_coordinates = report.unparsable_coordinates,
            "normalized schema"
        );
        Ok((out, report))
    }

    fn canonical_timestamp(
        df: &mut DataFrame,
        source: SourceKind,
        report: &mut NormalizationReport,
    ) -> Result<()> {
        let alias = source
            .timestamp_aliases()
            .into_iter()
            .find(|a| has_column(df, a));

        let values: Vec<Option<String>> = match alias {
            Some(alias) => {
                report.timestamp_source = Some(alias.to_string());
                str_values(df, alias)?
                    .into_iter()
                    .map(|raw| {
                        let raw = raw.filter(|s| !s.trim().is_empty())?;
                        let parsed = parse_timestamp(&raw);
                        if parsed.is_none() {
                            report.unparsable_timestamps += 1;
                        }
                        parsed.map(|dt| format_timestamp(&dt))
                    })
                    .collect()
            }
            None => vec![None; df.height()],
        };

        df.with_column(str_column(TIMESTAMP, values))?;
        Ok(())
    }

    fn canonical_parameter(df: &mut DataFrame) -> Result<()> {
        let Some(alias) = PARAMETER_ALIASES.iter().find(|a| has_column(df, a)) else {
            return Ok(());
        };

        let lowered = str_values(df, alias)?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_lowercase()))
            .collect();
        df.with_column(str_column(PARAMETER, lowered))?;
        Ok(())
    }

    fn canonical_coordinates(df: &mut DataFrame, report: &mut NormalizationReport) -> Result<()> {
        let has_pair = has_column(df, LATITUDE) && has_column(df, LONGITUDE);

        if !has_pair && has_column(df, COORDINATES) {
            let (lats, lons): (Vec<Option<f64>>, Vec<Option<f64>>) = str_values(df, COORDINATES)?
                .into_iter()
                .map(|raw| match raw.filter(|s| !s.trim().is_empty()) {
                    None => (None, None),
                    Some(raw) => parse_coordinates(&raw).unwrap_or_else(|| {
                        report.unparsable_coordinates += 1;
                        (None, None)
                    }),
                })
                .unzip();
            df.with_column(f64_column(LATITUDE, lats))?;
            df.with_column(f64_column(LONGITUDE, lons))?;
            return Ok(());
        }

        for name in [LATITUDE, LONGITUDE] {
            if !has_column(df, name) {
                continue;
            }
            let raw = str_values(df, name)?;
            let parsed = f64_values(df, name)?;
            report.unparsable_coordinates += raw
                .iter()
                .zip(&parsed)
                .filter(|(r, p)| r.as_deref().is_some_and(|s| !s.trim().is_empty()) && p.is_none())
                .count();
            df.with_column(f64_column(name, parsed))?;
        }
        Ok(())
    }

    fn canonical_location_id(df: &mut DataFrame) -> Result<()> {
        if !has_column(df, LOCATION_ID) {
            return Ok(());
        }
        let ids = str_values(df, LOCATION_ID)?
            .into_iter()
            .map(|v| v.as_deref().and_then(canonical_location_id))
            .collect();
        df.with_column(str_column(LOCATION_ID, ids))?;
        Ok(())
    }
}

/// Canonical text form of a location identity: integral numbers lose any
/// trailing `.0` so `101` and `101.0` compare equal.
pub fn canonical_location_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match parse_f64(trimmed) {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", v as i64)),
        _ => Some(trimmed.to_string()),
    }
}

/// Parse an embedded coordinate mapping such as
/// `{'latitude': 28.6, 'longitude': 77.2}` or its JSON equivalent.
pub fn parse_coordinates(raw: &str) -> Option<(Option<f64>, Option<f64>)> {
    let json = raw.replace('\'', "\"");
    let value: serde_json::Value = serde_json::from_str(&json).ok()?;
    let obj = value.as_object()?;

    let field = |keys: &[&str]| {
        keys.iter().find_map(|k| match obj.get(*k)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => parse_f64(s),
            _ => None,
        })
    };

    Some((field(&["latitude", "lat"]), field(&["longitude", "lon", "lng"])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollutant_timestamp_precedence() {
        let df = df!(
            "datetime" => &[Some("2024-01-01T05:00:00Z"), Some("garbage")],
            "fetched_timestamp" => &["2024-06-01T00:00:00Z", "2024-06-01T00:00:00Z"],
            "param" => &["PM25", "No2"],
            "value" => &[1.0, 2.0]
        )
        .unwrap();

        let (out, report) = SchemaNormalizer::normalize(&df, SourceKind::Pollutant).unwrap();
        let ts = out.column("timestamp").unwrap().str().unwrap();
        assert_eq!(ts.get(0), Some("2024-01-01T05:00:00Z"));
        assert_eq!(ts.get(1), None);
        assert_eq!(report.timestamp_source.as_deref(), Some("datetime"));
        assert_eq!(report.unparsable_timestamps, 1);

        let params = out.column("parameter").unwrap().str().unwrap();
        assert_eq!(params.get(0), Some("pm25"));
        assert_eq!(params.get(1), Some("no2"));
    }

    #[test]
    fn test_missing_timestamp_column_materializes_nulls() {
        let df = df!("temperature" => &[20.0, 21.0]).unwrap();
        let (out, report) = SchemaNormalizer::normalize(&df, SourceKind::Weather).unwrap();
        assert_eq!(out.column("timestamp").unwrap().null_count(), 2);
        assert!(report.timestamp_source.is_none());
    }

    #[test]
    fn test_embedded_coordinates_parse_defensively() {
        let df = df!(
            "coordinates" => &[
                Some("{'latitude': 28.6, 'longitude': 77.2}"),
                Some("{broken"),
                None,
            ],
            "api_timestamp" => &["2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"]
        )
        .unwrap();

        let (out, report) = SchemaNormalizer::normalize(&df, SourceKind::Weather).unwrap();
        let lat = out.column("latitude").unwrap().f64().unwrap();
        let lon = out.column("longitude").unwrap().f64().unwrap();
        assert_eq!(lat.get(0), Some(28.6));
        assert_eq!(lon.get(0), Some(77.2));
        assert_eq!(lat.get(1), None);
        assert_eq!(lat.get(2), None);
        assert_eq!(report.unparsable_coordinates, 1);
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn test_location_ids_compare_across_encodings() {
        assert_eq!(canonical_location_id("101"), Some("101".to_string()));
        assert_eq!(canonical_location_id("101.0"), Some("101".to_string()));
        assert_eq!(canonical_location_id(" station-7 "), Some("station-7".to_string()));
        assert_eq!(canonical_location_id("  "), None);
    }
}
