//! Proximity feature merger: static nearest-feature distances per location

use crate::error::Result;
use crate::schema::{proximity_column, LOCATION_ID, PROXIMITY_SOURCE_SUFFIX};
use crate::utils::frame::{column_names, f64_column, f64_values, has_column, str_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Whether proximity columns made it into the fused table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProximityStatus {
    Merged {
        /// Feature kinds merged, e.g. `roads`
        features: Vec<String>,
        /// Distinct fused locations found in the summary
        matched_locations: usize,
    },
    Skipped {
        reason: String,
    },
}

impl ProximityStatus {
    fn skipped(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        info!(%reason, "proximity features skipped");
        ProximityStatus::Skipped { reason }
    }
}

/// Attaches `<feature>_dist_km` columns from the geographic summary.
///
/// When the summary is absent or shares no location with the fused table the
/// columns are omitted entirely rather than null-filled.
pub struct ProximityMerger;

impl ProximityMerger {
    /// Merge `geography` (normalized summary) into `fused`
    pub fn merge(fused: &DataFrame, geography: Option<&DataFrame>) -> Result<(DataFrame, ProximityStatus)> {
        let Some(geo) = geography else {
            return Ok((fused.clone(), ProximityStatus::skipped("no geographic summary")));
        };
        if !has_column(geo, LOCATION_ID) || !has_column(fused, LOCATION_ID) {
            return Ok((
                fused.clone(),
                ProximityStatus::skipped("geographic summary has no location_id to merge on"),
            ));
        }

        let sources: Vec<(String, String)> = column_names(geo)
            .into_iter()
            .filter_map(|col| {
                let feature = col.strip_suffix(PROXIMITY_SOURCE_SUFFIX)?.to_string();
                (!feature.is_empty()).then_some((feature, col))
            })
            .collect();
        if sources.is_empty() {
            return Ok((
                fused.clone(),
                ProximityStatus::skipped(format!("geographic summary has no *{PROXIMITY_SOURCE_SUFFIX} columns")),
            ));
        }

        // first row wins for repeated locations
        let mut index: HashMap<String, usize> = HashMap::new();
        for (row, id) in str_values(geo, LOCATION_ID)?.into_iter().enumerate() {
            if let Some(id) = id {
                index.entry(id).or_insert(row);
            }
        }

        let fused_ids = str_values(fused, LOCATION_ID)?;
        let mapping: Vec<Option<usize>> = fused_ids
            .iter()
            .map(|id| id.as_ref().and_then(|id| index.get(id).copied()))
            .collect();
        let matched_locations = fused_ids
            .iter()
            .zip(&mapping)
            .filter_map(|(id, m)| m.and(id.as_deref()))
            .collect::<HashSet<_>>()
            .len();

        if matched_locations == 0 {
            return Ok((
                fused.clone(),
                ProximityStatus::skipped("no location_id in common with the geographic summary"),
            ));
        }

        let mut out = fused.clone();
        let mut features = Vec::with_capacity(sources.len());
        for (feature, source) in sources {
            let distances = f64_values(geo, &source)?;
            let gathered = mapping.iter().map(|m| m.and_then(|row| distances[row])).collect();
            out.with_column(f64_column(&proximity_column(&feature), gathered))?;
            features.push(feature);
        }

        info!(features = ?features, matched_locations, "merged proximity features");
        Ok((out, ProximityStatus::Merged { features, matched_locations }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fused() -> DataFrame {
        df!(
            "location_id" => &["1", "1", "2"],
            "pm25" => &[1.0, 2.0, 3.0]
        )
        .unwrap()
    }

    #[test]
    fn test_merge_renames_and_first_wins() {
        let geo = df!(
            "location_id" => &["1", "1"],
            "roads_closest_km" => &[0.2, 9.9],
            "industrial_zones_closest_km" => &[Some(0.8), None],
            "roads_count" => &[3.0, 4.0]
        )
        .unwrap();

        let (out, status) = ProximityMerger::merge(&fused(), Some(&geo)).unwrap();

        let roads = out.column("roads_dist_km").unwrap().f64().unwrap();
        assert_eq!(roads.get(0), Some(0.2));
        assert_eq!(roads.get(1), Some(0.2));
        assert_eq!(roads.get(2), None);
        assert!(out.column("industrial_zones_dist_km").is_ok());
        assert!(out.column("roads_count").is_err());
        assert_eq!(
            status,
            ProximityStatus::Merged {
                features: vec!["roads".to_string(), "industrial_zones".to_string()],
                matched_locations: 1,
            }
        );
    }

    #[test]
    fn test_absent_summary_omits_columns() {
        let (out, status) = ProximityMerger::merge(&fused(), None).unwrap();
        assert_eq!(out.width(), 2);
        assert!(matches!(status, ProximityStatus::Skipped { .. }));
    }

    #[test]
    fn test_unmatched_summary_omits_columns() {
        let geo = df!(
            "location_id" => &["99"],
            "roads_closest_km" => &[0.1]
        )
        .unwrap();
        let (out, status) = ProximityMerger::merge(&fused(), Some(&geo)).unwrap();
        assert!(out.column("roads_dist_km").is_err());
        assert!(matches!(status, ProximityStatus::Skipped { .. }));
    }
}
