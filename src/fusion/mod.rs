//! Record fusion
//!
//! - Weather join with an identity/coordinate strategy selector
//! - Static proximity features from the geographic summary

mod join;
mod proximity;

pub use join::{haversine_km, FusionReport, JoinConfig, JoinStrategy, RecordFuser, EARTH_RADIUS_KM};
pub use proximity::{ProximityMerger, ProximityStatus};
