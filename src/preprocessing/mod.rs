//! Batch preprocessing of the fused table
//!
//! Provides:
//! - Min-max scaling into `<col>_norm` companion columns
//! - Data quality scoring (completeness, uniqueness, physical validity)

mod config;
mod quality;
mod scaler;

pub use config::{DegenerateRange, NormalizationConfig};
pub use quality::{ColumnQuality, ColumnStatistics, DataQualityReport, DataQualityScorer, QualityWarning};
pub use scaler::{MinMaxParams, MinMaxScaler};
