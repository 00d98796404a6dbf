//! Run report: per-stage accounting and recoverable warnings

use crate::cleaning::{NormalizationReport, PivotReport, WeatherCleaningReport};
use crate::fusion::{FusionReport, ProximityStatus};
use crate::imputation::ImputationReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A degradation the run recovered from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Optional input absent, unreadable or unmatched
    SkippedOptionalInput { role: String, reason: String },
    /// Cells that could not be parsed and were nulled
    ParseFailure { source: String, field: String, count: usize },
    /// Column with no usable statistic; still emitted
    DegenerateStatistic { column: String, reason: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::SkippedOptionalInput { role, reason } => {
                write!(f, "skipped optional {role} input: {reason}")
            }
            PipelineWarning::ParseFailure { source, field, count } => {
                write!(f, "{count} unparsable {field} value(s) in {source} input set to null")
            }
            PipelineWarning::DegenerateStatistic { column, reason } => {
                write!(f, "degenerate column {column}: {reason}")
            }
        }
    }
}

/// Wall-clock duration of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub millis: f64,
}

/// Everything a fusion run measured along the way
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pollutant_normalization: NormalizationReport,
    pub weather_normalization: NormalizationReport,
    pub pivot: PivotReport,
    pub weather_cleaning: WeatherCleaningReport,
    pub fusion: Option<FusionReport>,
    pub proximity: Option<ProximityStatus>,
    pub imputation: ImputationReport,
    pub warnings: Vec<PipelineWarning>,
    pub timings: Vec<StageTiming>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            pollutant_normalization: NormalizationReport::default(),
            weather_normalization: NormalizationReport::default(),
            pivot: PivotReport::default(),
            weather_cleaning: WeatherCleaningReport::default(),
            fusion: None,
            proximity: None,
            imputation: ImputationReport::default(),
            warnings: Vec::new(),
            timings: Vec::new(),
        }
    }
}

impl RunReport {
    /// Record a warning and emit it through `tracing`
    pub fn warn(&mut self, warning: PipelineWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Record parse failures from one source's normalization
    pub fn record_parse_failures(&mut self, source: &str, report: &NormalizationReport) {
        if report.unparsable_timestamps > 0 {
            self.warn(PipelineWarning::ParseFailure {
                source: source.to_string(),
                field: "timestamp".to_string(),
                count: report.unparsable_timestamps,
            });
        }
        if report.unparsable_coordinates > 0 {
            self.warn(PipelineWarning::ParseFailure {
                source: source.to_string(),
                field: "coordinates".to_string(),
                count: report.unparsable_coordinates,
            });
        }
    }

    pub fn time(&mut self, stage: &str, millis: f64) {
        self.timings.push(StageTiming {
            stage: stage.to_string(),
            millis,
        });
    }

    pub fn total_millis(&self) -> f64 {
        self.timings.iter().map(|t| t.millis).sum()
    }
}
