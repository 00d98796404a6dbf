//! Rule-based pollution source labeling
//!
//! Each row of the fused table gets exactly one `pollution_source` label.
//! Predicates run over [`SourceEvidence`]; when several fire, the label
//! earliest in [`SourceLabel::PRIORITY`] wins. A batch-level
//! [`RebalancePolicy`] decides whether the label column is recomputed.

mod policy;
mod rules;

pub use policy::{LabelDistribution, RebalancePolicy};
pub use rules::{has_rule_proximity, RuleThresholds, SourceEvidence, SourceLabel};

use crate::error::Result;
use crate::schema::{LATITUDE, LONGITUDE, POLLUTION_SOURCE};
use crate::utils::frame::{f64_values, filter_rows, has_column, str_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Labeling configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub thresholds: RuleThresholds,
    pub rebalance: RebalancePolicy,
}

impl LabelingConfig {
    /// Builder method to set rule thresholds
    pub fn with_thresholds(mut self, thresholds: RuleThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Builder method to set the rebalancing policy
    pub fn with_rebalance(mut self, rebalance: RebalancePolicy) -> Self {
        self.rebalance = rebalance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.rebalance.validate()
    }
}

/// Summary of one labeling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelingOutcome {
    pub input_rows: usize,
    /// Rows dropped for missing coordinates
    pub dropped_rows: usize,
    pub distribution: LabelDistribution,
    pub rebalanced: bool,
    /// Whether any rule-relevant distance column was present
    pub proximity_available: bool,
}

/// Applies the source rules to rows
#[derive(Debug, Clone, Default)]
pub struct SourceLabelEngine {
    config: LabelingConfig,
}

impl SourceLabelEngine {
    pub fn new(config: LabelingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelingConfig {
        &self.config
    }

    /// Every label whose predicate fires, in priority order. Always non-empty;
    /// `[Natural]` when nothing else fires.
    pub fn matched(&self, evidence: &SourceEvidence) -> Vec<SourceLabel> {
        SourceLabel::PRIORITY
            .into_iter()
            .filter(|label| evidence.satisfies(*label, &self.config.thresholds))
            .collect()
    }

    /// Highest-priority label for one row
    pub fn label(&self, evidence: &SourceEvidence) -> SourceLabel {
        SourceLabel::PRIORITY
            .into_iter()
            .find(|label| evidence.satisfies(*label, &self.config.thresholds))
            .unwrap_or(SourceLabel::Natural)
    }

    pub fn label_all(&self, evidence: &[SourceEvidence]) -> Vec<SourceLabel> {
        evidence.iter().map(|e| self.label(e)).collect()
    }

    /// Label a fused table. Rows without coordinates are dropped first; the
    /// result carries a `pollution_source` column.
    pub fn label_frame(&self, df: &DataFrame) -> Result<(DataFrame, LabelingOutcome)> {
        self.config.validate()?;

        let input_rows = df.height();
        let frame = drop_missing_coordinates(df)?;
        let dropped_rows = input_rows - frame.height();
        if dropped_rows > 0 {
            info!(dropped_rows, "dropped rows without coordinates before labeling");
        }

        let proximity_available = has_rule_proximity(&frame);
        if !proximity_available {
            debug!("no rule distance columns present; only Burning and Natural can fire");
        }

        let evidence = SourceEvidence::from_frame(&frame)?;
        let mut labels = self.label_all(&evidence);
        let mut distribution = LabelDistribution::from_labels(&labels);
        info!(counts = ?distribution.counts, "applied source rules");

        let rebalanced = self.config.rebalance.should_rebalance(&distribution);
        if rebalanced {
            info!(
                natural_fraction = distribution.fraction(SourceLabel::Natural),
                threshold = self.config.rebalance.natural_threshold,
                "natural labels dominate; re-applying rules as batch policy"
            );
            labels = self.label_all(&evidence);
            distribution = LabelDistribution::from_labels(&labels);
        }

        if distribution.total > 0 && distribution.distinct() < 2 {
            warn!(
                counts = ?distribution.counts,
                "only one pollution source class present; supervised training needs at least two"
            );
        }

        let column = labels.iter().map(|l| Some(l.as_str().to_string())).collect();
        let mut out = frame;
        out.with_column(str_column(POLLUTION_SOURCE, column))?;

        Ok((
            out,
            LabelingOutcome {
                input_rows,
                dropped_rows,
                distribution,
                rebalanced,
                proximity_available,
            },
        ))
    }
}

fn drop_missing_coordinates(df: &DataFrame) -> Result<DataFrame> {
    if !has_column(df, LATITUDE) || !has_column(df, LONGITUDE) {
        return Ok(df.clone());
    }
    let lat = f64_values(df, LATITUDE)?;
    let lon = f64_values(df, LONGITUDE)?;
    let keep: Vec<bool> = lat.iter().zip(&lon).map(|(a, b)| a.is_some() && b.is_some()).collect();
    if keep.iter().all(|k| *k) {
        return Ok(df.clone());
    }
    filter_rows(df, &keep)
}
