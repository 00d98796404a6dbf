//! Batch rebalancing policy and label distribution

use super::rules::SourceLabel;
use crate::error::{AirfuseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label counts over one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub total: usize,
    pub counts: BTreeMap<SourceLabel, usize>,
}

impl LabelDistribution {
    pub fn from_labels(labels: &[SourceLabel]) -> Self {
        let mut counts = BTreeMap::new();
        for label in labels {
            *counts.entry(*label).or_insert(0) += 1;
        }
        Self {
            total: labels.len(),
            counts,
        }
    }

    pub fn count(&self, label: SourceLabel) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Share of `label` in the batch; 0 for an empty batch
    pub fn fraction(&self, label: SourceLabel) -> f64 {
        self.count(label) as f64 / self.total.max(1) as f64
    }

    /// Number of labels with at least one row
    pub fn distinct(&self) -> usize {
        self.counts.values().filter(|&&c| c > 0).count()
    }

    /// Fractions per label in priority order, for reporting
    pub fn fractions(&self) -> BTreeMap<SourceLabel, f64> {
        self.counts.keys().map(|l| (*l, self.fraction(*l))).collect()
    }
}

/// Batch-level fallback triggered when `Natural` dominates.
///
/// When triggered, the rule engine is re-applied to every row. The rules are
/// deterministic, so a triggered run yields the same labels on every run
/// over the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancePolicy {
    pub enabled: bool,
    /// `Natural` fraction above which the policy fires
    pub natural_threshold: f64,
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            natural_threshold: 0.9,
        }
    }
}

impl RebalancePolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.natural_threshold) {
            return Err(AirfuseError::InvalidParameter {
                name: "natural_threshold".to_string(),
                value: self.natural_threshold.to_string(),
                reason: "must be a fraction in [0, 1]".to_string(),
            });
        }
        Ok(())
    }

    /// Strictly greater than the threshold triggers
    pub fn should_rebalance(&self, distribution: &LabelDistribution) -> bool {
        self.enabled
            && distribution.total > 0
            && distribution.fraction(SourceLabel::Natural) > self.natural_threshold
    }
}
