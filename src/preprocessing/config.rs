//! Normalization configuration

use serde::{Deserialize, Serialize};

/// What a `_norm` column holds when its source column has zero range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateRange {
    /// Every present value maps to 0.0
    Zero,
    /// Every present value maps to NaN
    Nan,
}

/// Configuration for the min-max normalizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Policy for constant columns
    pub degenerate_range: DegenerateRange,

    /// Explicit column list; `None` uses every default candidate present
    pub columns: Option<Vec<String>>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            degenerate_range: DegenerateRange::Zero,
            columns: None,
        }
    }
}

impl NormalizationConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the constant-column policy
    pub fn with_degenerate_range(mut self, policy: DegenerateRange) -> Self {
        self.degenerate_range = policy;
        self
    }

    /// Builder method to restrict normalization to the given columns
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NormalizationConfig::default();
        assert_eq!(config.degenerate_range, DegenerateRange::Zero);
        assert!(config.columns.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = NormalizationConfig::new()
            .with_degenerate_range(DegenerateRange::Nan)
            .with_columns(vec!["pm25".to_string()]);

        assert_eq!(config.degenerate_range, DegenerateRange::Nan);
        assert_eq!(config.columns.as_deref(), Some(&["pm25".to_string()][..]));
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&DegenerateRange::Nan).unwrap();
        assert_eq!(json, "\"nan\"");
    }
}
