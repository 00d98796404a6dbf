//! Pipeline configuration

use crate::error::{AirfuseError, Result};
use crate::fusion::JoinConfig;
use crate::imputation::ImputationConfig;
use crate::labeling::LabelingConfig;
use crate::preprocessing::NormalizationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input and output locations. File names resolve against `data_dir`
/// (inputs) and `output_dir` (outputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pollutant_file: String,
    pub weather_file: String,
    pub geography_file: String,
    pub processed_file: String,
    pub normalized_file: String,
    pub manifest_file: String,
    pub quality_file: String,
    pub labeled_file: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            pollutant_file: "openaq_air_quality_data.csv".to_string(),
            weather_file: "weather_data_enhanced.csv".to_string(),
            geography_file: "geographic_features_summary.csv".to_string(),
            processed_file: "processed_data.csv".to_string(),
            normalized_file: "processed_data_normalized.csv".to_string(),
            manifest_file: "feature_list.json".to_string(),
            quality_file: "quality_report.json".to_string(),
            labeled_file: "labeled_data.csv".to_string(),
        }
    }
}

impl DataPaths {
    /// Inputs and outputs both under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            data_dir: dir.clone(),
            output_dir: dir,
            ..Default::default()
        }
    }

    pub fn pollutants(&self) -> PathBuf {
        self.data_dir.join(&self.pollutant_file)
    }

    pub fn weather(&self) -> PathBuf {
        self.data_dir.join(&self.weather_file)
    }

    pub fn geography(&self) -> PathBuf {
        self.data_dir.join(&self.geography_file)
    }

    pub fn processed(&self) -> PathBuf {
        self.output_dir.join(&self.processed_file)
    }

    pub fn normalized(&self) -> PathBuf {
        self.output_dir.join(&self.normalized_file)
    }

    pub fn manifest(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_file)
    }

    pub fn quality(&self) -> PathBuf {
        self.output_dir.join(&self.quality_file)
    }

    pub fn labeled(&self) -> PathBuf {
        self.output_dir.join(&self.labeled_file)
    }
}

/// Configuration for a full fusion and labeling run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: DataPaths,
    pub join: JoinConfig,
    pub imputation: ImputationConfig,
    pub normalization: NormalizationConfig,
    pub labeling: LabelingConfig,
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file; omitted sections take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)
            .map_err(|e| AirfuseError::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_paths(mut self, paths: DataPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.data_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.output_dir = dir.into();
        self
    }

    pub fn with_join(mut self, join: JoinConfig) -> Self {
        self.join = join;
        self
    }

    pub fn with_imputation(mut self, imputation: ImputationConfig) -> Self {
        self.imputation = imputation;
        self
    }

    pub fn with_normalization(mut self, normalization: NormalizationConfig) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_labeling(mut self, labeling: LabelingConfig) -> Self {
        self.labeling = labeling;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.join.validate()?;
        self.imputation.validate()?;
        self.labeling.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::DegenerateRange;
    use std::io::Write;

    #[test]
    fn test_default_paths() {
        let paths = DataPaths::in_dir("/tmp/run");
        assert_eq!(paths.pollutants(), PathBuf::from("/tmp/run/openaq_air_quality_data.csv"));
        assert_eq!(paths.labeled(), PathBuf::from("/tmp/run/labeled_data.csv"));
    }

    #[test]
    fn test_partial_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"join": {{"coordinate_tolerance_km": 2.5}}, "normalization": {{"degenerate_range": "nan"}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.join.coordinate_tolerance_km, 2.5);
        assert_eq!(config.normalization.degenerate_range, DegenerateRange::Nan);
        assert_eq!(config.imputation.min_points, 2);
        assert_eq!(config.paths, DataPaths::default());
    }

    #[test]
    fn test_invalid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"join": {{"coordinate_tolerance_km": -1.0}}}}"#).unwrap();
        assert!(PipelineConfig::from_json_file(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(file.path()),
            Err(AirfuseError::ConfigError(_))
        ));
    }
}
