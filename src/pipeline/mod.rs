//! End-to-end orchestration
//!
//! [`FusionPipeline`] turns the three source tables into the fused table, its
//! normalized twin, the feature manifest and a quality report.
//! [`LabelingStage`] consumes the fused table and adds `pollution_source`.

mod config;
mod manifest;
mod report;

pub use config::{DataPaths, PipelineConfig};
pub use manifest::{FeatureManifest, ManifestColumn};
pub use report::{PipelineWarning, RunReport, StageTiming};

use crate::cleaning::{clean_weather, PollutantPivoter, SchemaNormalizer, SourceKind};
use crate::error::Result;
use crate::features::TemporalFeatureDeriver;
use crate::fusion::{ProximityMerger, ProximityStatus, RecordFuser};
use crate::imputation::ImputationEngine;
use crate::labeling::{LabelingOutcome, SourceLabelEngine};
use crate::preprocessing::{DataQualityReport, DataQualityScorer, MinMaxScaler};
use crate::schema::SchemaDescriptor;
use crate::utils::{DataLoader, DataSaver, Timer};
use polars::prelude::*;
use tracing::info;

/// Raw source tables for one run
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub measurements: DataFrame,
    pub weather: DataFrame,
    pub geography: Option<DataFrame>,
}

/// Everything a fusion run produces
#[derive(Debug, Clone)]
pub struct FusionOutput {
    pub processed: DataFrame,
    pub normalized: DataFrame,
    pub schema: SchemaDescriptor,
    pub manifest: FeatureManifest,
    pub quality: DataQualityReport,
    pub report: RunReport,
}

/// Source tables to fused, feature-complete table
pub struct FusionPipeline {
    config: PipelineConfig,
}

impl Default for FusionPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl FusionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured inputs. Pollutant and weather tables are required;
    /// the geographic summary is optional.
    pub fn load_inputs(&self) -> Result<PipelineInputs> {
        let loader = DataLoader::new();
        let paths = &self.config.paths;
        Ok(PipelineInputs {
            measurements: loader.load_required(&paths.pollutants(), "pollutant")?,
            weather: loader.load_required(&paths.weather(), "weather")?,
            geography: loader.load_optional(&paths.geography(), "geography")?,
        })
    }

    /// Run every fusion stage over in-memory tables
    pub fn run(&self, inputs: PipelineInputs) -> Result<FusionOutput> {
        self.config.validate()?;
        let mut report = RunReport::default();

        let timer = Timer::start();
        let (measurements, norm) = SchemaNormalizer::normalize(&inputs.measurements, SourceKind::Pollutant)?;
        report.record_parse_failures("pollutant", &norm);
        report.pollutant_normalization = norm;
        let (pollutants, pivot) = PollutantPivoter::pivot(&measurements)?;
        report.pivot = pivot;
        report.time("pivot", timer.elapsed_ms());

        let timer = Timer::start();
        let (weather, norm) = SchemaNormalizer::normalize(&inputs.weather, SourceKind::Weather)?;
        report.record_parse_failures("weather", &norm);
        report.weather_normalization = norm;
        let (weather, cleaning) = clean_weather(&weather)?;
        report.weather_cleaning = cleaning;

        let (fused, fusion) = RecordFuser::new(self.config.join.clone()).fuse(&pollutants, &weather)?;
        let strategy = fusion.strategy;
        report.fusion = Some(fusion);
        report.time("fusion", timer.elapsed_ms());

        let timer = Timer::start();
        let geography = match &inputs.geography {
            Some(geo) => Some(SchemaNormalizer::normalize(geo, SourceKind::Geography)?.0),
            None => None,
        };
        let (fused, proximity) = ProximityMerger::merge(&fused, geography.as_ref())?;
        if let ProximityStatus::Skipped { reason } = &proximity {
            report.warn(PipelineWarning::SkippedOptionalInput {
                role: "geography".to_string(),
                reason: reason.clone(),
            });
        }
        report.proximity = Some(proximity.clone());
        report.time("proximity", timer.elapsed_ms());

        let timer = Timer::start();
        let (imputed, imputation) = ImputationEngine::new(self.config.imputation.clone()).impute(&fused)?;
        report.imputation = imputation;
        let processed = TemporalFeatureDeriver::derive(&imputed)?;
        report.time("imputation", timer.elapsed_ms());

        let schema = SchemaDescriptor::describe(&processed);
        for column in schema.degenerate_columns() {
            report.warn(PipelineWarning::DegenerateStatistic {
                column,
                reason: "no values in the batch".to_string(),
            });
        }

        let timer = Timer::start();
        let mut scaler = MinMaxScaler::new(self.config.normalization.clone());
        let normalized = scaler.fit_transform(&processed, &schema)?;
        for params in scaler.params() {
            if params.min.is_some() && params.is_degenerate() {
                report.warn(PipelineWarning::DegenerateStatistic {
                    column: params.column.clone(),
                    reason: "constant column, zero range".to_string(),
                });
            }
        }
        report.time("normalization", timer.elapsed_ms());

        let manifest = FeatureManifest::build(&schema, strategy, proximity);
        let quality = DataQualityScorer::from_frame(&processed)?;

        info!(
            rows = processed.height(),
            columns = processed.width(),
            warnings = report.warnings.len(),
            millis = report.total_millis(),
            "fusion pipeline finished"
        );

        Ok(FusionOutput {
            processed,
            normalized,
            schema,
            manifest,
            quality,
            report,
        })
    }

    /// Load inputs, run, and write every artefact under the output directory
    pub fn run_from_paths(&self) -> Result<FusionOutput> {
        let inputs = self.load_inputs()?;
        let mut output = self.run(inputs)?;
        self.write_outputs(&mut output)?;
        Ok(output)
    }

    pub fn write_outputs(&self, output: &mut FusionOutput) -> Result<()> {
        let paths = &self.config.paths;
        DataSaver::save_csv(&mut output.processed, &paths.processed())?;
        DataSaver::save_csv(&mut output.normalized, &paths.normalized())?;
        DataSaver::save_json(&output.manifest, &paths.manifest())?;
        DataSaver::save_json(&output.quality, &paths.quality())?;
        info!(dir = %paths.output_dir.display(), "wrote fusion outputs");
        Ok(())
    }
}

/// Fused table to labeled table
pub struct LabelingStage {
    config: PipelineConfig,
}

impl Default for LabelingStage {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl LabelingStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, processed: &DataFrame) -> Result<(DataFrame, LabelingOutcome)> {
        SourceLabelEngine::new(self.config.labeling.clone()).label_frame(processed)
    }

    /// Read the fused table from the output directory and write the labeled table
    pub fn run_from_paths(&self) -> Result<(DataFrame, LabelingOutcome)> {
        let paths = &self.config.paths;
        let processed = DataLoader::new().load_required(&paths.processed(), "fused")?;
        // numeric inference turns ids like "101" into floats
        let (processed, _) = SchemaNormalizer::normalize(&processed, SourceKind::Geography)?;
        let (mut labeled, outcome) = self.run(&processed)?;
        DataSaver::save_csv(&mut labeled, &paths.labeled())?;
        info!(path = %paths.labeled().display(), rows = labeled.height(), "wrote labeled table");
        Ok((labeled, outcome))
    }
}
