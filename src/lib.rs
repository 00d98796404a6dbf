//! airfuse - air-quality data fusion and pollution source labeling
//!
//! This crate turns three independently collected tables into one
//! feature-complete table per `(location, time)`:
//! - pollutant readings (long format, one row per measurement)
//! - weather observations
//! - an optional summary of distances to nearby geographic features
//!
//! and then assigns each row a pollution source with a rule engine.
//!
//! # Modules
//!
//! ## Stages
//! - [`cleaning`] - Schema normalization, pollutant pivot, weather cleanup
//! - [`fusion`] - Weather join and proximity feature merge
//! - [`imputation`] - Per-location interpolation and median backfill
//! - [`features`] - Calendar features
//! - [`preprocessing`] - Min-max normalization and quality scoring
//! - [`labeling`] - Rule-based pollution source labels
//!
//! ## Orchestration
//! - [`pipeline`] - End-to-end runs, configuration, manifest and reports
//! - [`cli`] - Command-line interface
//!
//! ## Support
//! - [`schema`] - Canonical column names and the schema descriptor
//! - [`utils`] - Loading, saving and frame helpers

// Core error handling
pub mod error;

// Canonical schema
pub mod schema;

// Stages
pub mod cleaning;
pub mod fusion;
pub mod imputation;
pub mod features;
pub mod preprocessing;
pub mod labeling;

// Orchestration
pub mod pipeline;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{AirfuseError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{AirfuseError, Result};
    pub use crate::fusion::{JoinConfig, JoinStrategy, ProximityStatus};
    pub use crate::imputation::{ImputationConfig, InterpolationAxis};
    pub use crate::labeling::{LabelingConfig, RebalancePolicy, RuleThresholds, SourceLabel, SourceLabelEngine};
    pub use crate::pipeline::{
        DataPaths, FeatureManifest, FusionOutput, FusionPipeline, LabelingStage, PipelineConfig, PipelineInputs,
        PipelineWarning,
    };
    pub use crate::preprocessing::{DegenerateRange, MinMaxScaler, NormalizationConfig};
    pub use crate::schema::{PollutantKind, SchemaDescriptor, SemanticType};
}
