//! Feature manifest written next to the fused table

use crate::fusion::{JoinStrategy, ProximityStatus};
use crate::schema::{SchemaDescriptor, SemanticType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestColumn {
    pub name: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
}

/// Column inventory of one fused table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    /// Every fused column, in table order
    pub features: Vec<String>,
    pub schema: Vec<ManifestColumn>,
    /// Numeric inputs for downstream model training
    pub model_features: Vec<String>,
    pub degenerate_columns: Vec<String>,
    pub join_strategy: JoinStrategy,
    pub proximity: ProximityStatus,
}

impl FeatureManifest {
    pub fn build(schema: &SchemaDescriptor, join_strategy: JoinStrategy, proximity: ProximityStatus) -> Self {
        Self {
            features: schema.names(),
            schema: schema
                .columns
                .iter()
                .map(|c| ManifestColumn {
                    name: c.name.clone(),
                    semantic_type: c.semantic_type,
                    nullable: c.nullable,
                })
                .collect(),
            model_features: schema.model_features(),
            degenerate_columns: schema.degenerate_columns(),
            join_strategy,
            proximity,
        }
    }
}
