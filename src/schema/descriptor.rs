//! Schema descriptor: `(name, semantic type, nullability)` per column
//!
//! Computed once after fusion and handed to the normalizer, the manifest
//! writer and the labeling stage, so downstream code discovers the feature
//! set from the data rather than from a hardcoded list.

use super::*;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Role a column plays in the fused table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Identifier,
    Timestamp,
    Coordinate,
    Pollutant,
    Weather,
    Proximity,
    Temporal,
    Normalized,
    Label,
    Numeric,
    Text,
}

/// Descriptor of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Detected role
    pub semantic_type: SemanticType,
    /// Whether any value is null
    pub nullable: bool,
    /// Number of null values
    pub null_count: usize,
    /// Whether the column holds numbers
    pub numeric: bool,
}

/// Schema of a fused table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Column descriptors in frame order
    pub columns: Vec<ColumnDescriptor>,
    /// Number of rows described
    pub n_rows: usize,
}

impl SchemaDescriptor {
    /// Describe every column of `df`
    pub fn describe(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                let numeric = is_numeric_dtype(col.dtype());
                let null_count = col.null_count();
                ColumnDescriptor {
                    semantic_type: classify(&name, numeric),
                    nullable: null_count > 0,
                    null_count,
                    numeric,
                    name,
                }
            })
            .collect();

        Self {
            columns,
            n_rows: df.height(),
        }
    }

    /// All column names in order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Whether a column is present
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Descriptor for a column
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns of one semantic type
    pub fn of_type(&self, semantic_type: SemanticType) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.semantic_type == semantic_type)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Proximity (`*_dist_km`) columns present in this run
    pub fn proximity_columns(&self) -> Vec<String> {
        self.of_type(SemanticType::Proximity)
    }

    /// Normalizer candidates actually present, in candidate order
    pub fn normalization_candidates(&self) -> Vec<String> {
        NORMALIZE_COLUMNS
            .iter()
            .filter(|c| self.contains(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Numeric columns usable as model inputs: everything numeric except
    /// identifiers, coordinates, timestamps and the label
    pub fn model_features(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.numeric)
            .filter(|c| {
                !matches!(
                    c.semantic_type,
                    SemanticType::Identifier
                        | SemanticType::Coordinate
                        | SemanticType::Timestamp
                        | SemanticType::Label
                )
            })
            .map(|c| c.name.clone())
            .collect()
    }

    /// Numeric columns with no values at all
    pub fn degenerate_columns(&self) -> Vec<String> {
        if self.n_rows == 0 {
            return Vec::new();
        }
        self.columns
            .iter()
            .filter(|c| c.numeric && c.null_count == self.n_rows)
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Check if dtype is numeric
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn classify(name: &str, numeric: bool) -> SemanticType {
    let base = name.strip_suffix(WEATHER_COLLISION_SUFFIX).unwrap_or(name);

    if name == POLLUTION_SOURCE {
        SemanticType::Label
    } else if name.ends_with(NORM_SUFFIX) {
        SemanticType::Normalized
    } else if name.ends_with(PROXIMITY_SUFFIX) {
        SemanticType::Proximity
    } else if base == LOCATION_ID || base == LOCATION_NAME {
        SemanticType::Identifier
    } else if base == TIMESTAMP
        || POLLUTANT_TIMESTAMP_ALIASES.contains(&base)
        || WEATHER_TIMESTAMP_ALIASES.contains(&base)
    {
        SemanticType::Timestamp
    } else if base == LATITUDE || base == LONGITUDE || base == COORDINATES {
        SemanticType::Coordinate
    } else if base.parse::<PollutantKind>().is_ok() {
        SemanticType::Pollutant
    } else if WEATHER_COLUMNS.contains(&base) {
        SemanticType::Weather
    } else if [HOUR, DAY_OF_WEEK, MONTH, SEASON].contains(&name) {
        SemanticType::Temporal
    } else if numeric {
        SemanticType::Numeric
    } else {
        SemanticType::Text
    }
}
