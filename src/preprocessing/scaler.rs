//! Min-max feature scaling into `<col>_norm` companion columns

use super::config::{DegenerateRange, NormalizationConfig};
use crate::error::{AirfuseError, Result};
use crate::schema::{norm_column, SchemaDescriptor};
use crate::utils::frame::{f64_column, f64_values, has_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fitted range of one column. `min`/`max` are `None` when the column had
/// no values in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxParams {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MinMaxParams {
    /// True when the column is constant or empty
    pub fn is_degenerate(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => max - min == 0.0,
            _ => true,
        }
    }

    fn scale(&self, value: f64, policy: DegenerateRange) -> f64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) if max > min => (value - min) / (max - min),
            _ => match policy {
                DegenerateRange::Zero => 0.0,
                DegenerateRange::Nan => f64::NAN,
            },
        }
    }
}

/// Min-max scaler fitted once per batch. Originals are retained; scaled
/// values go to `<col>_norm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    config: NormalizationConfig,
    params: Vec<MinMaxParams>,
    is_fitted: bool,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new(NormalizationConfig::default())
    }
}

impl MinMaxScaler {
    /// Create a new scaler
    pub fn new(config: NormalizationConfig) -> Self {
        Self {
            config,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit ranges for the configured columns, or the descriptor's candidates
    pub fn fit(&mut self, df: &DataFrame, schema: &SchemaDescriptor) -> Result<&mut Self> {
        let columns = match &self.config.columns {
            Some(cols) => {
                for col in cols {
                    if !has_column(df, col) {
                        return Err(AirfuseError::FeatureNotFound(col.clone()));
                    }
                }
                cols.clone()
            }
            None => schema.normalization_candidates(),
        };

        self.params.clear();
        for column in columns {
            let values = f64_values(df, &column)?;
            let (min, max) = values.iter().flatten().fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), &v| {
                (Some(lo.map_or(v, |lo| lo.min(v))), Some(hi.map_or(v, |hi| hi.max(v))))
            });
            debug!(column = %column, ?min, ?max, "fitted min-max range");
            self.params.push(MinMaxParams { column, min, max });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Append one `_norm` column per fitted column
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(AirfuseError::ModelNotFitted);
        }

        let policy = self.config.degenerate_range;
        let mut result = df.clone();
        for params in &self.params {
            let values = f64_values(df, &params.column)?;
            if params.min.is_none() {
                debug!(column = %params.column, "column has no values; normalized column left null");
            } else if params.is_degenerate() {
                debug!(column = %params.column, ?policy, "constant column; normalized by degenerate policy");
            }
            let scaled = values
                .into_iter()
                .map(|v| v.map(|v| params.scale(v, policy)))
                .collect();
            result.with_column(f64_column(&norm_column(&params.column), scaled))?;
        }

        info!(columns = self.params.len(), "normalized columns");
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, schema: &SchemaDescriptor) -> Result<DataFrame> {
        self.fit(df, schema)?;
        self.transform(df)
    }

    /// Fitted ranges in column order
    pub fn params(&self) -> &[MinMaxParams] {
        &self.params
    }

    /// Columns whose range was zero or empty
    pub fn degenerate_columns(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.is_degenerate())
            .map(|p| p.column.clone())
            .collect()
    }
}
