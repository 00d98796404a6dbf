//! Data quality report for fused air-quality tables.
//!
//! Measures completeness, row uniqueness and physical plausibility of the
//! numeric columns, and flags columns downstream consumers should know about.

use crate::error::Result;
use crate::schema::{is_numeric_dtype, HUMIDITY, LATITUDE, LONGITUDE, NORM_SUFFIX, PROXIMITY_SUFFIX, WIND_DIRECTION, WIND_SPEED};
use crate::utils::frame::{drop_duplicate_rows, f64_values, str_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Quality report for one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    /// Overall quality score (0.0 - 1.0)
    pub overall_score: f64,
    /// Mean of per-column completeness
    pub completeness: f64,
    /// Ratio of distinct rows
    pub uniqueness: f64,
    /// Mean ratio of present numeric values within physical bounds
    pub validity: f64,
    pub per_column: Vec<ColumnQuality>,
    pub warnings: Vec<QualityWarning>,
    pub num_rows: usize,
    pub num_columns: usize,
}

/// Quality metrics for a single column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub column: String,
    /// 1 - missing ratio
    pub completeness: f64,
    pub distinct_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Present values outside the column's physical bounds
    pub out_of_range: usize,
}

/// Quality warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QualityWarning {
    /// More than 30% of the column is missing
    HighMissingness { column: String, ratio: f64 },
    /// Column has no values at all
    AllNull { column: String },
    /// Column holds a single distinct value
    ConstantColumn { column: String },
    /// Values outside physical bounds (negative concentrations, humidity > 100)
    OutOfRange { column: String, count: usize },
    /// Exact duplicate rows detected
    DuplicateRows { count: usize, total: usize },
}

/// Statistics for a single column used in quality scoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub null_count: usize,
    pub unique_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Present numeric values checked against bounds
    pub checked_count: usize,
    pub out_of_range: usize,
}

/// Data quality scorer
pub struct DataQualityScorer;

impl DataQualityScorer {
    /// Collect per-column statistics from a table and score them
    pub fn from_frame(df: &DataFrame) -> Result<DataQualityReport> {
        let mut stats = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().to_string();
            let mut col_stats = ColumnStatistics {
                null_count: column.null_count(),
                ..Default::default()
            };

            if is_numeric_dtype(column.dtype()) {
                let values = f64_values(df, &name)?;
                let bounds = physical_bounds(&name);
                let mut distinct = HashSet::new();
                for v in values.iter().flatten() {
                    distinct.insert(v.to_bits());
                    col_stats.min = Some(col_stats.min.map_or(*v, |m: f64| m.min(*v)));
                    col_stats.max = Some(col_stats.max.map_or(*v, |m: f64| m.max(*v)));
                    col_stats.checked_count += 1;
                    if !(bounds.0..=bounds.1).contains(v) {
                        col_stats.out_of_range += 1;
                    }
                }
                col_stats.unique_count = distinct.len();
            } else {
                col_stats.unique_count = str_values(df, &name)?
                    .into_iter()
                    .flatten()
                    .collect::<HashSet<_>>()
                    .len();
            }
            stats.push((name, col_stats));
        }

        let (_, duplicates) = drop_duplicate_rows(df)?;
        Ok(Self::score(df.height(), &stats, duplicates))
    }

    /// Compute quality report from column statistics.
    ///
    /// # Arguments
    /// * `num_rows` - Number of rows in the table
    /// * `column_stats` - Column name and statistics, in column order
    /// * `duplicate_row_count` - Number of rows that duplicate an earlier row
    pub fn score(
        num_rows: usize,
        column_stats: &[(String, ColumnStatistics)],
        duplicate_row_count: usize,
    ) -> DataQualityReport {
        let num_columns = column_stats.len();
        let mut per_column = Vec::with_capacity(num_columns);
        let mut warnings = Vec::new();

        let mut total_completeness = 0.0;
        let mut total_validity = 0.0;
        let mut validity_columns = 0usize;

        for (col_name, stats) in column_stats {
            let completeness = if num_rows > 0 {
                1.0 - (stats.null_count as f64 / num_rows as f64)
            } else {
                1.0
            };
            total_completeness += completeness;

            if stats.checked_count > 0 {
                total_validity += 1.0 - stats.out_of_range as f64 / stats.checked_count as f64;
                validity_columns += 1;
            }

            per_column.push(ColumnQuality {
                column: col_name.clone(),
                completeness,
                distinct_count: stats.unique_count,
                min: stats.min,
                max: stats.max,
                out_of_range: stats.out_of_range,
            });

            if num_rows > 0 && stats.null_count == num_rows {
                warnings.push(QualityWarning::AllNull {
                    column: col_name.clone(),
                });
            } else if completeness < 0.7 {
                warnings.push(QualityWarning::HighMissingness {
                    column: col_name.clone(),
                    ratio: 1.0 - completeness,
                });
            }

            if stats.unique_count == 1 && num_rows > 1 {
                warnings.push(QualityWarning::ConstantColumn {
                    column: col_name.clone(),
                });
            }

            if stats.out_of_range > 0 {
                warnings.push(QualityWarning::OutOfRange {
                    column: col_name.clone(),
                    count: stats.out_of_range,
                });
            }
        }

        if duplicate_row_count > 0 {
            warnings.push(QualityWarning::DuplicateRows {
                count: duplicate_row_count,
                total: num_rows,
            });
        }

        let completeness = total_completeness / num_columns.max(1) as f64;
        let validity = if validity_columns > 0 {
            total_validity / validity_columns as f64
        } else {
            1.0
        };
        let uniqueness = if num_rows > 0 {
            1.0 - (duplicate_row_count as f64 / num_rows as f64)
        } else {
            1.0
        };

        let overall_score = completeness * 0.4 + uniqueness * 0.2 + validity * 0.4;

        DataQualityReport {
            overall_score,
            completeness,
            uniqueness,
            validity,
            per_column,
            warnings,
            num_rows,
            num_columns,
        }
    }
}

/// Inclusive plausible range for a column, by name
fn physical_bounds(column: &str) -> (f64, f64) {
    match column {
        LATITUDE => (-90.0, 90.0),
        LONGITUDE => (-180.0, 180.0),
        HUMIDITY => (0.0, 100.0),
        WIND_DIRECTION => (0.0, 360.0),
        WIND_SPEED | "pm25" | "pm10" | "no2" | "co" | "so2" | "o3" => (0.0, f64::INFINITY),
        c if c.ends_with(PROXIMITY_SUFFIX) => (0.0, f64::INFINITY),
        c if c.ends_with(NORM_SUFFIX) => (0.0, 1.0),
        _ => (f64::NEG_INFINITY, f64::INFINITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(null_count: usize, unique_count: usize) -> ColumnStatistics {
        ColumnStatistics {
            null_count,
            unique_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_perfect_quality() {
        let df = df!(
            "location_id" => &["1", "2", "3"],
            "pm25" => &[10.0, 20.0, 30.0],
            "humidity" => &[40.0, 50.0, 60.0]
        )
        .unwrap();

        let report = DataQualityScorer::from_frame(&df).unwrap();
        assert!((report.overall_score - 1.0).abs() < 1e-9);
        assert!(report.warnings.is_empty());
        assert_eq!(report.num_columns, 3);
    }

    #[test]
    fn test_flags_from_frame() {
        let df = df!(
            "pm25" => &[Some(-1.0), Some(20.0), Some(20.0)],
            "humidity" => &[Some(120.0), Some(50.0), Some(50.0)],
            "so2" => &[None::<f64>, None, None],
            "station" => &["a", "b", "b"]
        )
        .unwrap();

        let report = DataQualityScorer::from_frame(&df).unwrap();
        assert!(report.warnings.contains(&QualityWarning::OutOfRange { column: "pm25".into(), count: 1 }));
        assert!(report.warnings.contains(&QualityWarning::OutOfRange { column: "humidity".into(), count: 1 }));
        assert!(report.warnings.contains(&QualityWarning::AllNull { column: "so2".into() }));
        assert!(report.warnings.contains(&QualityWarning::DuplicateRows { count: 1, total: 3 }));
        assert!(report.validity < 1.0);
    }

    #[test]
    fn test_constant_column_warning() {
        let report = DataQualityScorer::score(10, &[("no2".to_string(), stats(0, 1))], 0);
        assert!(report.warnings.iter().any(|w| matches!(w, QualityWarning::ConstantColumn { .. })));
    }

    #[test]
    fn test_high_missingness() {
        let report = DataQualityScorer::score(100, &[("co".to_string(), stats(50, 10))], 0);
        assert_eq!(report.completeness, 0.5);
        assert!(report.warnings.iter().any(|w| matches!(w, QualityWarning::HighMissingness { .. })));
    }

    #[test]
    fn test_empty_dataset() {
        let report = DataQualityScorer::score(0, &[], 0);
        assert_eq!(report.num_rows, 0);
        assert_eq!(report.uniqueness, 1.0);
        assert!(report.per_column.is_empty());
        assert!(report.warnings.is_empty());
    }
}
