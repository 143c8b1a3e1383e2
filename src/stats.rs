//! Statistics & validity engine
//!
//! Pure function of the frame and the inferred metadata: descriptive
//! statistics plus null/invalid counts for every stats-eligible numeric
//! column. `std` is the sample standard deviation (ddof = 1) and quantiles
//! use linear interpolation, matching the conventional `describe` output.
//! No remote calls; deterministic.

use crate::frame::DataFrame;
use crate::schema::{stats_eligible_numeric, ColumnMetadata};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive statistics and validity counts for one column, computed once
/// before preprocessing and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Non-missing value count
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); 0 for fewer than two values
    pub std: f64,
    /// Minimum
    pub min: f64,
    /// 25th percentile
    pub p25: f64,
    /// Median
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// Maximum
    pub max: f64,
    /// Rows with a missing value before preprocessing
    pub null_count: usize,
    /// Rows with a raw value strictly below the logical minimum
    pub invalid_count: usize,
}

/// Compute statistics for every stats-eligible numeric column.
///
/// Columns with non-numeric inferred types are excluded even when flagged
/// eligible. An empty eligible set yields an empty map, not an error.
///
/// # Errors
/// Returns an error only when metadata names a column absent from the frame.
pub fn compute(
    frame: &DataFrame,
    metadata: &[ColumnMetadata],
) -> Result<BTreeMap<String, ColumnStats>> {
    let mut records = BTreeMap::new();
    for column in stats_eligible_numeric(metadata) {
        let values = frame.numeric_values(&column.name)?;
        let present: Vec<f64> = values.iter().copied().flatten().collect();
        let null_count = values.len() - present.len();
        let invalid_count = column.min_value.map_or(0, |min| {
            present.iter().filter(|&&v| v < min).count()
        });
        records.insert(
            column.name.clone(),
            describe(&present, null_count, invalid_count),
        );
    }
    Ok(records)
}

fn describe(values: &[f64], null_count: usize, invalid_count: usize) -> ColumnStats {
    if values.is_empty() {
        return ColumnStats {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            p50: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
            null_count,
            invalid_count,
        };
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    ColumnStats {
        count: values.len(),
        mean: mean(values),
        std: sample_std(values),
        min: sorted[0],
        p25: quantile(&sorted, 0.25),
        p50: quantile(&sorted, 0.50),
        p75: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
        null_count,
        invalid_count,
    }
}

/// Arithmetic mean of a non-empty slice.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Linear-interpolation quantile over a sorted slice.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = position - lower as f64;
    sorted[lower].mul_add(1.0 - weight, sorted[upper] * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn meta(name: &str, min_value: Option<f64>, eligible: bool) -> ColumnMetadata {
        ColumnMetadata {
            name: name.to_string(),
            column_type: ColumnType::Float,
            description: String::new(),
            min_value,
            stats_eligible: eligible,
        }
    }

    #[test]
    fn describe_matches_known_values() {
        let frame = DataFrame::from_csv_str("v\n1\n2\n3\n4\n").unwrap();
        let stats = compute(&frame, &[meta("v", None, true)]).unwrap();
        let v = &stats["v"];
        assert_eq!(v.count, 4);
        assert!((v.mean - 2.5).abs() < 1e-12);
        // Sample std of 1..4 is sqrt(5/3).
        assert!((v.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((v.p25 - 1.75).abs() < 1e-12);
        assert!((v.p50 - 2.5).abs() < 1e-12);
        assert!((v.p75 - 3.25).abs() < 1e-12);
        assert_eq!(v.min, 1.0);
        assert_eq!(v.max, 4.0);
    }

    #[test]
    fn null_and_invalid_counts_use_raw_values() {
        let frame = DataFrame::from_csv_str("age\n30\n-5\n\n42\n-1\n").unwrap();
        let stats = compute(&frame, &[meta("age", Some(0.0), true)]).unwrap();
        let age = &stats["age"];
        assert_eq!(age.null_count, 1);
        assert_eq!(age.invalid_count, 2);
        assert_eq!(age.count, 4);
    }

    #[test]
    fn ineligible_and_non_numeric_columns_are_skipped() {
        let frame = DataFrame::from_csv_str("a,b\n1,2\n3,4\n").unwrap();
        let metadata = vec![
            meta("a", None, false),
            ColumnMetadata {
                name: "b".to_string(),
                column_type: ColumnType::String,
                description: String::new(),
                min_value: None,
                stats_eligible: true,
            },
        ];
        let stats = compute(&frame, &metadata).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn empty_eligible_set_is_not_an_error() {
        let frame = DataFrame::from_csv_str("x\n1\n").unwrap();
        let stats = compute(&frame, &[]).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn all_null_column_yields_nan_stats() {
        let frame = DataFrame::from_csv_str("x\n\n\n").unwrap();
        let stats = compute(&frame, &[meta("x", None, true)]).unwrap();
        let x = &stats["x"];
        assert_eq!(x.count, 0);
        assert_eq!(x.null_count, 2);
        assert!(x.mean.is_nan());
    }
}
