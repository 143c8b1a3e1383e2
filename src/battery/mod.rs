//! Fixed analysis battery
//!
//! Three deterministic, non-model analyses over the preprocessed frame and
//! the stats-eligible numeric columns: pairwise correlation with a heatmap,
//! z-score outlier detection with a normalized scatter, and seeded k-means
//! clustering projected to two principal components. Each step renders one
//! PNG into the run directory; a step failure is reported and its result
//! omitted, never escalated to a run abort.

pub mod chart;
pub mod cluster;
pub mod correlation;
pub mod outliers;

pub use cluster::ClusterResult;
pub use correlation::{CorrelationPair, CorrelationResult};
pub use outliers::OutlierResult;

use crate::frame::DataFrame;
use crate::schema::{stats_eligible_numeric, ColumnMetadata};
use crate::{Error, Result};

/// Build an `AnalysisStep` error for the named battery step.
pub(crate) fn step_error(step: &str, message: impl Into<String>) -> Error {
    Error::AnalysisStep {
        step: step.to_string(),
        message: message.into(),
    }
}

/// Extract the eligible numeric columns as complete value vectors, skipping
/// any row with a missing value in an eligible column. After preprocessing
/// this drops nothing, but the battery stays robust when fed raw frames.
pub(crate) fn eligible_matrix(
    frame: &DataFrame,
    metadata: &[ColumnMetadata],
) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let eligible = stats_eligible_numeric(metadata);
    let names: Vec<String> = eligible.iter().map(|m| m.name.clone()).collect();
    let mut per_column: Vec<Vec<Option<f64>>> = Vec::with_capacity(names.len());
    for name in &names {
        per_column.push(frame.numeric_values(name)?);
    }
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for row in 0..frame.num_rows() {
        if per_column.iter().all(|c| c[row].is_some()) {
            for (dst, src) in columns.iter_mut().zip(&per_column) {
                dst.push(src[row].unwrap_or_default());
            }
        }
    }
    Ok((names, columns))
}
