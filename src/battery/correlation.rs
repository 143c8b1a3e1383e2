//! Pairwise Pearson correlation with heatmap rendering

use super::chart::{heat_color, CHART_SIZE};
use super::{eligible_matrix, step_error};
use crate::frame::DataFrame;
use crate::schema::ColumnMetadata;
use crate::stats::mean;
use crate::Result;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Chart file written by this step.
pub const CHART_FILE: &str = "correlation_heatmap.png";

/// One unordered high-correlation pair (`first` < `second` lexicographically).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    /// Lexicographically smaller column name
    pub first: String,
    /// Lexicographically larger column name
    pub second: String,
    /// Pearson coefficient
    pub coefficient: f64,
}

/// Correlation summary plus the rendered heatmap path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Column names in matrix order
    pub columns: Vec<String>,
    /// Pearson matrix, row-major, `matrix[i][j]` = corr(columns[i], columns[j])
    pub matrix: Vec<Vec<f64>>,
    /// Unordered pairs with |coefficient| above the threshold
    pub high_pairs: Vec<CorrelationPair>,
    /// Heatmap path relative to the run directory
    pub chart_path: String,
}

/// Pearson correlation of two equal-length samples.
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - ma, y - mb);
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    if va == 0.0 || vb == 0.0 {
        return f64::NAN;
    }
    cov / (va.sqrt() * vb.sqrt())
}

/// Run the correlation step over the stats-eligible numeric columns.
///
/// # Errors
/// Returns `Error::AnalysisStep` when fewer than two eligible columns exist
/// or the heatmap cannot be rendered.
pub fn run(
    frame: &DataFrame,
    metadata: &[ColumnMetadata],
    threshold: f64,
    workdir: &Path,
) -> Result<CorrelationResult> {
    let (columns, values) = eligible_matrix(frame, metadata)?;
    if columns.len() < 2 {
        return Err(step_error(
            "correlation",
            format!("need at least two numeric columns, have {}", columns.len()),
        ));
    }

    let n = columns.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&values[i], &values[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    // Keep only one ordering per pair, smaller name first; self-pairs are
    // excluded by construction.
    let mut high_pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let r = matrix[i][j];
            if r.abs() > threshold {
                let (first, second) = if columns[i] < columns[j] {
                    (columns[i].clone(), columns[j].clone())
                } else {
                    (columns[j].clone(), columns[i].clone())
                };
                high_pairs.push(CorrelationPair {
                    first,
                    second,
                    coefficient: r,
                });
            }
        }
    }

    let chart = workdir.join(CHART_FILE);
    render_heatmap(&chart, &columns, &matrix)
        .map_err(|e| step_error("correlation", format!("heatmap rendering failed: {e}")))?;
    info!(
        columns = n,
        high_pairs = high_pairs.len(),
        "correlation step complete"
    );
    Ok(CorrelationResult {
        columns,
        matrix,
        high_pairs,
        chart_path: CHART_FILE.to_string(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn render_heatmap(
    path: &Path,
    columns: &[String],
    matrix: &[Vec<f64>],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let n = columns.len() as i32;
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut builder = ChartBuilder::on(&root)
        .caption("Correlation heatmap", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(80)
        .y_label_area_size(80)
        .build_cartesian_2d(0..n, 0..n)?;
    builder
        .configure_mesh()
        .disable_mesh()
        .x_labels(columns.len())
        .y_labels(columns.len())
        .x_label_formatter(&|i| label_for(columns, *i))
        .y_label_formatter(&|i| label_for(columns, *i))
        .draw()?;
    builder.draw_series(matrix.iter().enumerate().flat_map(|(i, row)| {
        row.iter().enumerate().map(move |(j, &r)| {
            Rectangle::new(
                [(j as i32, i as i32), (j as i32 + 1, i as i32 + 1)],
                heat_color(r).filled(),
            )
        })
    }))?;
    root.present()?;
    Ok(())
}

fn label_for(columns: &[String], index: i32) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|i| columns.get(i))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::tests::meta;

    #[test]
    fn pearson_detects_perfect_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_constant_column_is_nan() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn high_pairs_deduplicated_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        // b = 2a (perfectly correlated), c is noise.
        let frame = DataFrame::from_csv_str(
            "b,a,c\n2,1,9\n4,2,1\n6,3,5\n8,4,2\n10,5,7\n",
        )
        .unwrap();
        let result = run(
            &frame,
            &[meta("b"), meta("a"), meta("c")],
            0.8,
            dir.path(),
        )
        .unwrap();
        assert_eq!(result.high_pairs.len(), 1);
        let pair = &result.high_pairs[0];
        assert_eq!((pair.first.as_str(), pair.second.as_str()), ("a", "b"));
        // Never both orderings, never a self-pair.
        for p in &result.high_pairs {
            assert!(p.first < p.second);
        }
        assert!(dir.path().join(CHART_FILE).is_file());
    }

    #[test]
    fn single_column_is_a_step_error() {
        let dir = tempfile::tempdir().unwrap();
        let frame = DataFrame::from_csv_str("a\n1\n2\n").unwrap();
        let result = run(&frame, &[meta("a")], 0.8, dir.path());
        assert!(matches!(
            result,
            Err(crate::Error::AnalysisStep { .. })
        ));
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let dir = tempfile::tempdir().unwrap();
        let frame =
            DataFrame::from_csv_str("a,b\n1,5\n2,3\n3,8\n4,1\n5,9\n").unwrap();
        let result = run(&frame, &[meta("a"), meta("b")], 0.99, dir.path()).unwrap();
        assert_eq!(result.matrix[0][0], 1.0);
        assert_eq!(result.matrix[0][1], result.matrix[1][0]);
    }
}
