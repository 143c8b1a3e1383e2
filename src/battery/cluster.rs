//! Seeded k-means clustering with a 2-D principal-component projection
//!
//! Lloyd iterations over standardized eligible columns, centroids seeded
//! from a fixed RNG so the step is exactly reproducible. The projection for
//! the scatter uses the top two principal components, computed by power
//! iteration with deflation on the covariance matrix.

use super::chart::{series_color, CHART_SIZE};
use super::{eligible_matrix, step_error};
use crate::frame::DataFrame;
use crate::schema::ColumnMetadata;
use crate::stats::{mean, sample_std};
use crate::Result;
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Chart file written by this step.
pub const CHART_FILE: &str = "clusters.png";

/// Upper bound on Lloyd iterations; assignments almost always stabilize far
/// earlier on datasets this size.
const MAX_ITERATIONS: usize = 100;

/// Power-iteration rounds per principal component.
const POWER_ROUNDS: usize = 64;

/// Clustering summary plus the rendered scatter path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResult {
    /// Effective cluster count (requested k capped at the row count)
    pub k: usize,
    /// Member count per cluster, cluster index order
    pub counts: Vec<usize>,
    /// Scatter path relative to the run directory
    pub chart_path: String,
}

/// Run the clustering step.
///
/// # Errors
/// Returns `Error::AnalysisStep` when no eligible data exists or the chart
/// cannot be rendered.
pub fn run(
    frame: &DataFrame,
    metadata: &[ColumnMetadata],
    k: usize,
    seed: u64,
    workdir: &Path,
) -> Result<ClusterResult> {
    let (columns, values) = eligible_matrix(frame, metadata)?;
    let rows = values.first().map_or(0, Vec::len);
    if columns.is_empty() || rows == 0 {
        return Err(step_error("cluster", "no numeric data to cluster"));
    }
    if k == 0 {
        return Err(step_error("cluster", "cluster count must be positive"));
    }

    // Standardize per column so distance is scale-free.
    let standardized: Vec<Vec<f64>> = values
        .iter()
        .map(|column| {
            let m = mean(column);
            let sd = sample_std(column);
            column
                .iter()
                .map(|v| if sd > 0.0 { (v - m) / sd } else { 0.0 })
                .collect()
        })
        .collect();
    // Row-major points.
    let points: Vec<Vec<f64>> = (0..rows)
        .map(|r| standardized.iter().map(|c| c[r]).collect())
        .collect();

    let k_eff = k.min(rows);
    let assignments = kmeans(&points, k_eff, seed);
    let mut counts = vec![0usize; k_eff];
    for &a in &assignments {
        counts[a] += 1;
    }

    let projected = project_2d(&points);
    let chart = workdir.join(CHART_FILE);
    render_scatter(&chart, &projected, &assignments, k_eff)
        .map_err(|e| step_error("cluster", format!("scatter rendering failed: {e}")))?;
    info!(k = k_eff, rows, "clustering step complete");
    Ok(ClusterResult {
        k: k_eff,
        counts,
        chart_path: CHART_FILE.to_string(),
    })
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Lloyd's algorithm with seeded centroid initialization.
fn kmeans(points: &[Vec<f64>], k: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids: Vec<Vec<f64>> = sample(&mut rng, points.len(), k)
        .into_iter()
        .map(|i| points[i].clone())
        .collect();
    let dims = points[0].len();
    let mut assignments = vec![0usize; points.len()];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    squared_distance(point, a).total_cmp(&squared_distance(point, b))
                })
                .map_or(0, |(idx, _)| idx);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        let mut sums = vec![vec![0.0; dims]; k];
        let mut members = vec![0usize; k];
        for (point, &a) in points.iter().zip(&assignments) {
            members[a] += 1;
            for (s, v) in sums[a].iter_mut().zip(point) {
                *s += v;
            }
        }
        for (c, (sum, &m)) in centroids.iter_mut().zip(sums.iter().zip(&members)) {
            if m > 0 {
                #[allow(clippy::cast_precision_loss)]
                for (slot, s) in c.iter_mut().zip(sum) {
                    *slot = s / m as f64;
                }
            }
            // Empty clusters keep their previous centroid.
        }
    }
    assignments
}

/// Project points onto their top two principal components.
fn project_2d(points: &[Vec<f64>]) -> Vec<(f64, f64)> {
    let dims = points[0].len();
    if dims == 1 {
        return points.iter().map(|p| (p[0], 0.0)).collect();
    }
    let covariance = covariance_matrix(points);
    let first = principal_component(&covariance, None);
    let second = principal_component(&covariance, Some(&first));
    points
        .iter()
        .map(|p| (dot(p, &first), dot(p, &second)))
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[allow(clippy::cast_precision_loss)]
fn covariance_matrix(points: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = points[0].len();
    let n = points.len() as f64;
    let means: Vec<f64> = (0..dims)
        .map(|d| points.iter().map(|p| p[d]).sum::<f64>() / n)
        .collect();
    let mut cov = vec![vec![0.0; dims]; dims];
    for point in points {
        for i in 0..dims {
            for j in i..dims {
                let v = (point[i] - means[i]) * (point[j] - means[j]);
                cov[i][j] += v;
            }
        }
    }
    let denom = (points.len().saturating_sub(1)).max(1) as f64;
    for i in 0..dims {
        for j in i..dims {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

/// Dominant eigenvector by power iteration, orthogonalized against an
/// already-extracted component when given (deflation).
#[allow(clippy::cast_precision_loss)]
fn principal_component(matrix: &[Vec<f64>], deflate: Option<&[f64]>) -> Vec<f64> {
    let dims = matrix.len();
    // Deterministic start vector; no RNG needed here.
    let mut v: Vec<f64> = (0..dims).map(|i| 1.0 + i as f64 * 0.1).collect();
    for _ in 0..POWER_ROUNDS {
        if let Some(prev) = deflate {
            let proj = dot(&v, prev);
            for (x, p) in v.iter_mut().zip(prev) {
                *x -= proj * p;
            }
        }
        let mut next: Vec<f64> = matrix.iter().map(|row| dot(row, &v)).collect();
        let norm = dot(&next, &next).sqrt();
        if norm < 1e-12 {
            return v;
        }
        for x in &mut next {
            *x /= norm;
        }
        v = next;
    }
    if let Some(prev) = deflate {
        let proj = dot(&v, prev);
        for (x, p) in v.iter_mut().zip(prev) {
            *x -= proj * p;
        }
        let norm = dot(&v, &v).sqrt();
        if norm > 1e-12 {
            for x in &mut v {
                *x /= norm;
            }
        }
    }
    v
}

fn render_scatter(
    path: &Path,
    projected: &[(f64, f64)],
    assignments: &[usize],
    k: usize,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in projected {
        x_lo = x_lo.min(x);
        x_hi = x_hi.max(x);
        y_lo = y_lo.min(y);
        y_hi = y_hi.max(y);
    }
    let pad = |lo: f64, hi: f64| {
        let span = (hi - lo).max(1e-6);
        (lo - 0.05 * span, hi + 0.05 * span)
    };
    let (x_lo, x_hi) = pad(x_lo, x_hi);
    let (y_lo, y_hi) = pad(y_lo, y_hi);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut builder = ChartBuilder::on(&root)
        .caption("K-means clusters (PCA projection)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    builder
        .configure_mesh()
        .x_desc("component 1")
        .y_desc("component 2")
        .draw()?;
    for cluster in 0..k {
        let color = series_color(cluster);
        builder
            .draw_series(
                projected
                    .iter()
                    .zip(assignments)
                    .filter(|(_, &a)| a == cluster)
                    .map(|(&(x, y), _)| Circle::new((x, y), 3, color.filled())),
            )?
            .label(format!("cluster {cluster}"))
            .legend(move |(x, y)| Circle::new((x + 8, y), 3, color.filled()));
    }
    builder
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;
    root.present()?;
    Ok(())
}
