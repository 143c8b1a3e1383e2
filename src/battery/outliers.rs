//! Z-score outlier detection with a normalized scatter chart

use super::chart::{series_color, CHART_SIZE};
use super::{eligible_matrix, step_error};
use crate::frame::DataFrame;
use crate::schema::ColumnMetadata;
use crate::stats::{mean, sample_std};
use crate::Result;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Chart file written by this step.
pub const CHART_FILE: &str = "outliers.png";

/// Outlier summary plus the rendered scatter path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierResult {
    /// Flagged point count per column
    pub flagged_by_column: BTreeMap<String, usize>,
    /// (min, max) of flagged raw values per column; `None` when the column
    /// has no outliers
    pub ranges: BTreeMap<String, Option<(f64, f64)>>,
    /// Scatter path relative to the run directory
    pub chart_path: String,
}

/// One flagged point, kept for rendering.
#[derive(Debug, Clone, Copy)]
struct Flagged {
    column: usize,
    row: usize,
    value: f64,
}

/// Run the outlier step: flag |z| > `z_threshold` per column and render all
/// flagged points on one scatter, each column divided by its own range so
/// magnitudes are comparable.
///
/// # Errors
/// Returns `Error::AnalysisStep` when no eligible column exists or the
/// chart cannot be rendered.
pub fn run(
    frame: &DataFrame,
    metadata: &[ColumnMetadata],
    z_threshold: f64,
    workdir: &Path,
) -> Result<OutlierResult> {
    let (columns, values) = eligible_matrix(frame, metadata)?;
    if columns.is_empty() {
        return Err(step_error("outliers", "no numeric columns to scan"));
    }

    let mut flagged = Vec::new();
    let mut flagged_by_column = BTreeMap::new();
    let mut ranges = BTreeMap::new();
    for (col, column_values) in values.iter().enumerate() {
        let m = mean(column_values);
        let sd = sample_std(column_values);
        let mut column_flagged: Vec<f64> = Vec::new();
        if sd > 0.0 {
            for (row, &v) in column_values.iter().enumerate() {
                if ((v - m) / sd).abs() > z_threshold {
                    column_flagged.push(v);
                    flagged.push(Flagged {
                        column: col,
                        row,
                        value: v,
                    });
                }
            }
        }
        flagged_by_column.insert(columns[col].clone(), column_flagged.len());
        let range = column_flagged
            .iter()
            .copied()
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });
        ranges.insert(columns[col].clone(), range);
    }

    let chart = workdir.join(CHART_FILE);
    render_scatter(&chart, &columns, &values, &flagged)
        .map_err(|e| step_error("outliers", format!("scatter rendering failed: {e}")))?;
    info!(flagged = flagged.len(), "outlier step complete");
    Ok(OutlierResult {
        flagged_by_column,
        ranges,
        chart_path: CHART_FILE.to_string(),
    })
}

#[allow(clippy::cast_precision_loss)]
fn render_scatter(
    path: &Path,
    columns: &[String],
    values: &[Vec<f64>],
    flagged: &[Flagged],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Normalize each flagged value by its own column's range before
    // choosing axes, so the bounds cover everything drawn.
    let mut normalized: Vec<(usize, f64, f64)> = Vec::new();
    for f in flagged {
        let column_values = &values[f.column];
        let lo = column_values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = column_values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        if range > 0.0 {
            normalized.push((f.column, f.row as f64, f.value / range));
        }
    }
    let max_row = values.first().map_or(0, Vec::len) as f64;
    let (y_lo, y_hi) = normalized.iter().fold((-1.0f64, 1.0f64), |(lo, hi), &(_, _, y)| {
        (lo.min(y - 0.5), hi.max(y + 0.5))
    });

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut builder = ChartBuilder::on(&root)
        .caption("Outliers (|z| above threshold)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..max_row.max(1.0), y_lo..y_hi)?;
    builder
        .configure_mesh()
        .x_desc("row")
        .y_desc("value / column range")
        .draw()?;
    for (col, name) in columns.iter().enumerate() {
        let color = series_color(col);
        let points: Vec<(f64, f64)> = normalized
            .iter()
            .filter(|(c, _, _)| *c == col)
            .map(|&(_, x, y)| (x, y))
            .collect();
        if points.is_empty() {
            continue;
        }
        builder
            .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 4, color.filled())))?
            .label(name.clone())
            .legend(move |(x, y)| Circle::new((x + 8, y), 4, color.filled()));
    }
    if !normalized.is_empty() {
        builder
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()?;
    }
    root.present()?;
    Ok(())
}
