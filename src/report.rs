//! Report payload and Markdown assembly
//!
//! The orchestrator's final product is one structured payload holding every
//! artifact of the run; `render_markdown` turns it into the README-style
//! report written into the run directory. Rendering is pure so it can be
//! asserted against exactly.

use crate::battery::{ClusterResult, CorrelationResult, OutlierResult};
use crate::codegen::AnalysisArtifact;
use crate::model::NarrativeText;
use crate::preprocess::PreprocessingLog;
use crate::schema::ColumnMetadata;
use crate::stats::ColumnStats;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Report file name inside the run directory.
pub const REPORT_FILE: &str = "README.md";

/// The final structured payload handed to report assembly.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    /// Source dataset name
    pub source: String,
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Dataset title (model-provided or stem-derived fallback)
    pub title: String,
    /// Dataset introduction prose
    pub introduction: String,
    /// Observations from the descriptive statistics
    pub summary: String,
    /// Per-column semantic metadata
    pub metadata: Vec<ColumnMetadata>,
    /// Descriptive statistics per stats-eligible column
    pub stats: BTreeMap<String, ColumnStats>,
    /// Preprocessing change log
    pub preprocessing: PreprocessingLog,
    /// Correlation step result, when the step succeeded
    pub correlation: Option<CorrelationResult>,
    /// Outlier step result, when the step succeeded
    pub outliers: Option<OutlierResult>,
    /// Clustering step result, when the step succeeded
    pub clusters: Option<ClusterResult>,
    /// Model-authored analyses, in generation order
    pub artifacts: Vec<AnalysisArtifact>,
    /// Final narrative
    pub narrative: NarrativeText,
}

/// Format a statistic for the Markdown table.
fn fmt_stat(value: f64) -> String {
    if value.is_nan() {
        "N/A".to_string()
    } else {
        format!("{value:.2}")
    }
}

/// Render the payload as Markdown.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn render_markdown(payload: &ReportPayload) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", payload.title);
    if !payload.introduction.is_empty() {
        let _ = writeln!(out, "## Introduction\n{}\n", payload.introduction);
    }

    let _ = writeln!(out, "## Metadata\n");
    let _ = writeln!(out, "|Name  |Type  |Description  |");
    let _ = writeln!(out, "|------|------|-------------|");
    for column in &payload.metadata {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            column.name,
            serde_json::to_value(column.column_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            column.description
        );
    }
    let _ = writeln!(out);

    if !payload.stats.is_empty() {
        let _ = writeln!(out, "## Descriptive Statistics\n");
        let _ = writeln!(
            out,
            "| Column | Count | Mean | Std | Min | 25% | 50% | 75% | Max | Nulls | Invalid |"
        );
        let _ = writeln!(
            out,
            "|--------|-------|------|-----|-----|-----|-----|-----|-----|-------|---------|"
        );
        for (name, s) in &payload.stats {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                name,
                s.count,
                fmt_stat(s.mean),
                fmt_stat(s.std),
                fmt_stat(s.min),
                fmt_stat(s.p25),
                fmt_stat(s.p50),
                fmt_stat(s.p75),
                fmt_stat(s.max),
                s.null_count,
                s.invalid_count
            );
        }
        if !payload.summary.is_empty() {
            let _ = writeln!(out, "\n{}", payload.summary);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Preprocessing\n");
    let _ = writeln!(out, "- Rows dropped: {}", payload.preprocessing.dropped_rows);
    for (column, count) in &payload.preprocessing.out_of_range_by_column {
        let _ = writeln!(out, "- `{column}`: {count} out-of-range values nulled");
    }
    if !payload.narrative.preprocessing.is_empty() {
        let _ = writeln!(out, "\n{}", payload.narrative.preprocessing);
    }
    let _ = writeln!(out);

    if let Some(correlation) = &payload.correlation {
        let _ = writeln!(out, "## Correlation\n");
        if correlation.high_pairs.is_empty() {
            let _ = writeln!(out, "No column pairs above the threshold.");
        } else {
            let _ = writeln!(out, "| First | Second | Coefficient |");
            let _ = writeln!(out, "|-------|--------|-------------|");
            for pair in &correlation.high_pairs {
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.3} |",
                    pair.first, pair.second, pair.coefficient
                );
            }
        }
        let _ = writeln!(out, "\n![{0}]({0})\n", correlation.chart_path);
        if !payload.narrative.correlation.is_empty() {
            let _ = writeln!(out, "{}\n", payload.narrative.correlation);
        }
    }

    if let Some(outliers) = &payload.outliers {
        let _ = writeln!(out, "## Outliers\n");
        let _ = writeln!(out, "| Column | Flagged | Range |");
        let _ = writeln!(out, "|--------|---------|-------|");
        for (column, count) in &outliers.flagged_by_column {
            let range = match outliers.ranges.get(column) {
                Some(Some((lo, hi))) => format!("{lo} to {hi}"),
                _ => "none".to_string(),
            };
            let _ = writeln!(out, "| {column} | {count} | {range} |");
        }
        let _ = writeln!(out, "\n![{0}]({0})\n", outliers.chart_path);
        if !payload.narrative.outliers.is_empty() {
            let _ = writeln!(out, "{}\n", payload.narrative.outliers);
        }
    }

    if let Some(clusters) = &payload.clusters {
        let _ = writeln!(out, "## Clusters\n");
        let _ = writeln!(out, "k = {}; member counts: {:?}", clusters.k, clusters.counts);
        let _ = writeln!(out, "\n![{0}]({0})\n", clusters.chart_path);
        if !payload.narrative.cluster.is_empty() {
            let _ = writeln!(out, "{}\n", payload.narrative.cluster);
        }
    }

    if !payload.artifacts.is_empty() {
        let _ = writeln!(out, "## Analysis\n");
        for (i, artifact) in payload.artifacts.iter().enumerate() {
            let _ = writeln!(out, "### Observation {}: {}\n", i + 1, artifact.title);
            if !artifact.rationale.is_empty() {
                let _ = writeln!(out, "{}\n", artifact.rationale);
            }
            let _ = writeln!(out, "![{0}]({0})\n", artifact.chart_path);
            for text in [
                &artifact.inference,
                &artifact.insights,
                &artifact.recommendation,
            ] {
                if !text.is_empty() {
                    let _ = writeln!(out, "{text}\n");
                }
            }
        }
    }

    if !payload.narrative.summary.is_empty() {
        let _ = writeln!(out, "## Summary\n\n{}", payload.narrative.summary);
    }
    out
}

/// Write the rendered report into the run directory.
///
/// # Errors
/// Returns an error when the file cannot be written.
pub fn write_report(payload: &ReportPayload, workdir: &Path) -> Result<()> {
    std::fs::write(workdir.join(REPORT_FILE), render_markdown(payload))?;
    Ok(())
}
