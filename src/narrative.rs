//! Insight and narrative collection
//!
//! After all artifacts exist, each chart is shown to the model once for
//! interpretation, then a single final request synthesizes a narrative over
//! every structured fact gathered so far. Nothing here retries: a failure is
//! logged and the affected text fields default to empty, so a partial report
//! still ships.

use crate::battery::{ClusterResult, CorrelationResult, OutlierResult};
use crate::codegen::AnalysisArtifact;
use crate::model::{
    parse_arguments, Contract, ImageFeedback, ModelClient, ModelRequest, NarrativeText,
};
use crate::preprocess::PreprocessingLog;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

/// Instruction for per-chart interpretation requests.
const IMAGE_INSTRUCTION: &str = "Given the chart image, describe what you infer from it. \
Provide the inference, noteworthy insights, and recommended follow-up actions.";

/// Instruction for the final narrative request.
const NARRATIVE_INSTRUCTION: &str = "You are given the structured findings of a dataset analysis: \
the preprocessing change log, high-correlation column pairs, per-column outlier ranges, \
and k-means cluster sizes. Write a short narrative for each dimension and an overall summary.";

/// Ask the model to interpret each artifact's chart and attach the response.
///
/// Artifacts whose request fails keep empty text fields; the failure is
/// logged and the run continues.
pub fn collect_image_feedback(
    client: &dyn ModelClient,
    workdir: &Path,
    artifacts: &mut [AnalysisArtifact],
) {
    for artifact in artifacts {
        let chart = workdir.join(&artifact.chart_path);
        let request = ModelRequest::new(IMAGE_INSTRUCTION, "", Contract::ImageFeedback)
            .with_image(chart);
        let feedback = client
            .request(&request)
            .and_then(|arguments| parse_arguments::<ImageFeedback>(Contract::ImageFeedback, &arguments));
        match feedback {
            Ok(feedback) => {
                artifact.inference = feedback.inference;
                artifact.insights = feedback.insights;
                artifact.recommendation = feedback.recommendation;
            }
            Err(e) => {
                warn!(chart = %artifact.chart_path, error = %e, "image feedback failed");
            }
        }
    }
}

/// Facts carried into the final narrative request.
#[derive(Debug, Default)]
pub struct NarrativeFacts<'a> {
    /// Preprocessing change log
    pub preprocessing: Option<&'a PreprocessingLog>,
    /// Correlation step result
    pub correlation: Option<&'a CorrelationResult>,
    /// Outlier step result
    pub outliers: Option<&'a OutlierResult>,
    /// Clustering step result
    pub clusters: Option<&'a ClusterResult>,
}

impl NarrativeFacts<'_> {
    /// Render the facts as the textual digest sent to the model.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut out = String::new();
        if let Some(log) = self.preprocessing {
            let _ = writeln!(out, "Preprocessing: dropped {} rows.", log.dropped_rows);
            for (column, count) in &log.out_of_range_by_column {
                let _ = writeln!(out, "  {column}: {count} values below the logical minimum.");
            }
        }
        if let Some(correlation) = self.correlation {
            if correlation.high_pairs.is_empty() {
                let _ = writeln!(out, "Correlation: no pairs above the threshold.");
            } else {
                let _ = writeln!(out, "High-correlation pairs:");
                for pair in &correlation.high_pairs {
                    let _ = writeln!(
                        out,
                        "  {} ~ {}: {:.3}",
                        pair.first, pair.second, pair.coefficient
                    );
                }
            }
        }
        if let Some(outliers) = self.outliers {
            let _ = writeln!(out, "Outlier ranges (flagged values):");
            for (column, range) in &outliers.ranges {
                match range {
                    Some((lo, hi)) => {
                        let _ = writeln!(out, "  {column}: {lo} to {hi}");
                    }
                    None => {
                        let _ = writeln!(out, "  {column}: none");
                    }
                }
            }
        }
        if let Some(clusters) = self.clusters {
            let _ = writeln!(
                out,
                "Cluster sizes (k={}): {:?}",
                clusters.k, clusters.counts
            );
        }
        out
    }
}

/// Issue the final narrative request.
///
/// On failure the narrative defaults to empty prose fields; the error is
/// logged, not propagated, because a partial report beats no report.
#[must_use]
pub fn request_narrative(client: &dyn ModelClient, facts: &NarrativeFacts<'_>) -> NarrativeText {
    let request = ModelRequest::new(NARRATIVE_INSTRUCTION, facts.digest(), Contract::Narrative);
    match client
        .request(&request)
        .and_then(|arguments| parse_arguments::<NarrativeText>(Contract::Narrative, &arguments))
    {
        Ok(narrative) => narrative,
        Err(e) => {
            warn!(error = %e, "narrative request failed, defaulting to empty narrative");
            NarrativeText::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use serde_json::json;
    use std::collections::BTreeMap;

    struct Scripted(serde_json::Value);

    impl ModelClient for Scripted {
        fn request(&self, _request: &ModelRequest) -> Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    struct Refusing;

    impl ModelClient for Refusing {
        fn request(&self, request: &ModelRequest) -> Result<serde_json::Value> {
            Err(crate::Error::Contract {
                contract: request.contract.name().to_string(),
                message: "no".to_string(),
            })
        }
    }

    #[test]
    fn feedback_fills_artifact_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c.png"), b"png").unwrap();
        let client = Scripted(json!({
            "inference": "upward trend",
            "insights": "strong seasonality",
            "recommendations": "forecast quarterly",
        }));
        let mut artifacts = vec![AnalysisArtifact {
            chart_path: "c.png".to_string(),
            ..AnalysisArtifact::default()
        }];
        collect_image_feedback(&client, dir.path(), &mut artifacts);
        assert_eq!(artifacts[0].inference, "upward trend");
        assert_eq!(artifacts[0].recommendation, "forecast quarterly");
    }

    #[test]
    fn feedback_failure_leaves_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifacts = vec![AnalysisArtifact {
            chart_path: "missing.png".to_string(),
            ..AnalysisArtifact::default()
        }];
        collect_image_feedback(&Refusing, dir.path(), &mut artifacts);
        assert!(artifacts[0].inference.is_empty());
        assert!(artifacts[0].insights.is_empty());
    }

    #[test]
    fn narrative_failure_defaults_to_empty() {
        let narrative = request_narrative(&Refusing, &NarrativeFacts::default());
        assert!(narrative.summary.is_empty());
        assert!(narrative.preprocessing.is_empty());
    }

    #[test]
    fn digest_names_every_dimension() {
        let log = PreprocessingLog {
            dropped_rows: 3,
            out_of_range_by_column: BTreeMap::from([("age".to_string(), 2)]),
        };
        let outliers = OutlierResult {
            flagged_by_column: BTreeMap::from([("age".to_string(), 1)]),
            ranges: BTreeMap::from([("age".to_string(), Some((120.0, 130.0)))]),
            chart_path: "outliers.png".to_string(),
        };
        let clusters = ClusterResult {
            k: 2,
            counts: vec![10, 5],
            chart_path: "clusters.png".to_string(),
        };
        let facts = NarrativeFacts {
            preprocessing: Some(&log),
            correlation: None,
            outliers: Some(&outliers),
            clusters: Some(&clusters),
        };
        let digest = facts.digest();
        assert!(digest.contains("dropped 3 rows"));
        assert!(digest.contains("age: 120 to 130"));
        assert!(digest.contains("k=2"));
    }
}
