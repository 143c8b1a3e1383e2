//! End-to-end orchestration test
//!
//! Drives a full analysis run with a scripted model client and a stub code
//! executor: a 100-row, 4-column dataset (3 numeric, 1 identifier) must
//! yield exactly three statistics entries, one result per fixed-battery
//! step, one model-authored artifact, and a narrative with five non-empty
//! prose fields.

use datasage::codegen::CodeExecutor;
use datasage::frame::DataFrame;
use datasage::model::{Contract, ModelClient, ModelRequest};
use datasage::orchestrator::Analyzer;
use datasage::{report, AnalyzerConfig, Result};
use serde_json::json;
use std::path::Path;

/// Scripted client answering each contract with a canned, contract-valid payload.
struct ScriptedClient;

impl ModelClient for ScriptedClient {
    fn request(&self, request: &ModelRequest) -> Result<serde_json::Value> {
        Ok(match request.contract {
            Contract::SchemaInference => json!({
                "column_metadata": [
                    { "name": "id", "type": "string", "description": "row identifier", "stats": false },
                    { "name": "height", "type": "float", "description": "height in cm", "min_value": 0, "stats": true },
                    { "name": "weight", "type": "float", "description": "weight in kg", "min_value": 0, "stats": true },
                    { "name": "score", "type": "integer", "description": "test score", "min_value": 0, "stats": true }
                ]
            }),
            Contract::SummaryAndNextSteps => json!({
                "title": "Body Measurements",
                "introduction": "Heights, weights and scores for 100 subjects.",
                "summary": "Height and weight move together.",
                "time_series": { "isavailable": true, "prompt": "Plot score over row order" },
                "geospatial": { "isavailable": false, "prompt": "" },
                "network": { "isavailable": false, "prompt": "" }
            }),
            Contract::CodeForAnalysis => json!({
                "python_code": "df.plot()",
                "output_file": "trend.png",
                "title": "Score trend",
                "rationale": "ordered scores may drift",
            }),
            Contract::ImageFeedback => json!({
                "inference": "scores drift upward",
                "insights": "later rows score higher",
                "recommendations": "check collection order",
            }),
            Contract::Narrative => json!({
                "preprocessing": "Five rows were dropped for negative weights.",
                "correlation": "Height and weight are strongly correlated.",
                "outliers": "No extreme values remain after cleaning.",
                "cluster": "Five groups of comparable size emerged.",
                "summary": "The dataset is clean and internally consistent.",
            }),
        })
    }
}

/// Executor that writes the declared chart instead of running code.
struct StubExecutor;

impl CodeExecutor for StubExecutor {
    fn execute(&self, _code: &str, _frame: &mut DataFrame, workdir: &Path) -> Result<()> {
        std::fs::write(workdir.join("trend.png"), b"png").unwrap();
        Ok(())
    }
}

/// 100 rows: id text column, height/weight correlated, score independent.
/// Five weights are negative and must be dropped by preprocessing.
fn build_dataset() -> DataFrame {
    let mut csv = String::from("id,height,weight,score\n");
    for i in 0..100u32 {
        let height = 150.0 + f64::from(i % 40);
        let weight = if i % 20 == 7 {
            -1.0
        } else {
            45.0 + 0.9 * f64::from(i % 40)
        };
        let score = f64::from((i * 37) % 100);
        csv.push_str(&format!("row{i},{height},{weight},{score}\n"));
    }
    DataFrame::from_csv_str(&csv).unwrap()
}

#[test]
fn full_run_produces_complete_payload() {
    let dir = tempfile::tempdir().unwrap();
    let frame = build_dataset();
    let config = AnalyzerConfig::builder()
        .endpoint("http://localhost/unused")
        .token("unused")
        .build();
    let analyzer = Analyzer::new(config, &ScriptedClient, &StubExecutor);
    let payload = analyzer.run(frame, "people.csv", dir.path()).unwrap();

    // Identifier column is excluded: exactly three statistics entries.
    assert_eq!(payload.stats.len(), 3);
    assert!(payload.stats.contains_key("height"));
    assert!(!payload.stats.contains_key("id"));

    // Five negative weights: counted invalid, nulled, rows dropped.
    assert_eq!(payload.stats["weight"].invalid_count, 5);
    assert_eq!(payload.preprocessing.dropped_rows, 5);
    assert_eq!(payload.preprocessing.out_of_range_by_column["weight"], 5);

    // Exactly one result per fixed-battery step.
    let correlation = payload.correlation.as_ref().unwrap();
    let outliers = payload.outliers.as_ref().unwrap();
    let clusters = payload.clusters.as_ref().unwrap();
    assert_eq!(clusters.counts.iter().sum::<usize>(), 95);

    // Height and weight were generated perfectly correlated.
    assert!(correlation
        .high_pairs
        .iter()
        .any(|p| p.first == "height" && p.second == "weight"));
    for pair in &correlation.high_pairs {
        assert!(pair.first < pair.second);
    }
    assert!(outliers.ranges.contains_key("score"));

    // One open-ended artifact, completed by the insight collector.
    assert_eq!(payload.artifacts.len(), 1);
    let artifact = &payload.artifacts[0];
    assert_eq!(artifact.chart_path, "trend.png");
    assert_eq!(artifact.inference, "scores drift upward");
    assert_eq!(artifact.recommendation, "check collection order");

    // Narrative with five non-empty prose fields.
    for field in [
        &payload.narrative.preprocessing,
        &payload.narrative.correlation,
        &payload.narrative.outliers,
        &payload.narrative.cluster,
        &payload.narrative.summary,
    ] {
        assert!(!field.is_empty());
    }

    // All three battery charts plus the generated one exist on disk.
    for chart in [
        correlation.chart_path.as_str(),
        outliers.chart_path.as_str(),
        clusters.chart_path.as_str(),
        artifact.chart_path.as_str(),
    ] {
        assert!(dir.path().join(chart).is_file(), "missing chart {chart}");
    }

    // The rendered report covers every section.
    report::write_report(&payload, dir.path()).unwrap();
    let markdown = std::fs::read_to_string(dir.path().join(report::REPORT_FILE)).unwrap();
    assert!(markdown.starts_with("# Body Measurements"));
    assert!(markdown.contains("## Correlation"));
    assert!(markdown.contains("## Outliers"));
    assert!(markdown.contains("## Clusters"));
    assert!(markdown.contains("### Observation 1: Score trend"));
    assert!(markdown.contains("## Summary"));
}

/// A client that fails schema inference sinks the whole run; nothing else
/// in the sequence is attempted.
struct RefusingClient;

impl ModelClient for RefusingClient {
    fn request(&self, request: &ModelRequest) -> Result<serde_json::Value> {
        Err(datasage::Error::Contract {
            contract: request.contract.name().to_string(),
            message: "refused".to_string(),
        })
    }
}

#[test]
fn schema_inference_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalyzerConfig::builder().build();
    let analyzer = Analyzer::new(config, &RefusingClient, &StubExecutor);
    let result = analyzer.run(build_dataset(), "people.csv", dir.path());
    assert!(matches!(result, Err(datasage::Error::SchemaInference(_))));
}

/// Everything after schema inference degrades gracefully: a client that
/// only answers the schema call still yields a partial payload.
struct SchemaOnlyClient;

impl ModelClient for SchemaOnlyClient {
    fn request(&self, request: &ModelRequest) -> Result<serde_json::Value> {
        if request.contract == Contract::SchemaInference {
            ScriptedClient.request(request)
        } else {
            RefusingClient.request(request)
        }
    }
}

#[test]
fn partial_report_beats_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalyzerConfig::builder().build();
    let analyzer = Analyzer::new(config, &SchemaOnlyClient, &StubExecutor);
    let payload = analyzer
        .run(build_dataset(), "people.csv", dir.path())
        .unwrap();

    // Battery is deterministic, so it still runs.
    assert!(payload.correlation.is_some());
    assert!(payload.clusters.is_some());
    // Model-dependent stages degrade: fallback title, no artifacts, empty
    // narrative fields.
    assert_eq!(payload.title, "people");
    assert!(payload.artifacts.is_empty());
    assert!(payload.narrative.summary.is_empty());
}
