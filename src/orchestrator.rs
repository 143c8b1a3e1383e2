//! Analysis orchestration engine
//!
//! Sequences the whole run: schema inference, statistics, preprocessing, the
//! fixed battery, the open-ended generate-execute loop, insight collection,
//! and payload assembly. Strictly sequential — every remote call and every
//! code execution resolves before the next step starts. The frame is owned
//! here and handed by mutable reference into executed code, which may mutate
//! it.
//!
//! Recovery policy (smallest-scoped fallback that keeps the run alive):
//! only schema inference aborts; a failed battery step, suggestion call,
//! generated analysis, or narrative request degrades to an omitted section.

use crate::battery::{cluster, correlation, outliers};
use crate::codegen::{run_generated_analysis, AnalysisArtifact, CodeExecutor};
use crate::frame::DataFrame;
use crate::model::{
    parse_arguments, Contract, ModelClient, ModelRequest, SummaryAndNextSteps,
};
use crate::narrative::{collect_image_feedback, request_narrative, NarrativeFacts};
use crate::preprocess::preprocess;
use crate::report::ReportPayload;
use crate::schema::infer_schema;
use crate::{stats, AnalyzerConfig, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

/// Instruction for the intro/summary/next-steps call.
const SUMMARY_INSTRUCTION: &str = "Analyze the provided column metadata and descriptive statistics. \
Suggest a concise title relevant to the dataset's subject matter. \
Write an introduction summarizing the dataset's scope, purpose and key attributes. \
Summarize notable observations from the descriptive statistics. \
For time-series, geospatial and network analysis, state whether the dataset supports it \
and, when it does, provide the exact prompt to generate a relevant chart.";

/// One full analysis run over a dataset.
pub struct Analyzer<'a> {
    config: AnalyzerConfig,
    client: &'a dyn ModelClient,
    executor: &'a dyn CodeExecutor,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer with its collaborators.
    #[must_use]
    pub fn new(
        config: AnalyzerConfig,
        client: &'a dyn ModelClient,
        executor: &'a dyn CodeExecutor,
    ) -> Self {
        Self {
            config,
            client,
            executor,
        }
    }

    /// Execute the full analysis sequence and assemble the report payload.
    ///
    /// # Errors
    /// Returns `Error::SchemaInference` when schema inference fails; every
    /// other failure degrades to an omitted report section.
    pub fn run(
        &self,
        mut frame: DataFrame,
        source: &str,
        workdir: &Path,
    ) -> Result<ReportPayload> {
        info!(source, rows = frame.num_rows(), cols = frame.num_cols(), "starting analysis run");

        // 1. Schema inference — the only fatal stage.
        let metadata = infer_schema(self.client, &frame, self.config.sample_rows)?;

        // 2. Statistics over the raw frame, so null/invalid counts reflect
        // the data as loaded.
        let stats = stats::compute(&frame, &metadata)?;

        // 3. Preprocessing.
        let preprocessing = preprocess(&mut frame, &metadata)?;

        // 4. Title/introduction/summary plus suggested open-ended analyses.
        let steps = self.request_summary(&metadata, &stats, source);

        // 5. Fixed battery, each step reported-and-omitted on failure.
        let correlation = correlation::run(
            &frame,
            &metadata,
            self.config.correlation_threshold,
            workdir,
        )
        .map_err(|e| warn!(error = %e, "correlation step omitted"))
        .ok();
        let outliers = outliers::run(&frame, &metadata, self.config.z_threshold, workdir)
            .map_err(|e| warn!(error = %e, "outlier step omitted"))
            .ok();
        let clusters = cluster::run(
            &frame,
            &metadata,
            self.config.clusters,
            self.config.seed,
            workdir,
        )
        .map_err(|e| warn!(error = %e, "clustering step omitted"))
        .ok();

        // 6. Open-ended analyses through the generate-execute-retry loop.
        let context = serde_json::json!({
            "metadata": metadata,
            "statistics": stats,
        })
        .to_string();
        let mut artifacts: Vec<AnalysisArtifact> = Vec::new();
        for suggestion in steps.available_prompts() {
            let outcome = run_generated_analysis(
                self.client,
                self.executor,
                &mut frame,
                workdir,
                &suggestion.prompt,
                &context,
                self.config.max_retry,
            );
            if let Some(artifact) = outcome.artifact {
                artifacts.push(artifact);
            }
        }

        // 7. Insight collection and the final narrative.
        collect_image_feedback(self.client, workdir, &mut artifacts);
        let facts = NarrativeFacts {
            preprocessing: Some(&preprocessing),
            correlation: correlation.as_ref(),
            outliers: outliers.as_ref(),
            clusters: clusters.as_ref(),
        };
        let narrative = request_narrative(self.client, &facts);

        Ok(ReportPayload {
            source: source.to_string(),
            generated_at: Utc::now(),
            title: steps.title,
            introduction: steps.introduction,
            summary: steps.summary,
            metadata,
            stats,
            preprocessing,
            correlation,
            outliers,
            clusters,
            artifacts,
            narrative,
        })
    }

    /// Request the intro/summary/next-steps contract; fall back to a
    /// stem-derived title and no suggestions on failure.
    fn request_summary(
        &self,
        metadata: &[crate::schema::ColumnMetadata],
        stats: &std::collections::BTreeMap<String, crate::stats::ColumnStats>,
        source: &str,
    ) -> SummaryAndNextSteps {
        let content = serde_json::json!({
            "metadata": metadata,
            "statistics": stats,
        })
        .to_string();
        let request = ModelRequest::new(SUMMARY_INSTRUCTION, content, Contract::SummaryAndNextSteps);
        match self.client.request(&request).and_then(|arguments| {
            parse_arguments::<SummaryAndNextSteps>(Contract::SummaryAndNextSteps, &arguments)
        }) {
            Ok(steps) => steps,
            Err(e) => {
                warn!(error = %e, "summary request failed, using fallback title");
                SummaryAndNextSteps {
                    title: Path::new(source)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("Dataset Analysis")
                        .to_string(),
                    introduction: String::new(),
                    summary: String::new(),
                    time_series: crate::model::SuggestedAnalysis::default(),
                    geospatial: crate::model::SuggestedAnalysis::default(),
                    network: crate::model::SuggestedAnalysis::default(),
                }
            }
        }
    }
}
