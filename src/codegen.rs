//! Generate-execute-retry loop
//!
//! The central reusable primitive: request model-authored analysis code,
//! execute it against the live frame, and on any failure (contract
//! violation, execution error, missing declared artifact) retry with the
//! failing code and captured error appended to the prompt, up to a bounded
//! attempt count. Exhausting the budget yields an empty outcome; callers
//! treat that as "this step produced nothing", never as a run abort.
//!
//! Execution is exposed as an explicit capability: [`CodeExecutor`] takes a
//! code fragment and a typed data handle. The shipped [`PythonExecutor`]
//! runs the fragment unsandboxed and synchronously; a sandboxed evaluator
//! can replace it without touching the loop.

use crate::frame::DataFrame;
use crate::model::{parse_arguments, CodeForAnalysis, Contract, ModelClient, ModelRequest};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Instruction prefix for every code-generation request.
pub const CODE_INSTRUCTION: &str = "Do not add any comments, return only python code. \
Do not create dynamic charts that require user interaction. \
Do not make your own synthetic data; the dataset is available in a dataframe named 'df'. \
Use the metadata and descriptive statistics provided as input for the exact column names. \
Generated python code should be error free. \
Limit figsize within (5.12, 5.12) and dpi within 100. \
Export the output chart in png format. \
Use seaborn for plotting.";

/// A chart artifact plus its accompanying text fields. The loop fills the
/// fields through `rationale`; the insight collector completes the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    /// Analysis title
    pub title: String,
    /// Path of the produced chart, relative to the run directory
    pub chart_path: String,
    /// Why this analysis was chosen
    pub rationale: String,
    /// What the chart shows (filled by the collector)
    #[serde(default)]
    pub inference: String,
    /// Noteworthy patterns (filled by the collector)
    #[serde(default)]
    pub insights: String,
    /// Follow-up actions (filled by the collector)
    #[serde(default)]
    pub recommendation: String,
}

/// Outcome of one loop invocation.
#[derive(Debug)]
pub struct LoopOutcome {
    /// The produced artifact, or `None` when the budget was exhausted
    pub artifact: Option<AnalysisArtifact>,
    /// Total attempts made (strictly increases on every path)
    pub attempts: u32,
}

/// Per-invocation retry bookkeeping. Never shared between invocations.
#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    last_code: String,
    last_error: Option<String>,
}

impl RetryState {
    /// Retry content: the single most recent failing attempt appended to
    /// the original user content.
    fn retry_content(&self, base: &str) -> String {
        match &self.last_error {
            Some(error) => format!(
                "{base}\ncode={}\nerror={error}",
                serde_json::to_string(&self.last_code).unwrap_or_default()
            ),
            None => base.to_string(),
        }
    }
}

/// Capability boundary: execute a foreign code fragment against the frame.
///
/// The frame is handed over by mutable reference; executed code may mutate
/// it, and callers must not assume purity of model-authored code.
pub trait CodeExecutor {
    /// Run the fragment with `workdir` as its working directory.
    ///
    /// # Errors
    /// Returns `Error::GenerationExecution` with the captured error
    /// description when the fragment fails.
    fn execute(&self, code: &str, frame: &mut DataFrame, workdir: &Path) -> Result<()>;
}

/// Executes fragments with a local `python3`, binding the frame as a pandas
/// dataframe named `df` and reading it back afterwards so mutations are
/// visible to the caller. No isolation and no resource limits: a deliberate
/// boundary decision, not an oversight.
pub struct PythonExecutor {
    interpreter: String,
}

impl PythonExecutor {
    /// Executor using the given interpreter binary.
    #[must_use]
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for PythonExecutor {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl CodeExecutor for PythonExecutor {
    fn execute(&self, code: &str, frame: &mut DataFrame, workdir: &Path) -> Result<()> {
        let data_path = workdir.join(".datasage_frame.csv");
        std::fs::write(&data_path, frame.to_csv_string())?;
        let data_literal = format!("{:?}", data_path.to_string_lossy());
        let script = format!(
            "import pandas as pd\n\
             df = pd.read_csv({data_literal})\n\
             {code}\n\
             df.to_csv({data_literal}, index=False)\n"
        );
        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(&script)
            .current_dir(workdir)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            std::fs::remove_file(&data_path).ok();
            return Err(Error::GenerationExecution(stderr));
        }
        *frame = DataFrame::from_csv_str(&std::fs::read_to_string(&data_path)?)?;
        std::fs::remove_file(&data_path).ok();
        Ok(())
    }
}

/// Run the generate-execute-retry loop once for the given instruction.
///
/// `max_retry` bounds total attempts (default configuration: 3). The frame
/// may be left mutated by executed code even on a failed attempt.
pub fn run_generated_analysis(
    client: &dyn ModelClient,
    executor: &dyn CodeExecutor,
    frame: &mut DataFrame,
    workdir: &Path,
    prompt: &str,
    content: &str,
    max_retry: u32,
) -> LoopOutcome {
    let instruction = format!("{CODE_INSTRUCTION} {prompt}");
    let mut state = RetryState::default();
    while state.attempt < max_retry {
        // Counting up front guarantees termination even when an attempt
        // bails before executing anything.
        state.attempt += 1;
        match attempt(client, executor, frame, workdir, &instruction, content, &mut state) {
            Ok(artifact) => {
                info!(
                    attempt = state.attempt,
                    chart = %artifact.chart_path,
                    "generated analysis succeeded"
                );
                return LoopOutcome {
                    artifact: Some(artifact),
                    attempts: state.attempt,
                };
            }
            Err(e) => {
                warn!(attempt = state.attempt, error = %e, "generated analysis attempt failed");
                state.last_error = Some(e.to_string());
            }
        }
    }
    info!(attempts = state.attempt, "retry budget exhausted, step produced nothing");
    LoopOutcome {
        artifact: None,
        attempts: state.attempt,
    }
}

fn attempt(
    client: &dyn ModelClient,
    executor: &dyn CodeExecutor,
    frame: &mut DataFrame,
    workdir: &Path,
    instruction: &str,
    content: &str,
    state: &mut RetryState,
) -> Result<AnalysisArtifact> {
    let request = ModelRequest::new(
        instruction,
        state.retry_content(content),
        Contract::CodeForAnalysis,
    );
    let arguments = client.request(&request)?;
    let response: CodeForAnalysis = parse_arguments(Contract::CodeForAnalysis, &arguments)?;
    state.last_code.clone_from(&response.python_code);
    debug!(output_file = %response.output_file, "executing generated code");
    executor.execute(&response.python_code, frame, workdir)?;
    let chart_path = relocate_artifact(workdir, &response.output_file)?;
    Ok(AnalysisArtifact {
        title: response.title,
        chart_path,
        rationale: response.rationale,
        ..AnalysisArtifact::default()
    })
}

/// Validate the declared output artifact and move it to the top of the run
/// directory when the code wrote it under a nested path.
fn relocate_artifact(workdir: &Path, declared: &str) -> Result<String> {
    let produced = workdir.join(declared);
    if !produced.is_file() {
        return Err(Error::GenerationExecution(format!(
            "declared output artifact '{declared}' was not produced"
        )));
    }
    let file_name = produced
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::GenerationExecution(format!("declared output artifact '{declared}' has no file name"))
        })?
        .to_string();
    let target = workdir.join(&file_name);
    if produced != target {
        std::fs::rename(&produced, &target)?;
    }
    Ok(file_name)
}
