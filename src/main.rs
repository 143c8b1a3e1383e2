//! Datasage command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use datasage::codegen::PythonExecutor;
use datasage::model::HttpModelClient;
use datasage::orchestrator::Analyzer;
use datasage::{loader, report, AnalyzerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Analyze a tabular dataset and write a narrative Markdown report.
#[derive(Parser, Debug)]
#[command(name = "datasage", version, about)]
struct Args {
    /// Path to the delimited dataset file
    file: PathBuf,

    /// Model endpoint URL
    #[arg(long, env = "AISERVER_URL", default_value = "https://aiproxy.sanand.workers.dev/openai/v1/chat/completions")]
    endpoint: String,

    /// Model name
    #[arg(long, env = "AI_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Bearer token for the model endpoint
    #[arg(long, env = "AIPROXY_TOKEN", hide_env_values = true)]
    token: String,

    /// Attempt budget for model-authored code
    #[arg(long, env = "MAX_RETRY", default_value_t = 3)]
    max_retry: u32,

    /// Directory to place the run output in (defaults to the file stem)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Python interpreter used to execute generated analysis code
    #[arg(long, default_value = "python3")]
    python: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let source = args.file.display().to_string();
    let out_dir = args.out_dir.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .map_or_else(|| PathBuf::from("datasage-run"), PathBuf::from)
    });
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating run directory {}", out_dir.display()))?;

    let config = AnalyzerConfig::builder()
        .endpoint(&args.endpoint)
        .model(&args.model)
        .token(&args.token)
        .max_retry(args.max_retry)
        .build();
    let client = HttpModelClient::new(&config.endpoint, &config.model, &config.token)
        .context("building model client")?;
    let executor = PythonExecutor::new(&args.python);

    let frame = loader::load_csv(&args.file)
        .with_context(|| format!("loading dataset {source}"))?;
    let analyzer = Analyzer::new(config, &client, &executor);
    let payload = analyzer
        .run(frame, &source, &out_dir)
        .context("analysis run failed")?;
    report::write_report(&payload, &out_dir).context("writing report")?;
    info!(
        report = %out_dir.join(report::REPORT_FILE).display(),
        artifacts = payload.artifacts.len(),
        "run complete"
    );
    Ok(())
}
