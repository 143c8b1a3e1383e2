//! # Datasage: LLM-Orchestrated Tabular Analysis
//!
//! Datasage turns an arbitrary delimited dataset file into a narrative
//! analysis report by orchestrating a sequence of model calls that infer
//! column semantics, author analysis code, and interpret the produced
//! charts, alongside a fixed battery of deterministic statistical analyses
//! (correlation, outlier detection, clustering).
//!
//! The run is strictly sequential: every remote call and every code
//! execution resolves before the next step starts. Most failures degrade to
//! an omitted report section; only schema inference is fatal.
//!
//! ## Example
//!
//! ```rust,no_run
//! use datasage::codegen::PythonExecutor;
//! use datasage::model::HttpModelClient;
//! use datasage::orchestrator::Analyzer;
//! use datasage::{loader, AnalyzerConfig};
//!
//! let config = AnalyzerConfig::builder()
//!     .endpoint("https://aiproxy.example.com/openai/v1/chat/completions")
//!     .model("gpt-4o-mini")
//!     .token(std::env::var("AIPROXY_TOKEN").unwrap_or_default())
//!     .build();
//! let client = HttpModelClient::new(&config.endpoint, &config.model, &config.token)?;
//! let executor = PythonExecutor::default();
//! let frame = loader::load_csv("data.csv")?;
//! let analyzer = Analyzer::new(config, &client, &executor);
//! let payload = analyzer.run(frame, "data.csv", std::path::Path::new("data"))?;
//! println!("produced {} artifacts", payload.artifacts.len());
//! # Ok::<(), datasage::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod battery;
pub mod codegen;
pub mod error;
pub mod frame;
pub mod loader;
pub mod model;
pub mod narrative;
pub mod orchestrator;
pub mod preprocess;
pub mod report;
pub mod schema;
pub mod stats;

pub use error::{Error, Result};

/// Immutable run configuration, passed into the orchestrator at
/// construction. Never read from ambient process state inside the library;
/// the binary resolves env/flags and builds one of these.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Model endpoint URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Bearer token for the endpoint
    pub token: String,
    /// Total attempt budget for the generate-execute-retry loop
    pub max_retry: u32,
    /// Rows sampled for schema inference
    pub sample_rows: usize,
    /// |r| threshold for reporting a correlation pair
    pub correlation_threshold: f64,
    /// |z| threshold for flagging an outlier
    pub z_threshold: f64,
    /// Requested k-means cluster count
    pub clusters: usize,
    /// Seed for the clustering RNG
    pub seed: u64,
}

impl AnalyzerConfig {
    /// Create a configuration builder with the defaults.
    #[must_use]
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl Default for AnalyzerConfigBuilder {
    fn default() -> Self {
        Self {
            config: AnalyzerConfig {
                endpoint: String::new(),
                model: "gpt-4o-mini".to_string(),
                token: String::new(),
                max_retry: 3,
                sample_rows: 10,
                correlation_threshold: 0.8,
                z_threshold: 3.0,
                clusters: 5,
                seed: 42,
            },
        }
    }
}

impl AnalyzerConfigBuilder {
    /// Set the model endpoint URL.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = token.into();
        self
    }

    /// Set the retry-loop attempt budget.
    #[must_use]
    pub const fn max_retry(mut self, max_retry: u32) -> Self {
        self.config.max_retry = max_retry;
        self
    }

    /// Set the schema-inference sample size.
    #[must_use]
    pub const fn sample_rows(mut self, sample_rows: usize) -> Self {
        self.config.sample_rows = sample_rows;
        self
    }

    /// Set the correlation-pair threshold.
    #[must_use]
    pub const fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.config.correlation_threshold = threshold;
        self
    }

    /// Set the outlier z-score threshold.
    #[must_use]
    pub const fn z_threshold(mut self, threshold: f64) -> Self {
        self.config.z_threshold = threshold;
        self
    }

    /// Set the requested cluster count.
    #[must_use]
    pub const fn clusters(mut self, clusters: usize) -> Self {
        self.config.clusters = clusters;
        self
    }

    /// Set the clustering RNG seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}
