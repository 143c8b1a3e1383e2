//! Error types for datasage
//!
//! The taxonomy encodes the recovery policy: only schema inference is fatal,
//! everything else degrades to the smallest fallback that still lets the run
//! produce a (possibly partial) report.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Datasage error types
#[derive(Error, Debug)]
pub enum Error {
    /// Schema inference failed — fatal, no usable column metadata means no
    /// statistics are possible
    #[error("schema inference failed: {0}")]
    SchemaInference(String),

    /// Model-authored code could not be generated or executed; recoverable
    /// inside the retry loop
    #[error("generation/execution failed: {0}")]
    GenerationExecution(String),

    /// One fixed-battery step failed; its artifact is omitted and the run
    /// continues
    #[error("analysis step '{step}' failed: {message}")]
    AnalysisStep {
        /// Which battery step failed
        step: String,
        /// Failure detail
        message: String,
    },

    /// Narrative or image-feedback request failed; the affected text fields
    /// default to empty
    #[error("narrative request failed: {0}")]
    Narrative(String),

    /// Model response did not match its declared contract
    #[error("contract '{contract}' violated: {message}")]
    Contract {
        /// Contract name the response was expected to satisfy
        contract: String,
        /// What was missing or malformed
        message: String,
    },

    /// Malformed caller input (empty frame, unknown column, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = Error::AnalysisStep {
            step: "correlation".to_string(),
            message: "fewer than two numeric columns".to_string(),
        };
        assert!(err.to_string().contains("correlation"));
        assert!(err.to_string().contains("fewer than two"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
