//! Model call boundary
//!
//! Every interaction with the remote language model is a named, structured
//! contract rather than free text: a request carries an instruction, textual
//! content, the contract name (optionally an image), and the response must
//! parse into the contract's typed payload. [`ModelClient`] is the seam that
//! lets tests substitute a scripted client for the HTTP transport.

mod contracts;
pub mod http;

pub use contracts::{
    CodeForAnalysis, Contract, ImageFeedback, NarrativeText, SchemaInference,
    SuggestedAnalysis, SummaryAndNextSteps,
};
pub use http::HttpModelClient;

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// One outbound model request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// System instruction for the call
    pub instruction: String,
    /// User content (serialized metadata, statistics, sample rows, ...)
    pub content: String,
    /// Which result contract the response must satisfy
    pub contract: Contract,
    /// Chart image to embed, for vision requests
    pub image: Option<PathBuf>,
}

impl ModelRequest {
    /// Text-only request.
    #[must_use]
    pub fn new(
        instruction: impl Into<String>,
        content: impl Into<String>,
        contract: Contract,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            content: content.into(),
            contract,
            image: None,
        }
    }

    /// Request embedding a chart image.
    #[must_use]
    pub fn with_image(mut self, image: PathBuf) -> Self {
        self.image = Some(image);
        self
    }
}

/// Transport-agnostic model client.
///
/// Implementations return the raw structured arguments object produced for
/// the requested contract; callers deserialize with [`parse_arguments`].
pub trait ModelClient {
    /// Issue a single synchronous request.
    ///
    /// # Errors
    /// Returns an error on transport failure or when the response carries no
    /// structured arguments for the contract.
    fn request(&self, request: &ModelRequest) -> Result<serde_json::Value>;
}

/// Deserialize a contract's arguments object into its typed payload.
///
/// # Errors
/// Returns `Error::Contract` when required fields are missing or malformed;
/// the caller decides whether that feeds the retry loop or a fallback.
pub fn parse_arguments<T: DeserializeOwned>(
    contract: Contract,
    arguments: &serde_json::Value,
) -> Result<T> {
    serde_json::from_value(arguments.clone()).map_err(|e| Error::Contract {
        contract: contract.name().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arguments_reports_missing_fields() {
        let incomplete = serde_json::json!({ "python_code": "df.head()" });
        let result: Result<CodeForAnalysis> =
            parse_arguments(Contract::CodeForAnalysis, &incomplete);
        match result {
            Err(Error::Contract { contract, .. }) => {
                assert_eq!(contract, "code-for-analysis");
            }
            other => panic!("expected contract error, got {other:?}"),
        }
    }

    #[test]
    fn parse_arguments_accepts_complete_payload() {
        let complete = serde_json::json!({
            "python_code": "df.describe()",
            "output_file": "chart.png",
            "title": "Overview",
            "rationale": "describe the data",
        });
        let parsed: CodeForAnalysis =
            parse_arguments(Contract::CodeForAnalysis, &complete).unwrap();
        assert_eq!(parsed.output_file, "chart.png");
    }
}
