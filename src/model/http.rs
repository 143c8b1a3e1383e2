//! HTTP transport for the model call boundary
//!
//! Posts OpenAI-style chat payloads with a forced function call so the
//! response arrives as structured arguments for the requested contract.
//! Vision requests embed the chart PNG as a base64 data URL at low detail.

use super::{ModelClient, ModelRequest};
use crate::{Error, Result};
use base64::prelude::{Engine, BASE64_STANDARD};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default request timeout; the run is strictly sequential, so a hung remote
/// call blocks everything. The transport at least bounds each call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking HTTP model client.
pub struct HttpModelClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    token: String,
}

impl HttpModelClient {
    /// Create a client for the given endpoint, model name and bearer token.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            token: token.into(),
        })
    }

    fn payload(&self, request: &ModelRequest) -> Result<Value> {
        let messages = match &request.image {
            Some(path) => {
                let data_url = image_data_url(path)?;
                json!([{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": request.instruction },
                        { "type": "image_url", "image_url": { "detail": "low", "url": data_url } }
                    ]
                }])
            }
            None => json!([
                { "role": "system", "content": request.instruction },
                { "role": "user", "content": request.content }
            ]),
        };
        Ok(json!({
            "model": self.model,
            "messages": messages,
            "functions": request.contract.function_schema(),
            "function_call": { "name": request.contract.name() },
        }))
    }
}

impl ModelClient for HttpModelClient {
    fn request(&self, request: &ModelRequest) -> Result<Value> {
        let payload = self.payload(request)?;
        debug!(contract = request.contract.name(), "issuing model request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Contract {
                contract: request.contract.name().to_string(),
                message: format!("model endpoint returned {status}: {body}"),
            });
        }
        let body: Value = response.json()?;
        extract_arguments(request, &body)
    }
}

/// Pull the function-call arguments object out of a chat completion body.
fn extract_arguments(request: &ModelRequest, body: &Value) -> Result<Value> {
    let arguments = body
        .pointer("/choices/0/message/function_call/arguments")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Contract {
            contract: request.contract.name().to_string(),
            message: "response carries no function-call arguments".to_string(),
        })?;
    serde_json::from_str(arguments).map_err(|e| Error::Contract {
        contract: request.contract.name().to_string(),
        message: format!("arguments are not valid JSON: {e}"),
    })
}

/// Encode an image file as a `data:` URL for vision requests.
fn image_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "image/png",
    };
    Ok(format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes)))
}
