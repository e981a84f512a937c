use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CodeGenerator, GenerateError};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generated_code: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// Client for a code generation endpoint that accepts `{"question": ...}`
/// and answers with `{"generated_code": ...}` or `{"error": ...}`.
#[derive(Clone)]
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
}

impl HttpGenerator {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Same as [`HttpGenerator::new`] but every request is abandoned after `timeout`
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CodeGenerator for HttpGenerator {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        tracing::debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "sending prompt");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { question: prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerateError::Status(status));
        }

        let body = response.bytes().await?;
        interpret_response(&body)
    }
}

/// Turn a successful response body into generated code or a failure.
///
/// A truthy `error` field wins over `generated_code`, mirroring how the
/// paired backend reports failures with a 200 status.
fn interpret_response(body: &[u8]) -> Result<String, GenerateError> {
    let parsed: GenerateResponse = serde_json::from_slice(body)
        .map_err(|e| GenerateError::Decode(e.to_string()))?;

    if let Some(message) = parsed.error.as_ref().and_then(service_error_text) {
        return Err(GenerateError::Service(message));
    }

    parsed
        .generated_code
        .ok_or_else(|| GenerateError::Decode("missing `generated_code` field".to_string()))
}

fn service_error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
