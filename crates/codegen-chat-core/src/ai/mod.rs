pub mod codegen;

pub use codegen::HttpGenerator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong between sending a prompt and getting code back.
///
/// The controller renders all of these the same way; the variants only change
/// the diagnostic text.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("could not reach the code generation service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("network response was not ok: {0}")]
    Status(StatusCode),

    #[error("error from code generation server: {0}")]
    Service(String),

    #[error("unexpected response from code generation server: {0}")]
    Decode(String),

    #[error("request ended unexpectedly: {0}")]
    Aborted(String),

    #[error("no code generation endpoint configured")]
    NotConfigured,
}

/// A service that turns a prompt into source code
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Short label for logs and the header (usually the endpoint URL)
    fn name(&self) -> &str;

    /// Send one prompt and wait for the complete result
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Placeholder used until an endpoint has been configured.
///
/// Every request fails with [`GenerateError::NotConfigured`], which the
/// controller turns into an ordinary error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl CodeGenerator for Unconfigured {
    fn name(&self) -> &str {
        "not configured"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        Err(GenerateError::NotConfigured)
    }
}

/// Build the generator for an optional endpoint, falling back to [`Unconfigured`]
pub fn generator_for(
    endpoint: Option<&str>,
    timeout: Option<Duration>,
) -> anyhow::Result<Arc<dyn CodeGenerator>> {
    let Some(endpoint) = endpoint else {
        return Ok(Arc::new(Unconfigured));
    };
    let generator = match timeout {
        Some(timeout) => HttpGenerator::with_timeout(endpoint, timeout)?,
        None => HttpGenerator::new(endpoint),
    };
    Ok(Arc::new(generator))
}
