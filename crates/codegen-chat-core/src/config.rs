use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow, bail};
use reqwest::Url;

/// Environment variable that overrides the configured endpoint
pub const ENDPOINT_ENV: &str = "CODEGEN_CHAT_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
    /// Abandon a request after this many seconds. Unset means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Validate `endpoint` and persist it, keeping any other settings on disk
    pub fn save_endpoint(endpoint: &str) -> Result<String> {
        let endpoint = validate_endpoint(endpoint)?;
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.endpoint = Some(endpoint.clone());
        config.save()?;
        Ok(endpoint)
    }

    /// The endpoint to use: environment first, then the config file.
    ///
    /// `Ok(None)` means nothing is configured yet.
    pub fn resolve_endpoint(&self) -> Result<Option<String>> {
        let env_endpoint = std::env::var(ENDPOINT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        self.resolve_endpoint_with(env_endpoint)
    }

    fn resolve_endpoint_with(&self, env_endpoint: Option<String>) -> Result<Option<String>> {
        match env_endpoint.or_else(|| self.endpoint.clone()) {
            Some(raw) => validate_endpoint(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn config_path() -> Result<PathBuf> {
        Self::get_config_path()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("codegen-chat").join("config.json"))
    }
}

/// Check that `raw` is an absolute http(s) URL and return it trimmed
pub fn validate_endpoint(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Endpoint URL is empty");
    }

    let url = Url::parse(trimmed)
        .map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", trimmed, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("Endpoint URL must use http or https, not '{}'", other),
    }
    if url.host_str().is_none() {
        bail!("Endpoint URL '{}' has no host", trimmed);
    }

    Ok(trimmed.to_string())
}
