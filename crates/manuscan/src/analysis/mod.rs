//! Clients for the multimodal model endpoint.

pub mod client;
pub mod ollama;
pub mod openai;
pub mod request;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::{Config, Provider};
use crate::secrets::{resolve_secret_optional, SecretError};

pub use client::AnalysisClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use request::{AnalysisRequest, ModelParameters};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint rejected the credentials (status {status})")]
    Auth { status: u16 },

    #[error("Endpoint rate limit reached")]
    RateLimited,

    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Endpoint returned an unreadable body: {0}")]
    InvalidResponse(String),

    #[error("Endpoint returned no content")]
    EmptyResponse,

    #[error("Credential error: {0}")]
    Credential(#[from] SecretError),
}

/// Builds the client for the configured provider.
///
/// The default key is resolved here, once, from `api.api_key`, `api.api_key_file`
/// or the `api.api_key_env` variable. A missing key is not an error: the
/// endpoint may not need one.
pub fn client_from_config(config: &Config) -> Result<Box<dyn AnalysisClient>, AnalysisError> {
    let api = &config.api;
    let default_key = resolve_secret_optional(
        api.api_key.as_deref(),
        api.api_key_file.as_deref(),
        Some(api.api_key_env.as_str()),
    )?;

    let base_url = api
        .base_url
        .as_deref()
        .unwrap_or_else(|| config.provider.default_base_url());
    let timeout = Duration::from_secs(api.timeout_secs);

    let client: Box<dyn AnalysisClient> = match config.provider {
        Provider::OpenAi => Box::new(OpenAiClient::new(base_url, default_key, timeout)?),
        Provider::Ollama => Box::new(OllamaClient::new(base_url, default_key, timeout)?),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config_picks_provider() {
        let mut config = Config::default();
        config.api.api_key = Some("sk-test".to_string());
        let client = client_from_config(&config).unwrap();
        assert_eq!(client.name(), "openai");

        config.provider = Provider::Ollama;
        config.model = "llava".to_string();
        let client = client_from_config(&config).unwrap();
        assert_eq!(client.name(), "ollama");
    }

    #[test]
    fn test_unreadable_key_file_is_an_error() {
        let mut config = Config::default();
        config.api.api_key_file = Some("/no/such/key".to_string());
        let err = client_from_config(&config).err().unwrap();
        assert!(matches!(err, AnalysisError::Credential(_)));
    }
}
