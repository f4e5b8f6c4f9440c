//! Local models served by Ollama's `/api/chat`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnalysisClient, AnalysisError, AnalysisRequest};
use crate::config::SYSTEM_PROMPT;
use crate::sanitize;
use crate::secrets::override_or_default;

pub struct OllamaClient {
    http: reqwest::blocking::Client,
    base_url: String,
    default_key: Option<SecretString>,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        default_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AnalysisError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_key,
        })
    }
}

impl AnalysisClient for OllamaClient {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalysisError> {
        let (_, b64) = request.encode_image()?;
        let body = OllamaChatRequest {
            model: &request.parameters.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                    images: Vec::new(),
                },
                OllamaMessage {
                    role: "user",
                    content: request.prompt,
                    images: vec![b64],
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.parameters.temperature,
            },
        };

        debug!(
            model = %request.parameters.model,
            image = %sanitize::redact_path(request.image_path),
            "sending ollama chat request"
        );

        let mut builder = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body);
        // plain Ollama ignores auth; reverse proxies in front of it may not
        if let Some(key) = override_or_default(
            request.parameters.api_key.as_ref(),
            self.default_key.as_ref(),
        ) {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send()?;
        let status = response.status();
        let text = response.text()?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AnalysisError::Auth {
                status: status.as_u16(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalysisError::RateLimited);
        }
        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: sanitize::truncate_for_log(&text, sanitize::MAX_LOGGED_RESPONSE),
            });
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        parsed
            .message
            .map(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaReply>,
}

#[derive(Deserialize)]
struct OllamaReply {
    #[serde(default)]
    content: String,
}
