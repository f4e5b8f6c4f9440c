//! OpenAI-compatible chat completions with an inline image.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnalysisClient, AnalysisError, AnalysisRequest};
use crate::config::SYSTEM_PROMPT;
use crate::sanitize;
use crate::secrets::override_or_default;

pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    default_key: Option<SecretString>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field(
                "default_key",
                &self
                    .default_key
                    .as_ref()
                    .map(|k| sanitize::redact_secret(k.expose_secret())),
            )
            .finish()
    }
}

impl OpenAiClient {
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

    fn build_body(request: &AnalysisRequest<'_>) -> Result<VisionChatRequest, AnalysisError> {
        let (mime, b64) = request.encode_image()?;

        Ok(VisionChatRequest {
            model: request.parameters.model.clone(),
            temperature: request.parameters.temperature,
            messages: vec![
                VisionMessage {
                    role: "system",
                    content: vec![ContentPart::Text {
                        text: SYSTEM_PROMPT.to_string(),
                    }],
                },
                VisionMessage {
                    role: "user",
                    content: vec![
                        ContentPart::Text {
                            text: request.prompt.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:{mime};base64,{b64}"),
                            },
                        },
                    ],
                },
            ],
        })
    }
}

impl AnalysisClient for OpenAiClient {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalysisError> {
        let body = Self::build_body(request)?;
        let url = format!("{}/chat/completions", self.base_url);

        let key = override_or_default(
            request.parameters.api_key.as_ref(),
            self.default_key.as_ref(),
        );

        let key_hint = key
            .map(|k| sanitize::redact_secret(k.expose_secret()))
            .unwrap_or_else(|| "none".to_string());
        debug!(
            model = %request.parameters.model,
            image = %sanitize::redact_path(request.image_path),
            key = %key_hint,
            "sending chat completion request"
        );

        let mut builder = self.http.post(&url).json(&body);
        if let Some(key) = key {
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

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct VisionChatRequest {
    model: String,
    messages: Vec<VisionMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct VisionMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
