use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::prompt::DEFAULT_PROMPT;
use crate::normalize::{ExtractionStrategy, FieldSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Overrides `prompt` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default = "default_response_schema")]
    pub response_schema: Vec<FieldSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            provider: Provider::default(),
            model: default_model(),
            temperature: default_temperature(),
            jpeg_quality: default_jpeg_quality(),
            prompt: default_prompt(),
            prompt_file: None,
            api: ApiConfig::default(),
            pipeline: PipelineSettings::default(),
            response_schema: default_response_schema(),
        }
    }
}

fn default_model() -> String {
    ModelName::Gpt4o.as_str().to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_jpeg_quality() -> u8 {
    70
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_response_schema() -> Vec<FieldSpec> {
    crate::normalize::ResponseSchema::manuscript().into_fields()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Ollama,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Ollama => "http://localhost:11434",
        }
    }
}

/// The hosted models the operator can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "chatgpt-4o-latest")]
    ChatGpt4oLatest,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl ModelName {
    pub const ALL: [ModelName; 3] = [
        ModelName::Gpt4o,
        ModelName::ChatGpt4oLatest,
        ModelName::Gpt4oMini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt4o => "gpt-4o",
            ModelName::ChatGpt4oLatest => "chatgpt-4o-latest",
            ModelName::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelName::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ModelName::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown model '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint root; defaults to the provider's public URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Root directory for materialized images.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Concurrent analysis calls; 1 keeps the batch strictly sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub extraction: ExtractionStrategy,
    /// Treat a reply lacking a declared field as a schema failure.
    #[serde(default)]
    pub require_all_fields: bool,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("static/images")
}

fn default_workers() -> usize {
    1
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            workers: default_workers(),
            extraction: ExtractionStrategy::default(),
            require_all_fields: false,
        }
    }
}
