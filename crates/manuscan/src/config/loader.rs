use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::{Config, ModelName, Provider};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

/// `<platform config dir>/manuscan/config.json`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("manuscan").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, ConfigFormat::from_path(path))
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(path, content).map_err(|e| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// The prompt actually sent: `prompt_file` contents when configured, else `prompt`.
pub fn effective_prompt(config: &Config) -> Result<String, ConfigError> {
    match &config.prompt_file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| ConfigError::ReadPrompt {
            path: path.clone(),
            source: e,
        }),
        None => Ok(config.prompt.clone()),
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks the JSON schema cannot express; also re-run after CLI overrides.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !(0.0..=1.0).contains(&config.temperature) || config.temperature.is_nan() {
        return Err(ConfigError::Validation {
            message: format!(
                "temperature must be within 0.0..=1.0, got {}",
                config.temperature
            ),
        });
    }

    if !(1..=100).contains(&config.jpeg_quality) {
        return Err(ConfigError::Validation {
            message: format!(
                "jpeg_quality must be within 1..=100, got {}",
                config.jpeg_quality
            ),
        });
    }

    if config.provider == Provider::OpenAi {
        config
            .model
            .parse::<ModelName>()
            .map_err(|message| ConfigError::Validation { message })?;
    } else if config.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "model must not be empty".to_string(),
        });
    }

    if config.prompt_file.is_none() && config.prompt.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "prompt must not be empty".to_string(),
        });
    }

    if config.pipeline.workers == 0 {
        return Err(ConfigError::Validation {
            message: "pipeline.workers must be at least 1".to_string(),
        });
    }

    let mut names = HashSet::new();
    for field in &config.response_schema {
        if !names.insert(field.name.as_str()) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate response_schema field '{}'", field.name),
            });
        }
    }

    Ok(())
}
