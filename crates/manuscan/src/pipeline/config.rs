use secrecy::SecretString;

use crate::analysis::ModelParameters;
use crate::config::{effective_prompt, Config};
use crate::error::ConfigError;
use crate::normalize::{ExtractionStrategy, ResponseSchema};

/// Everything a batch needs, resolved once before it starts.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub prompt: String,
    pub parameters: ModelParameters,
    pub extraction: ExtractionStrategy,
    pub schema: ResponseSchema,
    /// Requested concurrency; see [`PipelineConfig::effective_workers`].
    pub workers: usize,
}

impl PipelineConfig {
    /// Resolves the prompt file and takes an optional per-run key override.
    pub fn from_config(
        config: &Config,
        api_key_override: Option<SecretString>,
    ) -> Result<Self, ConfigError> {
        let mut parameters = ModelParameters::new(config.model.clone(), config.temperature);
        parameters.api_key = api_key_override;

        Ok(Self {
            prompt: effective_prompt(config)?,
            parameters,
            extraction: config.pipeline.extraction,
            schema: ResponseSchema::new(config.response_schema.clone())
                .require_all_fields(config.pipeline.require_all_fields),
            workers: config.pipeline.workers,
        })
    }

    /// `workers` clamped to `1..=4 * cpus`.
    pub fn effective_workers(&self) -> usize {
        let max = num_cpus::get().max(1) * 4;
        self.workers.clamp(1, max)
    }
}
