pub mod loader;
pub mod prompt;
pub mod schema;

pub use loader::{
    default_config_path, effective_prompt, load_config, load_config_from_str, save_config,
    validate_config, ConfigFormat,
};
pub use prompt::{DEFAULT_PROMPT, SYSTEM_PROMPT};
pub use schema::{ApiConfig, Config, ModelName, PipelineSettings, Provider};
