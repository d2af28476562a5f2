//! Merge rules: built-in defaults every later source overrides.

use crate::usage::ModelTier;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("generation.default_tier", ModelTier::default().model_id())?
        .set_default("generation.max_attempts", 3)?
        .set_default("generation.backoff_base_ms", 2000)?
        .set_default("generation.backoff", "linear")?
        .set_default("generation.call_timeout_secs", 120)?
        .set_default("generation.temperature", 0.7)?
        .set_default("provider.api_key_env", "GEMINI_API_KEY")
}
