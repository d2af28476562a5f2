//! Configuration System
//!
//! Layered configuration for report generation: built-in defaults, the user's
//! global file, workspace files and `FOLIO__SECTION__KEY` environment
//! variables, in increasing precedence. Validation reports every problem at
//! once.

use crate::error::ReportError;
use crate::generation::{Backoff, RetryPolicy, SectionExecutor};
use crate::logging::LoggingConfig;
use crate::provider::{GenerationService, GeminiClient};
use crate::usage::ModelTier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Knobs of the section executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Model id of the tier used when a job does not pick one
    #[serde(default = "default_tier")]
    pub default_tier: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default)]
    pub backoff: Backoff,

    /// Bounds opening a stream and each wait for the next fragment
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_tier() -> String {
    ModelTier::default().model_id().to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_tier: default_tier(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff: Backoff::default(),
            call_timeout_secs: default_call_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: None,
        }
    }
}

impl GenerationSettings {
    pub fn tier(&self) -> ModelTier {
        ModelTier::resolve(&self.default_tier)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_base_ms),
            self.backoff,
        )
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn build_executor(&self, service: Arc<dyn GenerationService>) -> SectionExecutor {
        SectionExecutor::new(service)
            .with_retry_policy(self.retry_policy())
            .with_call_timeout(self.call_timeout())
            .with_temperature(Some(self.temperature))
            .with_max_output_tokens(self.max_output_tokens)
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if ModelTier::from_model_id(&self.default_tier).is_none() {
            let known: Vec<&str> = ModelTier::ALL.iter().map(|t| t.model_id()).collect();
            errors.push(format!(
                "Unknown default_tier '{}' (expected one of: {})",
                self.default_tier,
                known.join(", ")
            ));
        }
        if self.max_attempts == 0 {
            errors.push("max_attempts must be at least 1".to_string());
        }
        if self.call_timeout_secs == 0 {
            errors.push("call_timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.max_output_tokens == Some(0) {
            errors.push("max_output_tokens must be greater than 0 when set".to_string());
        }
        errors
    }
}

/// Gemini endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Inline key; prefer `api_key_env` outside of local experiments
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl ProviderSettings {
    /// Inline key first, then the named environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ReportError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ReportError::ConfigError(format!(
                    "No API key configured. Set provider.api_key or the {} environment variable.",
                    self.api_key_env
                ))
            })
    }

    pub fn build_client(&self) -> Result<GeminiClient, ReportError> {
        GeminiClient::new(self.resolve_api_key()?, self.base_url.clone())
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!("base_url must be an http(s) URL, got '{}'", url));
            }
        }
        if self.api_key_env.trim().is_empty() {
            errors.push("api_key_env cannot be empty".to_string());
        }
        errors
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Generation(String),
    Provider(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Generation(msg) => write!(f, "generation: {}", msg),
            ValidationError::Provider(msg) => write!(f, "provider: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn validate_logging(logging: &LoggingConfig) -> Vec<String> {
    let mut errors = Vec::new();
    const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
    if !LEVELS.contains(&logging.level.as_str()) {
        errors.push(format!("Invalid level '{}'", logging.level));
    }
    if logging.format != "text" && logging.format != "json" {
        errors.push(format!("Invalid format '{}'", logging.format));
    }
    if !crate::logging::is_valid_output(&logging.output) {
        errors.push(format!("Invalid output '{}'", logging.output));
    }
    errors
}

impl FolioConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = self
            .generation
            .validate()
            .into_iter()
            .map(ValidationError::Generation)
            .chain(
                self.provider
                    .validate()
                    .into_iter()
                    .map(ValidationError::Provider),
            )
            .chain(
                validate_logging(&self.logging)
                    .into_iter()
                    .map(ValidationError::Logging),
            )
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `validate` folded into a single error for callers that just need to stop.
    pub fn ensure_valid(&self) -> Result<(), ReportError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ReportError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
