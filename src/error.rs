//! Error types for the Folio report generation system.

use thiserror::Error;

/// Errors raised while planning, generating, or coordinating reports.
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Provider call timed out after {0:?}")]
    ProviderTimeout(std::time::Duration),

    #[error("Malformed generation stream: {0}")]
    MalformedStream(String),

    #[error("Attachment encoding failed for '{file_name}': {reason}")]
    AttachmentEncoding { file_name: String, reason: String },

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Invalid section plan: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ReportError {
    /// Whether a section attempt that failed with this error is worth repeating.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::ProviderError(_) => true,
            ReportError::ProviderRequestFailed(_) => true,
            ReportError::ProviderRateLimit(_) => true,
            ReportError::ProviderTimeout(_) => true,
            ReportError::MalformedStream(_) => true,
            // Same input always fails the same way.
            ReportError::AttachmentEncoding { .. } => false,
            ReportError::ProviderAuthFailed(_) => false,
            ReportError::ProviderModelNotFound(_) => false,
            ReportError::InvalidJob(_) => false,
            ReportError::InvalidPlan(_) => false,
            ReportError::ConfigError(_) => false,
            ReportError::Io(_) => false,
            ReportError::Serialization(_) => false,
            ReportError::Cancelled => false,
        }
    }
}

impl From<config::ConfigError> for ReportError {
    fn from(err: config::ConfigError) -> Self {
        ReportError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err.to_string())
    }
}
