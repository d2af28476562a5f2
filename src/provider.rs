//! Generation Service Abstraction
//!
//! The core talks to the generative model through [`GenerationService`], which
//! opens one streamed call per section attempt. Streams are lazy and
//! cancelable by dropping them; a failed call is never resumed, only reissued.
//! Attachments are converted to the transport's inline representation by an
//! [`AttachmentEncoder`] before the call is made.

use crate::error::ReportError;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub mod attachments;
pub mod gemini;

pub use attachments::{AttachmentEncoder, Base64AttachmentEncoder, EncodedAttachment};
pub use gemini::GeminiClient;

/// One ordered piece of the user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    Text(String),
    InlineData(EncodedAttachment),
}

/// A single streamed generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    /// Passed verbatim on every call; the model keeps no memory between calls.
    pub system_instruction: String,
    pub parts: Vec<ContentPart>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Concatenated text parts, mostly useful for logging and tests.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::InlineData(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage reported by the provider for the call so far (cumulative).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One streamed fragment: optional text, optional cumulative usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: Option<String>,
    pub usage: Option<FragmentUsage>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            usage: None,
        }
    }

    pub fn usage(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            text: None,
            usage: Some(FragmentUsage {
                prompt_tokens,
                completion_tokens,
            }),
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(FragmentUsage {
            prompt_tokens,
            completion_tokens,
        });
        self
    }
}

/// Streaming generation type
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, ReportError>> + Send>>;

/// Generative text service client trait
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Open a streamed generation call
    async fn stream_generate(&self, request: GenerationRequest)
        -> Result<FragmentStream, ReportError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Map an HTTP status from the provider into a report error.
pub(crate) fn map_status_error(status: u16, body: &str) -> ReportError {
    match status {
        401 | 403 => ReportError::ProviderAuthFailed(format!("Authentication failed: {}", body)),
        429 => ReportError::ProviderRateLimit(format!("Rate limit exceeded: {}", body)),
        404 => ReportError::ProviderModelNotFound(format!("Model not found: {}", body)),
        _ => ReportError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, body
        )),
    }
}

// Helper function to map transport errors to ReportError
pub(crate) fn map_http_error(error: reqwest::Error) -> ReportError {
    if let Some(status) = error.status() {
        map_status_error(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ReportError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ReportError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        ReportError::ProviderError(format!("HTTP error: {}", error))
    }
}
