//! Gemini streaming client (`streamGenerateContent` with server-sent events).

use super::{
    map_http_error, map_status_error, ContentPart, Fragment, FragmentStream, FragmentUsage,
    GenerationRequest, GenerationService,
};
use crate::error::ReportError;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, ReportError> {
        if api_key.trim().is_empty() {
            return Err(ReportError::ConfigError(
                "Gemini API key is required".to_string(),
            ));
        }
        // No overall request timeout: streams run long and the executor
        // bounds each wait itself.
        let client = Client::builder()
            .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ReportError::ProviderError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, ReportError> {
        let body = WireRequest::from(&request);
        let url = self.stream_url(&request.model);
        debug!(model = %request.model, parts = request.parts.len(), "Opening Gemini stream");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, &error_text));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_http_error));
        Ok(fragment_stream(bytes))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

/// Turn a stream of raw SSE bytes into decoded fragments.
pub(crate) fn fragment_stream<S, B>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, ReportError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct State<S> {
        bytes: Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<Result<Fragment, ReportError>>,
        finished: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let decoded = state.decoder.push(chunk.as_ref());
                    state.pending.extend(decoded);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    state.pending.push_back(Err(err));
                }
                None => {
                    state.finished = true;
                    let decoded = state.decoder.finish();
                    state.pending.extend(decoded);
                }
            }
        }
    }))
}

/// Incremental decoder for `data:` lines. Buffers bytes so multi-byte
/// characters split across chunks survive.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Result<Fragment, ReportError>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = decode_line(&String::from_utf8_lossy(&line)) {
                out.push(item);
            }
        }
        out
    }

    pub(crate) fn finish(&mut self) -> Vec<Result<Fragment, ReportError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn decode_line(line: &str) -> Option<Result<Fragment, ReportError>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(match serde_json::from_str::<WireChunk>(data) {
        Ok(chunk) => chunk.into_fragment(),
        Err(e) => Err(ReportError::MalformedStream(format!(
            "Failed to parse stream chunk: {}",
            e
        ))),
    })
}

// Gemini wire structures

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    system_instruction: WireSystemInstruction,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: WireInlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl From<&GenerationRequest> for WireRequest {
    fn from(request: &GenerationRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => WirePart::Text { text: text.clone() },
                ContentPart::InlineData(encoded) => WirePart::Inline {
                    inline_data: WireInlineData {
                        mime_type: encoded.media_type.clone(),
                        data: encoded.data.clone(),
                    },
                },
            })
            .collect();
        Self {
            contents: vec![WireContent {
                role: "user",
                parts,
            }],
            system_instruction: WireSystemInstruction {
                parts: vec![WirePart::Text {
                    text: request.system_instruction.clone(),
                }],
            },
            generation_config: WireGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChunk {
    candidates: Option<Vec<WireCandidate>>,
    usage_metadata: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: Option<WireCandidateContent>,
}

#[derive(Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
struct WireResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

impl WireChunk {
    fn into_fragment(self) -> Result<Fragment, ReportError> {
        if let Some(error) = self.error {
            return Err(ReportError::ProviderError(error.message));
        }
        let text: String = self
            .candidates
            .unwrap_or_default()
            .into_iter()
            .take(1)
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect();
        Ok(Fragment {
            text: if text.is_empty() { None } else { Some(text) },
            usage: self.usage_metadata.map(|usage| FragmentUsage {
                prompt_tokens: usage.prompt_token_count.unwrap_or(0),
                completion_tokens: usage.candidates_token_count.unwrap_or(0),
            }),
        })
    }
}
