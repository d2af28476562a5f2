//! Section executor: runs one section of a report against the generation service.
//! Owns prompt building, streaming, marker extraction, usage and retry; the
//! orchestrator only decides which section runs next.

use crate::error::ReportError;
use crate::generation::markers::{display_text, extract_handoff_context, NameDetector};
use crate::generation::observer::ReportObserver;
use crate::generation::plan::{PlanContext, SectionDescriptor, SYSTEM_INSTRUCTION};
use crate::generation::retry::RetryPolicy;
use crate::provider::{
    AttachmentEncoder, Base64AttachmentEncoder, ContentPart, GenerationRequest, GenerationService,
};
use crate::types::Job;
use crate::usage::{CallUsage, ModelTier, UsageStats, UsageTracker};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Joins committed sections in the cumulative report.
pub const SECTION_SEPARATOR: &str = "\n\n";

pub const START_OF_SESSION: &str = "Start of session.";
pub const DEFAULT_CONCERNS: &str = "General";
pub const NO_SOURCE_TEXT: &str = "See attached files.";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Mutable state of one report run, threaded through every section.
#[derive(Debug)]
pub struct RunContext {
    sections: Vec<String>,
    rolling_context: String,
    display_name: String,
    name_detector: NameDetector,
    usage: UsageTracker,
    tier: ModelTier,
}

impl RunContext {
    pub fn new(display_name: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            sections: Vec::new(),
            rolling_context: String::new(),
            display_name: display_name.into(),
            name_detector: NameDetector::new(),
            usage: UsageTracker::new(),
            tier,
        }
    }

    pub fn cumulative_text(&self) -> String {
        self.sections.join(SECTION_SEPARATOR)
    }

    /// Committed text followed by the cleaned in-flight section.
    pub fn live_view(&self, in_flight: &str) -> String {
        if in_flight.is_empty() {
            return self.cumulative_text();
        }
        if self.sections.is_empty() {
            return in_flight.to_string();
        }
        let mut view = self.cumulative_text();
        view.push_str(SECTION_SEPARATOR);
        view.push_str(in_flight);
        view
    }

    pub fn committed_sections(&self) -> &[String] {
        &self.sections
    }

    pub fn rolling_context(&self) -> &str {
        &self.rolling_context
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn name_detected(&self) -> bool {
        self.name_detector.has_reported()
    }

    pub fn usage(&self) -> UsageStats {
        self.usage.snapshot(self.tier)
    }

    pub fn plan_context(&self, period_label: &str) -> PlanContext {
        PlanContext::new(self.display_name.clone(), period_label)
    }

    fn commit(&mut self, text: String) {
        self.sections.push(text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionStatus {
    Success,
    /// Committed as a placeholder after a non-retryable error or exhausted retries.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutcome {
    pub id: String,
    pub title: String,
    pub status: SectionStatus,
    pub attempts: usize,
    pub error: Option<String>,
}

pub fn status_label(title: &str, attempt: usize) -> String {
    if attempt <= 1 {
        format!("Analyzing {}...", title)
    } else {
        format!("Analyzing {}... (retry {})", title, attempt - 1)
    }
}

pub fn degraded_placeholder(title: &str) -> String {
    format!(
        "*(Section \"{}\" was skipped after repeated generation failures; continuing with the next section.)*",
        title
    )
}

/// Build the user prompt for one section.
pub fn build_prompt(
    section: &SectionDescriptor,
    plan_context: &PlanContext,
    context: &RunContext,
    job: &Job,
) -> String {
    let previous = if context.rolling_context.trim().is_empty() {
        START_OF_SESSION
    } else {
        context.rolling_context.trim()
    };
    let concerns = if job.concerns.trim().is_empty() {
        DEFAULT_CONCERNS
    } else {
        job.concerns.trim()
    };
    let source = if job.source_text.trim().is_empty() {
        NO_SOURCE_TEXT
    } else {
        job.source_text.trim()
    };

    let mut prompt = format!(
        "[PREVIOUS CONTEXT]: {}\n[CLIENT CONCERNS]: \"{}\"\n[CLIENT NAME]: {}\n[TASK]: {}\n[CHART DATA]: {}",
        previous,
        concerns,
        plan_context.display_name,
        section.render(plan_context),
        source
    );
    if !section.is_first {
        prompt.push_str(&format!(
            "\n[FORMAT]: This continues an ongoing letter. Do not greet the client again and add no preamble; begin directly with the heading \"## {}\".",
            section.title
        ));
    }
    prompt.push_str(
        "\n\nEnd your answer with [[CONTEXT_FOR_NEXT: (a brief technical summary of this chapter to guide the next one)]]",
    );
    prompt
}

/// Executes single sections with retry and degradation.
pub struct SectionExecutor {
    service: Arc<dyn GenerationService>,
    encoder: Arc<dyn AttachmentEncoder>,
    policy: RetryPolicy,
    call_timeout: Duration,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl SectionExecutor {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            encoder: Arc::new(Base64AttachmentEncoder),
            policy: RetryPolicy::default(),
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_output_tokens: None,
        }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn AttachmentEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Run one section to `Success` or `Degraded`. Only cancellation is an error.
    pub async fn execute(
        &self,
        section: &SectionDescriptor,
        plan_context: &PlanContext,
        context: &mut RunContext,
        job: &Job,
        observer: &dyn ReportObserver,
        cancel: &CancellationToken,
    ) -> Result<SectionOutcome, ReportError> {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(ReportError::Cancelled);
            }
            observer.on_status(&status_label(&section.title, attempt));
            let started = Instant::now();

            match self
                .run_attempt(section, plan_context, context, job, observer, cancel)
                .await
            {
                Ok(raw) => {
                    // A missing handoff marker resets the rolling context.
                    context.rolling_context = extract_handoff_context(&raw).unwrap_or_default();
                    context.commit(display_text(&raw));
                    observer.on_content(&context.cumulative_text());
                    info!(
                        job_id = %job.id,
                        section_id = %section.id,
                        attempt,
                        duration_ms = started.elapsed().as_millis() as u64,
                        output_chars = raw.len(),
                        "Section generated"
                    );
                    return Ok(SectionOutcome {
                        id: section.id.clone(),
                        title: section.title.clone(),
                        status: SectionStatus::Success,
                        attempts: attempt,
                        error: None,
                    });
                }
                Err(ReportError::Cancelled) => return Err(ReportError::Cancelled),
                Err(err) => {
                    if self.policy.should_retry(&err, attempt) {
                        let delay = self.policy.delay_for(attempt);
                        warn!(
                            job_id = %job.id,
                            section_id = %section.id,
                            attempt,
                            max_attempts = self.policy.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Section attempt failed, retrying"
                        );
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(ReportError::Cancelled),
                            _ = sleep(delay) => {}
                        }
                        continue;
                    }

                    warn!(
                        job_id = %job.id,
                        section_id = %section.id,
                        attempt,
                        retryable = err.is_retryable(),
                        error = %err,
                        "Section degraded to placeholder"
                    );
                    context.commit(degraded_placeholder(&section.title));
                    observer.on_content(&context.cumulative_text());
                    return Ok(SectionOutcome {
                        id: section.id.clone(),
                        title: section.title.clone(),
                        status: SectionStatus::Degraded,
                        attempts: attempt,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
    }

    fn build_request(
        &self,
        section: &SectionDescriptor,
        plan_context: &PlanContext,
        context: &RunContext,
        job: &Job,
    ) -> Result<GenerationRequest, ReportError> {
        let mut parts = vec![ContentPart::Text(build_prompt(
            section,
            plan_context,
            context,
            job,
        ))];
        for attachment in &job.attachments {
            parts.push(ContentPart::InlineData(self.encoder.encode(attachment)?));
        }
        Ok(GenerationRequest {
            model: job.tier.model_id().to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            parts,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        })
    }

    /// One streamed call. Returns the raw section text including markers.
    async fn run_attempt(
        &self,
        section: &SectionDescriptor,
        plan_context: &PlanContext,
        context: &mut RunContext,
        job: &Job,
        observer: &dyn ReportObserver,
        cancel: &CancellationToken,
    ) -> Result<String, ReportError> {
        let request = self.build_request(section, plan_context, context, job)?;
        debug!(
            job_id = %job.id,
            section_id = %section.id,
            provider = self.service.provider_name(),
            model = %request.model,
            prompt_chars = request.prompt_text().len(),
            "Opening section stream"
        );

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::Cancelled),
            opened = timeout(self.call_timeout, self.service.stream_generate(request)) => {
                opened.map_err(|_| ReportError::ProviderTimeout(self.call_timeout))??
            }
        };

        let mut buffer = String::new();
        let mut call_usage = CallUsage::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReportError::Cancelled),
                next = timeout(self.call_timeout, stream.next()) => {
                    next.map_err(|_| ReportError::ProviderTimeout(self.call_timeout))?
                }
            };
            let Some(item) = next else {
                break;
            };
            let fragment = item?;

            if let Some(text) = fragment.text.filter(|t| !t.is_empty()) {
                buffer.push_str(&text);
                if section.is_first {
                    if let Some(name) = context.name_detector.scan(&buffer) {
                        info!(job_id = %job.id, name = %name, "Client name detected");
                        context.display_name = name.clone();
                        observer.on_name_detected(&name);
                    }
                }
                observer.on_content(&context.live_view(&display_text(&buffer)));
            }

            if let Some(usage) = fragment.usage {
                let (input_delta, output_delta) =
                    call_usage.delta(usage.prompt_tokens, usage.completion_tokens);
                let stats = context.usage.record(input_delta, output_delta, job.tier);
                observer.on_usage(&stats);
            }
        }
        Ok(buffer)
    }
}
