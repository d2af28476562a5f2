//! Sectioned report generation.

pub mod executor;
pub mod markers;
pub mod observer;
pub mod orchestrator;
pub mod plan;
pub mod retry;

pub use executor::{
    build_prompt, degraded_placeholder, status_label, RunContext, SectionExecutor,
    SectionOutcome, SectionStatus, SECTION_SEPARATOR,
};
pub use markers::{clean, display_text, extract_handoff_context, extract_name, NameDetector};
pub use observer::{NoopObserver, ReportObserver};
pub use orchestrator::{ReportOrchestrator, ReportOutcome};
pub use plan::{
    consultation_plan, PlanBuilder, PlanContext, SectionDescriptor, SectionPlan,
    SYSTEM_INSTRUCTION,
};
pub use retry::{Backoff, RetryPolicy};
