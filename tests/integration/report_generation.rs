//! Integration tests for end-to-end report generation

use folio::generation::{
    clean, degraded_placeholder, Backoff, PlanContext, ReportOrchestrator, RetryPolicy,
    SectionDescriptor, SectionExecutor, SectionPlan, SectionStatus, SECTION_SEPARATOR,
};
use folio::provider::Fragment;
use folio::{Job, ModelTier, ReportError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::integration::{RecordingObserver, Reply, ScriptedService};

fn plan_of(titles: &'static [&'static str]) -> impl Fn(&PlanContext) -> SectionPlan + Send + Sync {
    move |_| {
        SectionPlan::from_sections(
            titles
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    SectionDescriptor::new(format!("S{}", i + 1), *title, "Write for {name}.")
                })
                .collect(),
        )
    }
}

fn orchestrator(
    service: Arc<ScriptedService>,
    titles: &'static [&'static str],
) -> ReportOrchestrator {
    let executor = SectionExecutor::new(service)
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO, Backoff::Linear));
    ReportOrchestrator::new(executor).with_plan_builder(plan_of(titles))
}

#[tokio::test]
async fn split_name_marker_is_detected_once_and_stripped() {
    let service = Arc::new(ScriptedService::new(vec![
        Reply::chunks(&["[[NAME: Bu", "di]]\nHello"]),
        Reply::text("## Two\nMore."),
        Reply::text("## Three\nEnd."),
    ]));
    let observer = RecordingObserver::default();
    let mut job = Job::new("").with_source_text("Lagna: Leo");

    let outcome = orchestrator(service.clone(), &["One", "Two", "Three"])
        .run(&mut job, &observer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(*observer.names.lock(), vec!["Budi".to_string()]);
    assert_eq!(job.display_name, "Budi");
    assert!(observer
        .contents
        .lock()
        .iter()
        .any(|content| content == "Hello"));
    assert!(observer
        .contents
        .lock()
        .iter()
        .all(|content| !content.contains("[[")));
    assert!(outcome.text.starts_with("Hello"));
    assert!(service.prompts()[1].contains("Write for Budi."));
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let service = Arc::new(ScriptedService::new(vec![
        Reply::text("Opening."),
        Reply::transient(),
        Reply::transient(),
        Reply::text("## Two\nReal content."),
    ]));
    let observer = RecordingObserver::default();
    let mut job = Job::new("Ana").with_source_text("chart");

    let outcome = orchestrator(service.clone(), &["One", "Two"])
        .run(&mut job, &observer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(service.calls(), 4);
    assert!(outcome.text.contains("Real content."));
    assert!(!outcome.text.contains(&degraded_placeholder("Two")));
    let section_two_statuses = observer
        .statuses
        .lock()
        .iter()
        .filter(|label| label.contains("Two"))
        .count();
    assert!(section_two_statuses >= 3);
    assert_eq!(outcome.sections[1].attempts, 3);
    assert_eq!(outcome.sections[1].status, SectionStatus::Success);
}

#[tokio::test]
async fn exhausted_section_degrades_without_failing_the_run() {
    let service = Arc::new(ScriptedService::new(Vec::new()).with_fallback(Reply::transient()));
    let mut job = Job::new("Ana").with_source_text("chart");

    let outcome = orchestrator(service.clone(), &["Only"])
        .run(&mut job, &RecordingObserver::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(service.calls(), 3);
    assert_eq!(outcome.text, degraded_placeholder("Only"));
    assert_eq!(outcome.text.matches(&degraded_placeholder("Only")).count(), 1);
    assert_eq!(outcome.degraded_sections(), 1);
}

#[tokio::test]
async fn report_is_the_ordered_join_of_cleaned_sections() {
    let service = Arc::new(ScriptedService::new(vec![
        Reply::text("Dear Ana. [[CONTEXT_FOR_NEXT: opened]]"),
        Reply::Fail(ReportError::ProviderAuthFailed("bad key".to_string())),
        Reply::chunks(&["## Three\nClosing", " words. [[CONTEXT_FOR_", "NEXT: done]]"]),
    ]));
    let mut job = Job::new("Ana").with_source_text("chart");

    let outcome = orchestrator(service.clone(), &["One", "Two", "Three"])
        .run(&mut job, &RecordingObserver::default(), &CancellationToken::new())
        .await
        .unwrap();

    let expected = [
        clean("Dear Ana. [[CONTEXT_FOR_NEXT: opened]]"),
        degraded_placeholder("Two"),
        clean("## Three\nClosing words. [[CONTEXT_FOR_NEXT: done]]"),
    ]
    .join(SECTION_SEPARATOR);
    assert_eq!(outcome.text, expected);
    // Auth failures are not retried.
    assert_eq!(service.calls(), 3);
    // A degraded section leaves the previous handoff in place.
    assert!(service.prompts()[1].contains("opened"));
    assert!(service.prompts()[2].contains("opened"));
}

#[tokio::test]
async fn usage_accumulates_across_sections_at_tier_prices() {
    let service = Arc::new(ScriptedService::new(vec![
        Reply::Fragments(vec![
            Fragment::text("One."),
            Fragment::usage(1_000, 200),
            Fragment::usage(1_000, 500),
        ]),
        Reply::Fragments(vec![Fragment::text("Two.").with_usage(2_000, 500)]),
    ]));
    let observer = RecordingObserver::default();
    let mut job = Job::new("Ana")
        .with_source_text("chart")
        .with_tier(ModelTier::Pro3);

    let outcome = orchestrator(service, &["One", "Two"])
        .run(&mut job, &observer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.usage.input_tokens, 3_000);
    assert_eq!(outcome.usage.output_tokens, 1_000);
    let pricing = ModelTier::Pro3.pricing();
    let expected = 3_000.0 / 1e6 * pricing.input_per_million + 1_000.0 / 1e6 * pricing.output_per_million;
    assert!((outcome.usage.total_cost - expected).abs() < 1e-12);
    assert_eq!(observer.usages.lock().last().copied(), Some(outcome.usage));
}

#[tokio::test]
async fn every_request_carries_model_and_system_instruction() {
    let service = Arc::new(ScriptedService::new(Vec::new()));
    let mut job = Job::new("Ana")
        .with_source_text("chart")
        .with_tier(ModelTier::Flash25);

    orchestrator(service.clone(), &["One", "Two"])
        .run(&mut job, &RecordingObserver::default(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.system_instruction, folio::generation::SYSTEM_INSTRUCTION);
    }
}

#[tokio::test]
async fn full_consultation_plan_runs_all_chapters() {
    let service = Arc::new(ScriptedService::new(Vec::new()));
    let executor = SectionExecutor::new(service.clone())
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO, Backoff::Linear));
    let mut job = Job::new("Ana")
        .with_source_text("chart")
        .with_period("2025-03".parse().unwrap());

    let outcome = ReportOrchestrator::new(executor)
        .run(&mut job, &RecordingObserver::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(service.calls(), 15);
    assert_eq!(outcome.sections.len(), 15);
    assert!(service
        .prompts()
        .iter()
        .any(|prompt| prompt.contains("MARCH 2025")));
}
