//! Integration tests for sequential batch processing

use folio::batch::{BatchCoordinator, BatchItem, BatchObserver, BatchStatus};
use folio::generation::{
    Backoff, ReportOrchestrator, RetryPolicy, SectionDescriptor, SectionExecutor, SectionPlan,
};
use folio::{Attachment, Job};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::integration::{Reply, ScriptedService};

fn coordinator(service: Arc<ScriptedService>) -> BatchCoordinator {
    let executor = SectionExecutor::new(service)
        .with_retry_policy(RetryPolicy::new(2, Duration::ZERO, Backoff::Linear));
    let orchestrator = ReportOrchestrator::new(executor).with_plan_builder(|_| {
        SectionPlan::from_sections(vec![
            SectionDescriptor::new("OPEN", "Opening", "Greet {name}."),
            SectionDescriptor::new("CLOSE", "Closing", "Close for {name}."),
        ])
    });
    BatchCoordinator::new(Arc::new(orchestrator))
}

#[derive(Default)]
struct Snapshots(Mutex<Vec<BatchItem>>);

impl BatchObserver for Snapshots {
    fn on_item_changed(&self, item: &BatchItem) {
        self.0.lock().push(item.clone());
    }
}

#[tokio::test]
async fn invalid_job_does_not_stop_later_jobs() {
    let service = Arc::new(ScriptedService::new(Vec::new()));
    let coordinator = coordinator(service.clone());
    let jobs = vec![
        Job::new("Ana").with_source_text("chart a"),
        Job::new("Empty"),
        Job::new("Budi").with_source_text("chart b"),
    ];

    let summary = coordinator
        .run_batch(jobs, &Snapshots::default(), &CancellationToken::new())
        .await;

    let statuses: Vec<BatchStatus> = coordinator.items().iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![BatchStatus::Completed, BatchStatus::Error, BatchStatus::Completed]
    );
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    // The invalid job never reached the provider.
    assert_eq!(service.calls(), 4);
}

#[tokio::test]
async fn jobs_run_one_at_a_time_in_submission_order() {
    let service = Arc::new(ScriptedService::new(Vec::new()));
    let coordinator = coordinator(service.clone());
    let observer = Snapshots::default();
    let jobs = vec![
        Job::new("First").with_source_text("one"),
        Job::new("Second").with_source_text("two"),
    ];

    coordinator
        .run_batch(jobs, &observer, &CancellationToken::new())
        .await;

    let prompts = service.prompts();
    assert!(prompts[0].contains("Greet First."));
    assert!(prompts[1].contains("Close for First."));
    assert!(prompts[2].contains("Greet Second."));
    assert!(prompts[3].contains("Close for Second."));

    // Never two items processing at once.
    let snapshots = observer.0.lock();
    let mut processing: Vec<String> = Vec::new();
    for snapshot in snapshots.iter() {
        let name = snapshot.job.display_name.clone();
        match snapshot.status {
            BatchStatus::Processing => {
                if !processing.contains(&name) {
                    processing.push(name);
                }
            }
            _ => processing.retain(|n| n != &name),
        }
        assert!(processing.len() <= 1);
    }
}

#[tokio::test]
async fn detected_name_is_scoped_to_its_own_item() {
    let service = Arc::new(ScriptedService::new(vec![
        Reply::text("[[NAME: Budi]] Hello."),
        Reply::text("## Closing\nBye."),
        Reply::text("Hi there."),
        Reply::text("## Closing\nBye."),
    ]));
    let coordinator = coordinator(service);
    let jobs = vec![
        Job::new("").with_source_text("one"),
        Job::new("Citra").with_source_text("two"),
    ];
    let ids: Vec<_> = jobs.iter().map(|j| j.id.clone()).collect();

    coordinator
        .run_batch(jobs, &Snapshots::default(), &CancellationToken::new())
        .await;

    let first = coordinator.item(&ids[0]).unwrap();
    let second = coordinator.item(&ids[1]).unwrap();
    assert_eq!(first.job.display_name, "Budi");
    assert_eq!(first.content, "Hello.\n\n## Closing\nBye.");
    assert_eq!(second.job.display_name, "Citra");
    assert_eq!(second.content, "Hi there.\n\n## Closing\nBye.");
}

#[tokio::test]
async fn cancelling_mid_batch_marks_current_item_and_leaves_rest_pending() {
    struct CancelOnFirstContent(CancellationToken);
    impl BatchObserver for CancelOnFirstContent {
        fn on_item_changed(&self, item: &BatchItem) {
            if !item.content.is_empty() {
                self.0.cancel();
            }
        }
    }

    let service = Arc::new(ScriptedService::new(Vec::new()));
    let coordinator = coordinator(service.clone());
    let cancel = CancellationToken::new();
    let jobs = vec![
        Job::new("Ana").with_source_text("one"),
        Job::new("Budi").with_source_text("two"),
        Job::new("Citra").with_source_text("three"),
    ];

    let summary = coordinator
        .run_batch(jobs, &CancelOnFirstContent(cancel.clone()), &cancel)
        .await;

    assert!(summary.cancelled);
    let items = coordinator.items();
    assert_eq!(items[0].status, BatchStatus::Error);
    assert_eq!(items[0].error.as_deref(), Some("cancelled"));
    assert_eq!(items[1].status, BatchStatus::Pending);
    assert_eq!(items[2].status, BatchStatus::Pending);
    assert_eq!(summary.pending, 2);
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn attachment_jobs_carry_inline_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("budi_santoso.png");
    std::fs::write(&path, [0x89u8, b'P', b'N', b'G']).unwrap();

    let job = Job::from_attachment_path(&path).unwrap();
    assert_eq!(job.display_name, "budi santoso");

    let service = Arc::new(ScriptedService::new(Vec::new()));
    let coordinator = coordinator(service.clone());
    let summary = coordinator
        .run_batch(
            vec![job.with_attachment(Attachment::new("notes.txt", None, b"extra".to_vec()))],
            &Snapshots::default(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.completed, 1);
    let request = &service.requests()[0];
    let inline: Vec<&str> = request
        .parts
        .iter()
        .filter_map(|part| match part {
            folio::provider::ContentPart::InlineData(data) => Some(data.media_type.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(inline, vec!["image/png", "text/plain"]);
    assert!(request.prompt_text().contains("See attached files."));
}
