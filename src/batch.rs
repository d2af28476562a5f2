//! Batch coordination: many independent jobs, one at a time, in submission order.
//!
//! Each job's failure (an error or a panic escaping the orchestrator) is
//! isolated to its own item; the batch moves on to the next one. Items live
//! behind a lock so a display thread can take snapshots while a batch runs.

use crate::error::ReportError;
use crate::generation::{NoopObserver, ReportObserver, ReportOrchestrator};
use crate::types::{Job, JobId};
use crate::usage::UsageStats;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// One job plus its lifecycle state.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub job: Job,
    pub status: BatchStatus,
    /// Live text while processing, final report once completed
    pub content: String,
    pub usage: Option<UsageStats>,
    pub error: Option<String>,
    pub status_label: Option<String>,
}

impl BatchItem {
    fn new(job: Job) -> Self {
        Self {
            job,
            status: BatchStatus::Pending,
            content: String::new(),
            usage: None,
            error: None,
            status_label: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.job.id
    }
}

/// Receives every item change.
pub trait BatchObserver: Send + Sync {
    fn on_item_changed(&self, _item: &BatchItem) {}
}

impl BatchObserver for NoopObserver {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub cancelled: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
}

pub struct BatchCoordinator {
    orchestrator: Arc<ReportOrchestrator>,
    items: RwLock<Vec<BatchItem>>,
}

impl BatchCoordinator {
    pub fn new(orchestrator: Arc<ReportOrchestrator>) -> Self {
        Self {
            orchestrator,
            items: RwLock::new(Vec::new()),
        }
    }

    /// Add a job as `Pending`.
    pub fn enqueue(&self, job: Job) -> JobId {
        let id = job.id.clone();
        self.items.write().push(BatchItem::new(job));
        id
    }

    /// Remove an item that is not currently processing.
    pub fn remove(&self, id: &JobId) -> Result<BatchItem, ReportError> {
        let mut items = self.items.write();
        let index = items
            .iter()
            .position(|item| &item.job.id == id)
            .ok_or_else(|| ReportError::InvalidJob(format!("No batch item with id {}", id)))?;
        if items[index].status == BatchStatus::Processing {
            return Err(ReportError::InvalidJob(format!(
                "Batch item {} is processing and cannot be removed",
                id
            )));
        }
        Ok(items.remove(index))
    }

    pub fn items(&self) -> Vec<BatchItem> {
        self.items.read().clone()
    }

    pub fn item(&self, id: &JobId) -> Option<BatchItem> {
        self.items
            .read()
            .iter()
            .find(|item| &item.job.id == id)
            .cloned()
    }

    /// Enqueue `jobs` and process every pending item.
    pub async fn run_batch(
        &self,
        jobs: Vec<Job>,
        observer: &dyn BatchObserver,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        for job in jobs {
            self.enqueue(job);
        }
        self.process_pending(observer, cancel).await
    }

    /// Process pending items strictly in submission order until none remain
    /// or the batch is cancelled.
    pub async fn process_pending(
        &self,
        observer: &dyn BatchObserver,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let started = Instant::now();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(mut job) = self.start_next(observer) else {
                break;
            };
            let id = job.id.clone();

            info!(job_id = %id, name = %job.display_name, "Batch item started");
            let scoped = ItemObserver {
                coordinator: self,
                id: id.clone(),
                observer,
            };
            let result = AssertUnwindSafe(self.orchestrator.run(&mut job, &scoped, cancel))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(outcome)) => {
                    info!(
                        job_id = %id,
                        degraded = outcome.degraded_sections(),
                        cost = %outcome.usage.cost_label(),
                        "Batch item completed"
                    );
                    self.update(&id, observer, |item| {
                        item.status = BatchStatus::Completed;
                        item.content = outcome.text;
                        item.usage = Some(outcome.usage);
                        item.job.display_name = outcome.display_name;
                        item.status_label = None;
                    });
                }
                Ok(Err(ReportError::Cancelled)) => {
                    warn!(job_id = %id, "Batch cancelled while processing item");
                    self.update(&id, observer, |item| {
                        item.status = BatchStatus::Error;
                        item.error = Some("cancelled".to_string());
                        item.status_label = None;
                    });
                    cancelled = true;
                    break;
                }
                Ok(Err(err)) => {
                    warn!(job_id = %id, error = %err, "Batch item failed");
                    self.update(&id, observer, |item| {
                        item.status = BatchStatus::Error;
                        item.error = Some(err.to_string());
                        item.status_label = None;
                    });
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(job_id = %id, panic = %message, "Batch item panicked");
                    self.update(&id, observer, |item| {
                        item.status = BatchStatus::Error;
                        item.error = Some(format!("internal error: {}", message));
                        item.status_label = None;
                    });
                }
            }
        }

        let summary = self.summarize(cancelled);
        info!(
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed,
            pending = summary.pending,
            cancelled = summary.cancelled,
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );
        summary
    }

    /// Mark the first pending item `Processing` and hand out a copy of its job.
    fn start_next(&self, observer: &dyn BatchObserver) -> Option<Job> {
        let snapshot = {
            let mut items = self.items.write();
            let item = items
                .iter_mut()
                .find(|item| item.status == BatchStatus::Pending)?;
            item.status = BatchStatus::Processing;
            item.content.clear();
            item.error = None;
            item.clone()
        };
        observer.on_item_changed(&snapshot);
        Some(snapshot.job)
    }

    fn update<F>(&self, id: &JobId, observer: &dyn BatchObserver, apply: F)
    where
        F: FnOnce(&mut BatchItem),
    {
        let snapshot = {
            let mut items = self.items.write();
            let Some(item) = items.iter_mut().find(|item| &item.job.id == id) else {
                return;
            };
            apply(item);
            item.clone()
        };
        observer.on_item_changed(&snapshot);
    }

    fn summarize(&self, cancelled: bool) -> BatchSummary {
        let items = self.items.read();
        let mut summary = BatchSummary {
            total: items.len(),
            cancelled,
            ..BatchSummary::default()
        };
        for item in items.iter() {
            match item.status {
                BatchStatus::Completed => summary.completed += 1,
                BatchStatus::Error => summary.failed += 1,
                BatchStatus::Pending | BatchStatus::Processing => summary.pending += 1,
            }
            if let Some(usage) = item.usage {
                summary.input_tokens += usage.input_tokens;
                summary.output_tokens += usage.output_tokens;
                summary.total_cost += usage.total_cost;
            }
        }
        summary
    }
}

/// Routes one run's notifications to its own batch item only.
struct ItemObserver<'a> {
    coordinator: &'a BatchCoordinator,
    id: JobId,
    observer: &'a dyn BatchObserver,
}

impl ReportObserver for ItemObserver<'_> {
    fn on_content(&self, text: &str) {
        self.coordinator.update(&self.id, self.observer, |item| {
            item.content = text.to_string();
        });
    }

    fn on_status(&self, label: &str) {
        self.coordinator.update(&self.id, self.observer, |item| {
            item.status_label = Some(label.to_string());
        });
    }

    fn on_usage(&self, stats: &UsageStats) {
        self.coordinator.update(&self.id, self.observer, |item| {
            item.usage = Some(*stats);
        });
    }

    fn on_name_detected(&self, name: &str) {
        self.coordinator.update(&self.id, self.observer, |item| {
            item.job.display_name = name.to_string();
        });
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
