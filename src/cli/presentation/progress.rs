//! Live progress on stderr; stdout stays reserved for report output.

use crate::batch::{BatchItem, BatchObserver, BatchStatus};
use crate::generation::ReportObserver;
use crate::types::JobId;
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Prints status labels and the detected name for a single report.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ReportObserver for ConsoleObserver {
    fn on_status(&self, label: &str) {
        eprintln!("{} {}", "›".cyan(), label);
    }

    fn on_name_detected(&self, name: &str) {
        eprintln!("{} client name detected: {}", "›".cyan(), name.bold());
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SeenState {
    status: BatchStatus,
    label: Option<String>,
}

/// Prints one line per status or label change of each batch item.
#[derive(Default)]
pub struct BatchConsoleObserver {
    seen: Mutex<HashMap<JobId, SeenState>>,
}

impl BatchConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchObserver for BatchConsoleObserver {
    fn on_item_changed(&self, item: &BatchItem) {
        let state = SeenState {
            status: item.status,
            label: item.status_label.clone(),
        };
        let mut seen = self.seen.lock();
        let previous = seen.insert(item.job.id.clone(), state.clone());
        if previous.as_ref() == Some(&state) {
            return;
        }
        let status_changed = previous.map(|p| p.status) != Some(item.status);
        let name = &item.job.display_name;

        match item.status {
            BatchStatus::Processing if status_changed => {
                eprintln!("{} {}", "▶".cyan(), name.bold());
            }
            BatchStatus::Processing => {
                if let Some(label) = &item.status_label {
                    eprintln!("  {} {}", "›".dimmed(), label);
                }
            }
            BatchStatus::Completed => {
                let cost = item.usage.map(|u| u.cost_label()).unwrap_or_default();
                eprintln!("{} {} {}", "✓".green(), name.bold(), cost.dimmed());
            }
            BatchStatus::Error => {
                let reason = item.error.as_deref().unwrap_or("unknown error");
                eprintln!("{} {}: {}", "✗".red(), name.bold(), reason);
            }
            BatchStatus::Pending => {}
        }
    }
}
