use crate::usage::UsageStats;

/// Live notifications from a report run. Every method defaults to a no-op.
pub trait ReportObserver: Send + Sync {
    /// Full report text so far: committed sections plus the in-flight one.
    fn on_content(&self, _text: &str) {}

    fn on_status(&self, _label: &str) {}

    fn on_usage(&self, _stats: &UsageStats) {}

    fn on_name_detected(&self, _name: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReportObserver for NoopObserver {}
