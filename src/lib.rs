//! Folio: Sectioned Report Generation
//!
//! Produces long, multi-chapter consultation reports by driving a streaming
//! text-generation model one section at a time, carrying a short handoff
//! context between calls, and processing batches of jobs sequentially.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod provider;
pub mod types;
pub mod usage;

pub use batch::{BatchCoordinator, BatchItem, BatchObserver, BatchStatus, BatchSummary};
pub use error::ReportError;
pub use generation::{ReportObserver, ReportOrchestrator, ReportOutcome, SectionExecutor};
pub use types::{AnalysisPeriod, Attachment, Job, JobId};
pub use usage::{ModelTier, UsageStats};
