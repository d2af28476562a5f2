//! Integration tests for the Folio report generation system

mod batch_processing;
mod config_integration;
mod logging_default;
mod report_generation;

pub use test_utils::{with_xdg_env, RecordingObserver, Reply, ScriptedService};
