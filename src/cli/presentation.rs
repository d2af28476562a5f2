//! CLI presentation: text and json formatters plus live console progress.

mod batch;
mod progress;
mod tiers;

pub use batch::{format_batch_summary, report_file_name, WrittenReport};
pub use progress::{BatchConsoleObserver, ConsoleObserver};
pub use tiers::{format_tiers_json, format_tiers_text};
