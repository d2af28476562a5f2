//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_batch_summary, format_tiers_json, format_tiers_text, report_file_name,
    BatchConsoleObserver, ConsoleObserver, WrittenReport,
};
pub use route::RunContext;
