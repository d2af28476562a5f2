//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string used in log fields (e.g. "generate", "batch").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Batch { .. } => "batch",
        Commands::Tiers { .. } => "tiers",
    }
}
