//! CLI parse: clap types for Folio. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folio CLI - chaptered consultation reports from a streaming model
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Generate chaptered astrology consultation reports section by section")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config/ is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one report
    Generate {
        /// Client name; detected from the chart when omitted
        #[arg(long)]
        name: Option<String>,
        /// Text file with chart data
        #[arg(long)]
        source: Option<PathBuf>,
        /// Chart file sent inline to the model (repeatable)
        #[arg(long = "attach")]
        attach: Vec<PathBuf>,
        /// Client concerns the report should focus on
        #[arg(long, default_value = "")]
        concerns: String,
        /// Analysis period (YYYY-MM)
        #[arg(long)]
        period: Option<String>,
        /// Model tier id (see `folio tiers`)
        #[arg(long)]
        tier: Option<String>,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate one report per chart file, sequentially
    Batch {
        /// Chart files; each becomes one job named after its file stem
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Client concerns applied to every job
        #[arg(long, default_value = "")]
        concerns: String,
        /// Analysis period (YYYY-MM)
        #[arg(long)]
        period: Option<String>,
        /// Model tier id (see `folio tiers`)
        #[arg(long)]
        tier: Option<String>,
        /// Directory receiving one markdown file per completed job
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
    },
    /// Show model tiers and pricing
    Tiers {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
