//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::batch::{BatchCoordinator, BatchStatus};
use crate::config::{ConfigLoader, FolioConfig};
use crate::error::ReportError;
use crate::generation::ReportOrchestrator;
use crate::types::{AnalysisPeriod, Attachment, Job};
use crate::usage::ModelTier;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::command_name;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_batch_summary, format_tiers_json, format_tiers_text, report_file_name,
    BatchConsoleObserver, ConsoleObserver, WrittenReport,
};

/// Runtime context for CLI execution: workspace and loaded configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: FolioConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ReportError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        config.ensure_valid()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ReportError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(
            command = name,
            workspace = %self.workspace_root.display(),
            "Command started"
        );
        let result = self.execute_inner(command);
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = name, duration_ms, "Command finished"),
            Err(e) => warn!(command = name, duration_ms, error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ReportError> {
        match command {
            Commands::Generate {
                name,
                source,
                attach,
                concerns,
                period,
                tier,
                output,
            } => {
                let job = self.build_job(
                    name.as_deref(),
                    source.as_deref(),
                    attach,
                    concerns,
                    period.as_deref(),
                    tier.as_deref(),
                )?;
                self.handle_generate(job, output.as_deref())
            }
            Commands::Batch {
                files,
                concerns,
                period,
                tier,
                output_dir,
            } => {
                let period = parse_period(period.as_deref())?;
                let tier = self.resolve_tier(tier.as_deref())?;
                let mut jobs = Vec::with_capacity(files.len());
                for file in files {
                    let mut job = Job::from_attachment_path(file)?
                        .with_concerns(concerns.clone())
                        .with_tier(tier);
                    job.period = period;
                    jobs.push(job);
                }
                self.handle_batch(jobs, output_dir)
            }
            Commands::Tiers { format } => match format.as_str() {
                "json" => format_tiers_json(),
                "text" => Ok(format_tiers_text()),
                other => Err(ReportError::ConfigError(format!(
                    "Unknown format '{}' (expected text or json)",
                    other
                ))),
            },
        }
    }

    fn build_job(
        &self,
        name: Option<&str>,
        source: Option<&Path>,
        attach: &[PathBuf],
        concerns: &str,
        period: Option<&str>,
        tier: Option<&str>,
    ) -> Result<Job, ReportError> {
        let mut job = Job::new(name.unwrap_or_default())
            .with_concerns(concerns)
            .with_tier(self.resolve_tier(tier)?);
        if let Some(source) = source {
            let text = std::fs::read_to_string(source).map_err(|e| {
                ReportError::Io(format!("Failed to read source {}: {}", source.display(), e))
            })?;
            job = job.with_source_text(text);
        }
        for path in attach {
            job = job.with_attachment(Attachment::from_path(path)?);
        }
        job.period = parse_period(period)?;
        job.validate()?;
        Ok(job)
    }

    fn resolve_tier(&self, tier: Option<&str>) -> Result<ModelTier, ReportError> {
        match tier {
            Some(id) => ModelTier::from_model_id(id).ok_or_else(|| {
                let known: Vec<&str> = ModelTier::ALL.iter().map(|t| t.model_id()).collect();
                ReportError::InvalidJob(format!(
                    "Unknown tier '{}' (expected one of: {})",
                    id,
                    known.join(", ")
                ))
            }),
            None => Ok(self.config.generation.tier()),
        }
    }

    fn orchestrator(&self) -> Result<ReportOrchestrator, ReportError> {
        let client = self.config.provider.build_client()?;
        let executor = self.config.generation.build_executor(Arc::new(client));
        Ok(ReportOrchestrator::new(executor))
    }

    fn handle_generate(&self, mut job: Job, output: Option<&Path>) -> Result<String, ReportError> {
        let orchestrator = self.orchestrator()?;
        let observer = ConsoleObserver::new();
        let outcome = run_cancellable(|cancel| async move {
            orchestrator.run(&mut job, &observer, &cancel).await
        })??;

        eprintln!(
            "Report for {}: {} sections, {} degraded, {} input / {} output tokens, {}",
            outcome.display_name,
            outcome.sections.len(),
            outcome.degraded_sections(),
            outcome.usage.input_tokens,
            outcome.usage.output_tokens,
            outcome.usage.cost_label()
        );

        match output {
            Some(path) => {
                write_report(path, &outcome.text)?;
                Ok(format!("Report written to {}", path.display()))
            }
            None => Ok(outcome.text),
        }
    }

    fn handle_batch(&self, jobs: Vec<Job>, output_dir: &Path) -> Result<String, ReportError> {
        let coordinator = BatchCoordinator::new(Arc::new(self.orchestrator()?));
        let observer = BatchConsoleObserver::new();
        let summary = run_cancellable(|cancel| {
            let coordinator = &coordinator;
            let observer = &observer;
            async move { coordinator.run_batch(jobs, observer, &cancel).await }
        })?;

        let items = coordinator.items();
        let mut written = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if item.status != BatchStatus::Completed {
                continue;
            }
            let path = output_dir.join(report_file_name(index + 1, &item.job.display_name));
            write_report(&path, &item.content)?;
            written.push(WrittenReport {
                id: item.id().clone(),
                path,
            });
        }
        Ok(format_batch_summary(&summary, &items, &written))
    }
}

/// Run `work` on a fresh runtime; Ctrl-C trips the token it receives.
fn run_cancellable<F, Fut, T>(work: F) -> Result<T, ReportError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T>,
{
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Io(format!("Failed to start async runtime: {}", e)))?;
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });
    Ok(rt.block_on(work(cancel)))
}

fn parse_period(period: Option<&str>) -> Result<Option<AnalysisPeriod>, ReportError> {
    period.map(str::parse::<AnalysisPeriod>).transpose()
}

fn write_report(path: &Path, text: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReportError::Io(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    std::fs::write(path, text)
        .map_err(|e| ReportError::Io(format!("Failed to write {}: {}", path.display(), e)))
}
