//! Report orchestrator: drives a section plan through the executor in order.

use crate::error::ReportError;
use crate::generation::executor::{RunContext, SectionExecutor, SectionOutcome, SectionStatus};
use crate::generation::observer::ReportObserver;
use crate::generation::plan::{consultation_plan, PlanBuilder, PlanContext, SectionPlan};
use crate::types::{AnalysisPeriod, Job};
use crate::usage::UsageStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Result of one finished report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub text: String,
    pub usage: UsageStats,
    pub display_name: String,
    pub sections: Vec<SectionOutcome>,
}

impl ReportOutcome {
    pub fn degraded_sections(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.status == SectionStatus::Degraded)
            .count()
    }
}

pub struct ReportOrchestrator {
    executor: SectionExecutor,
    plan_builder: Arc<PlanBuilder>,
}

impl ReportOrchestrator {
    pub fn new(executor: SectionExecutor) -> Self {
        Self {
            executor,
            plan_builder: Arc::new(consultation_plan),
        }
    }

    pub fn with_plan_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&PlanContext) -> SectionPlan + Send + Sync + 'static,
    {
        self.plan_builder = Arc::new(builder);
        self
    }

    fn build_plan(&self, context: &PlanContext) -> Result<SectionPlan, ReportError> {
        let plan = (self.plan_builder)(context);
        plan.validate()?;
        Ok(plan)
    }

    /// Generate the full report for `job`. A detected name is written back
    /// into `job.display_name`.
    pub async fn run(
        &self,
        job: &mut Job,
        observer: &dyn ReportObserver,
        cancel: &CancellationToken,
    ) -> Result<ReportOutcome, ReportError> {
        job.validate()?;
        let started = Instant::now();
        let period_label = AnalysisPeriod::label_for(job.period.as_ref());
        let mut context = RunContext::new(job.initial_display_name(), job.tier);

        let total = self
            .build_plan(&context.plan_context(&period_label))?
            .len();
        info!(
            job_id = %job.id,
            tier = %job.tier,
            sections = total,
            attachments = job.attachments.len(),
            "Report generation started"
        );

        let mut outcomes = Vec::with_capacity(total);
        for index in 0..total {
            if cancel.is_cancelled() {
                info!(job_id = %job.id, completed = index, "Report generation cancelled");
                return Err(ReportError::Cancelled);
            }

            // Rebuilt every time so a freshly detected name reaches later prompts.
            let plan_context = context.plan_context(&period_label);
            let plan = self.build_plan(&plan_context)?;
            let section = plan.get(index).ok_or_else(|| {
                ReportError::InvalidPlan(format!(
                    "Plan shrank to {} sections while running section {}",
                    plan.len(),
                    index + 1
                ))
            })?;

            let outcome = self
                .executor
                .execute(section, &plan_context, &mut context, job, observer, cancel)
                .await?;
            if context.name_detected() && job.display_name != context.display_name() {
                job.display_name = context.display_name().to_string();
            }
            observer.on_usage(&context.usage());
            outcomes.push(outcome);
        }

        let outcome = ReportOutcome {
            text: context.cumulative_text(),
            usage: context.usage(),
            display_name: context.display_name().to_string(),
            sections: outcomes,
        };
        info!(
            job_id = %job.id,
            duration_ms = started.elapsed().as_millis() as u64,
            degraded = outcome.degraded_sections(),
            input_tokens = outcome.usage.input_tokens,
            output_tokens = outcome.usage.output_tokens,
            cost = %outcome.usage.cost_label(),
            "Report generation completed"
        );
        Ok(outcome)
    }
}
