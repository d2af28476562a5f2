//! Token usage accounting and tier pricing.
//!
//! Tiers form a closed set and every tier carries its own price record, so a
//! cost can never be computed against a missing table entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Selectable quality/cost/latency profile of the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTier {
    #[serde(rename = "gemini-2.5-flash")]
    Flash25,
    #[serde(rename = "gemini-3-flash-preview")]
    Flash3,
    #[serde(rename = "gemini-3-pro-preview")]
    Pro3,
}

/// Price per one million tokens, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelTier {
    pub const ALL: [ModelTier; 3] = [ModelTier::Flash25, ModelTier::Flash3, ModelTier::Pro3];

    /// Model id sent to the provider.
    pub fn model_id(self) -> &'static str {
        match self {
            ModelTier::Flash25 => "gemini-2.5-flash",
            ModelTier::Flash3 => "gemini-3-flash-preview",
            ModelTier::Pro3 => "gemini-3-pro-preview",
        }
    }

    pub fn pricing(self) -> TierPricing {
        match self {
            ModelTier::Flash25 => TierPricing {
                input_per_million: 0.30,
                output_per_million: 2.50,
            },
            ModelTier::Flash3 => TierPricing {
                input_per_million: 0.50,
                output_per_million: 3.00,
            },
            ModelTier::Pro3 => TierPricing {
                input_per_million: 2.00,
                output_per_million: 12.00,
            },
        }
    }

    pub fn from_model_id(id: &str) -> Option<ModelTier> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.model_id().eq_ignore_ascii_case(id))
    }

    /// Resolve a model id, falling back to the default tier for unknown ids.
    pub fn resolve(id: &str) -> ModelTier {
        Self::from_model_id(id).unwrap_or_else(|| {
            warn!(
                model_id = %id,
                fallback = %ModelTier::default(),
                "Unknown model tier, using default pricing"
            );
            ModelTier::default()
        })
    }
}

impl Default for ModelTier {
    fn default() -> Self {
        ModelTier::Flash3
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

/// Running token counts and the cost derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
}

impl UsageStats {
    /// Derive stats from totals. Cost is never patched incrementally.
    pub fn compute(input_tokens: u64, output_tokens: u64, tier: ModelTier) -> Self {
        let pricing = tier.pricing();
        let total_cost = (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million
            + (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million;
        Self {
            input_tokens,
            output_tokens,
            total_cost,
        }
    }

    /// Cost formatted the way it is shown to operators.
    pub fn cost_label(&self) -> String {
        format!("${:.4}", self.total_cost)
    }
}

/// Accumulates token deltas for one job.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    input_tokens: u64,
    output_tokens: u64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, input_delta: u64, output_delta: u64, tier: ModelTier) -> UsageStats {
        self.input_tokens = self.input_tokens.saturating_add(input_delta);
        self.output_tokens = self.output_tokens.saturating_add(output_delta);
        self.snapshot(tier)
    }

    pub fn snapshot(&self, tier: ModelTier) -> UsageStats {
        UsageStats::compute(self.input_tokens, self.output_tokens, tier)
    }
}

/// Turns the cumulative per-call counts a provider reports into deltas.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CallUsage {
    input_seen: u64,
    output_seen: u64,
}

impl CallUsage {
    pub(crate) fn delta(&mut self, input_total: u64, output_total: u64) -> (u64, u64) {
        let input_delta = input_total.saturating_sub(self.input_seen);
        let output_delta = output_total.saturating_sub(self.output_seen);
        self.input_seen = self.input_seen.max(input_total);
        self.output_seen = self.output_seen.max(output_total);
        (input_delta, output_delta)
    }
}
