//! Read-only budget projection for display.
//!
//! Limits are enforced server-side; this only turns the latest
//! [`BudgetUsage`] into numbers a UI can render.

use serde::Serialize;

use crate::types::BudgetUsage;

/// Display view of a session's resource usage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub total_tokens: u64,
    pub credits_used: f64,
    pub credits_max: f64,
    /// Percentage of `credits_max` used, clamped to `[0, 100]`.
    pub percent_used: f64,
    /// True when the server reported usage beyond the maximum.
    pub over_limit: bool,
}

pub struct BudgetTracker;

impl BudgetTracker {
    pub fn project(usage: &BudgetUsage) -> BudgetView {
        BudgetView {
            tokens_in: usage.tokens_in,
            tokens_out: usage.tokens_out,
            total_tokens: usage.tokens_in.saturating_add(usage.tokens_out),
            credits_used: usage.credits_used,
            credits_max: usage.credits_max,
            percent_used: percent(usage.credits_used, usage.credits_max),
            over_limit: usage.credits_max > 0.0 && usage.credits_used > usage.credits_max,
        }
    }
}

fn percent(used: f64, max: f64) -> f64 {
    if max <= 0.0 || used.is_nan() {
        return 0.0;
    }
    (used / max * 100.0).clamp(0.0, 100.0)
}

impl crate::session::AgentSession {
    pub fn budget_view(&self) -> BudgetView {
        BudgetTracker::project(&self.budget)
    }
}
