use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

/// Tracks provider spend against a daily limit.
/// Thread-safe via atomics - checked on every provider call.
pub struct BudgetTracker {
    /// Daily limit in cents. 0 = unlimited.
    daily_limit_cents: u64,
    spent_cents: AtomicU64,
}

/// Estimated cost per operation in cents, rounded up.
pub struct OperationCost;

impl OperationCost {
    pub const SEARCH_QUERY: u64 = 1;
    pub const PAGE_SCRAPE: u64 = 1;
    pub const STEALTH_SCRAPE: u64 = 2;
    pub const LLM_RESEARCH: u64 = 2;
    pub const LLM_EXTRACTION: u64 = 1;
    pub const LLM_SYNTHESIS: u64 = 1;
}

impl BudgetTracker {
    pub fn new(daily_limit_cents: u64) -> Self {
        Self {
            daily_limit_cents,
            spent_cents: AtomicU64::new(0),
        }
    }

    /// Check if there's budget remaining for an operation.
    pub fn has_budget(&self, cost_cents: u64) -> bool {
        if self.daily_limit_cents == 0 {
            return true;
        }
        self.spent_cents.load(Ordering::Relaxed) + cost_cents <= self.daily_limit_cents
    }

    /// Record spend. Returns false if the limit is now exceeded (the spend is
    /// still recorded).
    pub fn spend(&self, cost_cents: u64) -> bool {
        let prev = self.spent_cents.fetch_add(cost_cents, Ordering::Relaxed);
        if self.daily_limit_cents > 0 && prev + cost_cents > self.daily_limit_cents {
            warn!(
                spent = prev + cost_cents,
                limit = self.daily_limit_cents,
                "Provider budget exceeded"
            );
            return false;
        }
        true
    }

    pub fn total_spent(&self) -> u64 {
        self.spent_cents.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> u64 {
        if self.daily_limit_cents == 0 {
            return u64::MAX;
        }
        self.daily_limit_cents
            .saturating_sub(self.spent_cents.load(Ordering::Relaxed))
    }

    pub fn is_active(&self) -> bool {
        self.daily_limit_cents > 0
    }

    pub fn log_status(&self) {
        if self.is_active() {
            info!(
                spent_cents = self.total_spent(),
                remaining_cents = self.remaining(),
                limit_cents = self.daily_limit_cents,
                "Budget status"
            );
        }
    }
}
