//! Per-turn token ledger for prompt sections.
//!
//! A `TokenBudget` is built fresh for every turn: a ceiling on total input
//! tokens, an optional cap per component, and a running allocation ledger.
//! Allocation either commits fully or leaves the ledger untouched.

use std::collections::BTreeMap;

use kindred_types::config::BudgetConfig;
use kindred_types::turn::BudgetReport;
use tracing::{debug, warn};

/// Capped token ledger for one turn's prompt.
#[derive(Debug, Clone)]
pub struct TokenBudget {
    available_input: u32,
    caps: BTreeMap<String, u32>,
    allocations: BTreeMap<String, u32>,
    used: u32,
}

impl TokenBudget {
    /// Build a budget from the model's context window.
    ///
    /// The ceiling is `floor(total_context * safety_buffer) - reserved_output`,
    /// saturating at zero.
    pub fn new(
        total_context: u32,
        reserved_output: u32,
        safety_buffer: f64,
        caps: BTreeMap<String, u32>,
    ) -> Self {
        let usable = (f64::from(total_context) * safety_buffer).floor().max(0.0) as u32;
        Self::with_ceiling(usable.saturating_sub(reserved_output), caps)
    }

    /// Build a budget with an explicit ceiling.
    pub fn with_ceiling(ceiling: u32, caps: BTreeMap<String, u32>) -> Self {
        Self {
            available_input: ceiling,
            caps,
            allocations: BTreeMap::new(),
            used: 0,
        }
    }

    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(
            config.total_context,
            config.reserved_output,
            config.safety_buffer,
            config.caps.clone(),
        )
    }

    /// Try to reserve `tokens` for `component`.
    ///
    /// Returns `false` without touching the ledger when this request alone
    /// exceeds the component cap, or when the running total would pass the
    /// overall ceiling. Caps bound single requests, not a component's sum.
    pub fn allocate(&mut self, component: &str, tokens: u32) -> bool {
        let cap = self.cap_for(component);

        if tokens > cap {
            warn!(
                component,
                requested = tokens,
                cap,
                "allocation exceeds component cap"
            );
            return false;
        }

        let Some(new_used) = self.used.checked_add(tokens) else {
            return false;
        };
        if new_used > self.available_input {
            debug!(
                component,
                requested = tokens,
                used = self.used,
                ceiling = self.available_input,
                "allocation exceeds input ceiling"
            );
            return false;
        }

        self.used = new_used;
        *self.allocations.entry(component.to_string()).or_insert(0) += tokens;
        true
    }

    /// Cap for a component; uncapped components are bounded by the ceiling.
    pub fn cap_for(&self, component: &str) -> u32 {
        self.caps
            .get(component)
            .copied()
            .unwrap_or(self.available_input)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn available_input(&self) -> u32 {
        self.available_input
    }

    pub fn remaining(&self) -> u32 {
        self.available_input.saturating_sub(self.used)
    }

    pub fn report(&self) -> BudgetReport {
        let utilization = if self.available_input == 0 {
            1.0
        } else {
            f64::from(self.used) / f64::from(self.available_input)
        };
        BudgetReport {
            used: self.used,
            available: self.available_input,
            utilization,
            sections: self.allocations.clone(),
        }
    }
}

/// How a turn's output tokens are split, scaled by the current arousal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodAllocation {
    /// Upper bound for the generated response.
    pub response: u32,
    /// Allowance for the retrieved-memory blocks.
    pub memory_context: u32,
}

/// Calm moods get shorter answers, aroused moods longer ones.
///
/// `response = floor(base * (0.8 + 0.4 * arousal))`, `memory_context = base / 4`.
pub fn mood_aware_allocation(arousal: f64, base: u32) -> MoodAllocation {
    let scale = 0.8 + 0.4 * arousal.clamp(-1.0, 1.0);
    MoodAllocation {
        response: (f64::from(base) * scale).floor().max(0.0) as u32,
        memory_context: base / 4,
    }
}
