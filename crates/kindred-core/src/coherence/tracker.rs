//! Multi-turn coherence tracking.
//!
//! A tracker belongs to one conversation line. It keeps a bounded history
//! of post-turn snapshots (oldest evicted first) and compares the newest
//! against an older one to detect mood and identity drift.

use std::collections::{BTreeSet, VecDeque};

use kindred_types::coherence::{
    DriftReport, InvariantReport, InvariantViolation, Severity, TurnStateSnapshot,
};
use kindred_types::config::CoherenceConfig;
use kindred_types::identity::{IdentityKernel, IdentitySnapshot};
use tracing::info;

pub const MOOD_DRIFT_REASON: &str = "Significant emotional shift detected over history";
pub const IDENTITY_DRIFT_REASON: &str = "Identity traits diverged from earlier turns";

#[derive(Debug, Clone)]
pub struct CoherenceTracker {
    history: VecDeque<TurnStateSnapshot>,
    config: CoherenceConfig,
}

impl Default for CoherenceTracker {
    fn default() -> Self {
        Self::new(CoherenceConfig::default())
    }
}

impl CoherenceTracker {
    pub fn new(config: CoherenceConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.history_capacity
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history(&self) -> impl Iterator<Item = &TurnStateSnapshot> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&TurnStateSnapshot> {
        self.history.back()
    }

    /// Append a snapshot, evicting the oldest when full.
    pub fn push(&mut self, snapshot: TurnStateSnapshot) {
        if self.config.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(snapshot);
    }

    /// Claims from every retained snapshot, oldest first.
    pub fn prior_claims(&self) -> Vec<String> {
        self.history
            .iter()
            .flat_map(|s| s.claims.iter().cloned())
            .collect()
    }

    pub fn detect_drift(&self) -> DriftReport {
        let snapshots: Vec<&TurnStateSnapshot> = self.history.iter().collect();
        self.drift_over(&snapshots)
    }

    /// Drift as it would be after `pending` is pushed, without pushing it.
    pub fn detect_drift_with(&self, pending: &TurnStateSnapshot) -> DriftReport {
        let mut snapshots: Vec<&TurnStateSnapshot> = self.history.iter().collect();
        snapshots.push(pending);
        let overflow = snapshots.len().saturating_sub(self.config.history_capacity.max(1));
        self.drift_over(&snapshots[overflow..])
    }

    fn drift_over(&self, snapshots: &[&TurnStateSnapshot]) -> DriftReport {
        let n = snapshots.len();
        if n < self.config.min_history.max(1) {
            return DriftReport::insufficient_history();
        }

        let recent = snapshots[n - 1];
        let historical = snapshots[n - self.config.drift_lookback.clamp(1, n)];

        let mood_drift = ((recent.mood.valence - historical.mood.valence).abs()
            + (recent.mood.arousal - historical.mood.arousal).abs())
            / 2.0;
        let identity_drift = trait_distance(&historical.identity.kernel, &recent.identity.kernel);

        let mut reasons = Vec::new();
        if mood_drift > self.config.mood_drift_threshold {
            reasons.push(MOOD_DRIFT_REASON);
        }
        if identity_drift > self.config.identity_drift_threshold {
            reasons.push(IDENTITY_DRIFT_REASON);
        }
        let drift_detected = !reasons.is_empty();
        if drift_detected {
            info!(mood_drift, identity_drift, "drift detected");
        }

        DriftReport {
            drift_detected,
            reason: reasons.join("; "),
            mood_drift,
            identity_drift,
        }
    }

    /// Flags a response that talks about itself ("I am") without using
    /// the identity's name.
    pub fn check_invariants(&self, response: &str, identity: &IdentitySnapshot) -> InvariantReport {
        let mut violations = Vec::new();
        if response.contains("I am")
            && !response
                .to_lowercase()
                .contains(&identity.kernel.name.to_lowercase())
        {
            violations.push(InvariantViolation {
                id: "id_01".to_string(),
                message: "Identity name mismatch in response".to_string(),
                severity: Severity::Warn,
            });
        }
        InvariantReport::from_violations(violations)
    }
}

/// Jaccard distance between the value and domain sets of two kernels.
pub fn trait_distance(a: &IdentityKernel, b: &IdentityKernel) -> f64 {
    let traits = |k: &IdentityKernel| -> BTreeSet<String> {
        k.core_values
            .iter()
            .chain(&k.expertise_domains)
            .map(|t| t.to_lowercase())
            .collect()
    };
    let (ta, tb) = (traits(a), traits(b));
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    1.0 - ta.intersection(&tb).count() as f64 / union as f64
}
