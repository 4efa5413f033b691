//! Per-turn metrics recording.
//!
//! The orchestrator hands every completed turn's [`TurnMetrics`] to a
//! [`MetricsSink`]. Sink failures are logged by the caller and never fail
//! the turn.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use kindred_types::turn::TurnMetrics;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics sink unavailable: {0}")]
    Unavailable(String),
}

pub trait MetricsSink: Send + Sync {
    fn record(&self, metrics: &TurnMetrics) -> Result<(), MetricsError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record(&self, _metrics: &TurnMetrics) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Forwards to several sinks. Every sink sees every record; the first
/// error is returned after all have run.
#[derive(Default, Clone)]
pub struct FanoutMetricsSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl MetricsSink for FanoutMetricsSink {
    fn record(&self, metrics: &TurnMetrics) -> Result<(), MetricsError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(metrics) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub turns: usize,
    pub avg_latency_ms: f64,
    pub total_tokens: u64,
    pub total_contradictions: u64,
}

pub const DEFAULT_METRICS_CAPACITY: usize = 1000;

/// Keeps the most recent turn metrics in memory.
#[derive(Debug)]
pub struct MetricsRecorder {
    entries: Mutex<VecDeque<TurnMetrics>>,
    capacity: usize,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_METRICS_CAPACITY)
    }
}

impl MetricsRecorder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_METRICS_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    pub fn recent(&self) -> Vec<TurnMetrics> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let entries = self.recent();
        if entries.is_empty() {
            return MetricsSummary::default();
        }
        let total_latency: u64 = entries.iter().map(|m| m.latency_ms).sum();
        MetricsSummary {
            turns: entries.len(),
            avg_latency_ms: total_latency as f64 / entries.len() as f64,
            total_tokens: entries.iter().map(|m| u64::from(m.tokens_used)).sum(),
            total_contradictions: entries
                .iter()
                .map(|m| u64::from(m.contradiction_count))
                .sum(),
        }
    }
}

impl MetricsSink for MetricsRecorder {
    fn record(&self, metrics: &TurnMetrics) -> Result<(), MetricsError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| MetricsError::Unavailable(e.to_string()))?;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(metrics.clone());
        Ok(())
    }
}
