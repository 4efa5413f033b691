//! Exponential decay of PAD state toward baseline.

use chrono::{DateTime, Utc};
use kindred_types::config::MoodConfig;
use kindred_types::mood::{MoodSource, PadState};

/// Decays a mood toward the resting baseline `(0, 0, 0.5)`.
///
/// Pure: the same inputs always yield the same output, and nothing is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodDecayEngine {
    half_life_seconds: f64,
    inertia: f64,
}

impl Default for MoodDecayEngine {
    fn default() -> Self {
        Self::from_config(&MoodConfig::default())
    }
}

impl MoodDecayEngine {
    pub fn new(half_life_seconds: f64, inertia: f64) -> Self {
        Self {
            half_life_seconds,
            inertia,
        }
    }

    pub fn from_config(config: &MoodConfig) -> Self {
        Self::new(config.half_life_seconds, config.inertia)
    }

    /// Mood at `now`, given the last recorded mood.
    ///
    /// A `now` earlier than the last timestamp is treated as zero elapsed.
    pub fn decay(&self, last: &PadState, now: DateTime<Utc>) -> PadState {
        let elapsed = ((now - last.timestamp).num_milliseconds() as f64 / 1000.0).max(0.0);
        let factor = if self.half_life_seconds > 0.0 {
            (-std::f64::consts::LN_2 * elapsed / self.half_life_seconds).exp()
        } else {
            0.0
        };
        let keep = self.inertia * factor;

        let axis = |value: f64, baseline: f64| round4((baseline + (value - baseline) * keep).clamp(-1.0, 1.0));

        PadState {
            valence: axis(last.valence, PadState::BASELINE_VALENCE),
            arousal: axis(last.arousal, PadState::BASELINE_AROUSAL),
            dominance: axis(last.dominance, PadState::BASELINE_DOMINANCE),
            timestamp: now,
            source: MoodSource::Decay,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
