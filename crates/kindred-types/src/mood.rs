//! Pleasure-Arousal-Dominance emotional state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a [`PadState`] value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodSource {
    Baseline,
    Decay,
    Turn,
    Stored,
}

impl fmt::Display for MoodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoodSource::Baseline => write!(f, "baseline"),
            MoodSource::Decay => write!(f, "decay"),
            MoodSource::Turn => write!(f, "turn"),
            MoodSource::Stored => write!(f, "stored"),
        }
    }
}

impl FromStr for MoodSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(MoodSource::Baseline),
            "decay" => Ok(MoodSource::Decay),
            "turn" => Ok(MoodSource::Turn),
            "stored" => Ok(MoodSource::Stored),
            other => Err(format!("invalid mood source: '{other}'")),
        }
    }
}

/// Immutable emotional state. Each axis lies in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadState {
    pub valence: f64,
    pub arousal: f64,
    pub dominance: f64,
    pub timestamp: DateTime<Utc>,
    pub source: MoodSource,
}

impl PadState {
    pub const BASELINE_VALENCE: f64 = 0.0;
    pub const BASELINE_AROUSAL: f64 = 0.0;
    pub const BASELINE_DOMINANCE: f64 = 0.5;

    /// Build a state, clamping every axis into [-1, 1].
    pub fn new(
        valence: f64,
        arousal: f64,
        dominance: f64,
        timestamp: DateTime<Utc>,
        source: MoodSource,
    ) -> Self {
        Self {
            valence: valence.clamp(-1.0, 1.0),
            arousal: arousal.clamp(-1.0, 1.0),
            dominance: dominance.clamp(-1.0, 1.0),
            timestamp,
            source,
        }
    }

    /// The resting state every mood decays toward.
    pub fn baseline(timestamp: DateTime<Utc>) -> Self {
        Self::new(
            Self::BASELINE_VALENCE,
            Self::BASELINE_AROUSAL,
            Self::BASELINE_DOMINANCE,
            timestamp,
            MoodSource::Baseline,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_axes() {
        let state = PadState::new(2.0, -3.0, 0.25, Utc::now(), MoodSource::Turn);
        assert_eq!(state.valence, 1.0);
        assert_eq!(state.arousal, -1.0);
        assert_eq!(state.dominance, 0.25);
    }

    #[test]
    fn test_baseline_values() {
        let state = PadState::baseline(Utc::now());
        assert_eq!(state.valence, 0.0);
        assert_eq!(state.arousal, 0.0);
        assert_eq!(state.dominance, 0.5);
        assert_eq!(state.source, MoodSource::Baseline);
    }

    #[test]
    fn test_mood_source_parse() {
        assert_eq!("Decay".parse::<MoodSource>().unwrap(), MoodSource::Decay);
        assert!("angry".parse::<MoodSource>().is_err());
    }
}
