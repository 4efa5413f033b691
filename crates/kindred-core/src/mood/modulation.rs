//! Turning a mood into prompt text and sampling hints.

use kindred_types::mood::PadState;

/// Prompt text and sampling parameters derived from a mood.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodModulation {
    pub text: String,
    pub temperature: f64,
    pub top_p: f64,
}

pub fn describe_valence(state: &PadState) -> &'static str {
    if state.valence > 0.0 { "positive" } else { "negative" }
}

pub fn describe_arousal(state: &PadState) -> &'static str {
    if state.arousal > 0.3 { "high intensity" } else { "calm" }
}

pub fn describe_dominance(state: &PadState) -> &'static str {
    if state.dominance > 0.5 { "dominant" } else { "submissive" }
}

/// Short one-line description, e.g. `positive, calm, submissive`.
pub fn describe(state: &PadState) -> String {
    format!(
        "{}, {}, {}",
        describe_valence(state),
        describe_arousal(state),
        describe_dominance(state)
    )
}

/// Higher arousal samples hotter; higher valence widens the nucleus.
pub fn modulate(state: &PadState) -> MoodModulation {
    let text = format!(
        "[MOOD CONTEXT] Current emotional state: {} valence ({:.2}), {} arousal ({:.2}), {} stance ({:.2}). \
         Respond in a way that reflects this emotional state.",
        describe_valence(state),
        state.valence,
        describe_arousal(state),
        state.arousal,
        describe_dominance(state),
        state.dominance,
    );
    MoodModulation {
        text,
        temperature: (0.3 + 0.7 * state.arousal).clamp(0.0, 2.0),
        top_p: (0.7 + 0.2 * state.valence).clamp(0.0, 1.0),
    }
}
