//! Contradiction detection seam.
//!
//! The orchestrator asks a [`ContradictionDetector`] for findings after
//! generation. A report with `Error` severity triggers one regeneration.

use kindred_types::coherence::{Contradiction, ContradictionKind, ContradictionReport, Severity};
use kindred_types::identity::IdentitySnapshot;

/// Everything a detector may inspect for one response.
#[derive(Debug, Clone, Copy)]
pub struct ContradictionInput<'a> {
    pub response: &'a str,
    pub user_input: &'a str,
    pub identity: &'a IdentitySnapshot,
    /// Self-claims from earlier turns of the same session, oldest first.
    pub prior_claims: &'a [String],
}

/// Uses native async fn in traits (RPITIT).
///
/// Detectors are infallible: a detector that cannot decide reports nothing.
pub trait ContradictionDetector: Send + Sync {
    fn detect(
        &self,
        input: &ContradictionInput<'_>,
    ) -> impl std::future::Future<Output = ContradictionReport> + Send;
}

/// Reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContradictionDetector;

impl ContradictionDetector for NoopContradictionDetector {
    async fn detect(&self, _input: &ContradictionInput<'_>) -> ContradictionReport {
        ContradictionReport::clean()
    }
}

const NAME_INTRO: &str = "my name is ";

/// Flags a response that introduces itself under another name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfNameDetector;

impl SelfNameDetector {
    /// Names the text introduces itself with, excluding `own`.
    ///
    /// A claim that starts with every word of `own` is the identity's own
    /// name, whatever follows it. Any other claim is the leading run of
    /// capitalised words (or the first word), at most as long as `own`.
    fn foreign_names(text: &str, own: &str) -> Vec<String> {
        let own_words: Vec<String> = own.split_whitespace().map(str::to_lowercase).collect();
        let max_words = own_words.len().max(1);
        // ASCII lowering keeps byte offsets aligned with `text`.
        let lower = text.to_ascii_lowercase();
        lower
            .match_indices(NAME_INTRO)
            .filter_map(|(at, _)| {
                let rest = &text[at + NAME_INTRO.len()..];
                let end = rest
                    .find(['.', ',', '!', '?', ';', ':', '\n'])
                    .unwrap_or(rest.len());
                let words: Vec<&str> = rest[..end].split_whitespace().collect();
                if words.is_empty() {
                    return None;
                }
                let is_own = !own_words.is_empty()
                    && words.len() >= own_words.len()
                    && words
                        .iter()
                        .zip(&own_words)
                        .all(|(w, o)| w.to_lowercase() == *o);
                if is_own {
                    return None;
                }
                let capitalised = words
                    .iter()
                    .take(max_words)
                    .take_while(|w| w.chars().next().is_some_and(char::is_uppercase))
                    .count();
                let claimed = words[..capitalised.max(1)].join(" ").to_lowercase();
                Some(claimed)
            })
            .collect()
    }
}

impl ContradictionDetector for SelfNameDetector {
    async fn detect(&self, input: &ContradictionInput<'_>) -> ContradictionReport {
        let findings = Self::foreign_names(input.response, &input.identity.kernel.name)
            .into_iter()
            .map(|claimed| Contradiction {
                kind: ContradictionKind::Identity,
                severity: Severity::Error,
                reason: format!(
                    "Response claims the name '{claimed}' but the identity is '{}'",
                    input.identity.kernel.name
                ),
                evidence: vec![input.response.to_string()],
            })
            .collect();
        ContradictionReport { findings }
    }
}
