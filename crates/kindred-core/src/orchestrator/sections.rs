//! Prompt text built by the orchestrator.

use kindred_types::coherence::ContradictionReport;
use kindred_types::identity::IdentitySnapshot;
use kindred_types::mood::PadState;

use crate::memory::service::NO_CONTEXT_SENTINEL;
use crate::mood::{MoodModulation, describe};
use crate::prompt::SectionSpec;

/// Everything that goes into one turn prompt.
#[derive(Debug, Clone, Copy)]
pub struct TurnPromptParts<'a> {
    pub system: &'a str,
    pub identity: &'a IdentitySnapshot,
    pub mood: &'a MoodModulation,
    pub memory: &'a str,
    pub recall: &'a str,
    pub request: &'a str,
}

/// Sections in prompt order: SYSTEM, IDENTITY, MOOD, MEMORY, RECALL, REQUEST.
pub fn turn_sections(parts: &TurnPromptParts<'_>) -> Vec<SectionSpec> {
    let memory = if parts.memory.is_empty() {
        NO_CONTEXT_SENTINEL
    } else {
        parts.memory
    };
    vec![
        SectionSpec::new("system", parts.system)
            .critical()
            .with_priority(1),
        SectionSpec::new("identity", parts.identity.to_prompt_text())
            .critical()
            .with_priority(1)
            .with_title("IDENTITY SNAPSHOT"),
        SectionSpec::new("mood", parts.mood.text.as_str()).with_priority(2),
        SectionSpec::new("memory", memory).with_priority(2),
        SectionSpec::new("recall", parts.recall)
            .with_priority(3)
            .with_title("RELEVANT PAST EXCHANGES"),
        SectionSpec::new("request", parts.request)
            .critical()
            .with_priority(1),
    ]
}

/// Host system prompt with the active identity and mood appended.
pub fn wrap_system_prompt(
    marker: &str,
    base: &str,
    identity: &IdentitySnapshot,
    mood: &PadState,
) -> String {
    format!(
        "[{marker}]\n{base}\n\n[IDENTITY]: {} ({}) v{}\n[MOOD]: {}",
        identity.kernel.name,
        identity.kernel.role,
        identity.version,
        describe(mood)
    )
}

/// Retry prompt listing why the first response was rejected.
pub fn regeneration_prompt(report: &ContradictionReport, original_request: &str) -> String {
    let constraints = report
        .findings
        .iter()
        .map(|c| format!("- {}", c.reason))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "REGENERATE this response to avoid the following contradictions:\n{constraints}\n\nOriginal Request: {original_request}"
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kindred_types::coherence::{Contradiction, ContradictionKind, Severity};
    use kindred_types::mood::MoodSource;

    use super::*;
    use crate::mood::modulate;

    #[test]
    fn system_prompt_wrapper_format() {
        let identity = IdentitySnapshot::skeleton();
        let mood = PadState::baseline(Utc::now());
        let wrapped = wrap_system_prompt("KINDRED ACTIVE", "Be kind.", &identity, &mood);
        assert_eq!(
            wrapped,
            "[KINDRED ACTIVE]\nBe kind.\n\n[IDENTITY]: Kindred Assistant (helpful assistant) v0\n[MOOD]: negative, calm, submissive"
        );
    }

    #[test]
    fn regeneration_lists_every_reason() {
        let report = ContradictionReport {
            findings: vec![
                Contradiction {
                    kind: ContradictionKind::Identity,
                    severity: Severity::Error,
                    reason: "wrong name".to_string(),
                    evidence: Vec::new(),
                },
                Contradiction {
                    kind: ContradictionKind::CrossTurn,
                    severity: Severity::Warn,
                    reason: "said otherwise before".to_string(),
                    evidence: Vec::new(),
                },
            ],
        };
        assert_eq!(
            regeneration_prompt(&report, "hi"),
            "REGENERATE this response to avoid the following contradictions:\n- wrong name\n- said otherwise before\n\nOriginal Request: hi"
        );
    }

    #[test]
    fn sections_keep_order_and_criticality() {
        let identity = IdentitySnapshot::skeleton();
        let mood = modulate(&PadState::new(0.2, 0.1, 0.5, Utc::now(), MoodSource::Decay));
        let sections = turn_sections(&TurnPromptParts {
            system: "sys",
            identity: &identity,
            mood: &mood,
            memory: "",
            recall: "[No prior relevant context]",
            request: "hello",
        });
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["system", "identity", "mood", "memory", "recall", "request"]);
        let critical: Vec<&str> = sections
            .iter()
            .filter(|s| !s.degradable)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(critical, ["system", "identity", "request"]);
        assert_eq!(sections[3].content, NO_CONTEXT_SENTINEL);
    }
}
