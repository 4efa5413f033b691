//! Rule checks of generated text against an identity's invariants.

use kindred_types::coherence::{InvariantReport, InvariantViolation, Severity};
use kindred_types::identity::{IdentityKernel, InvariantKind};

/// Case-insensitive substring checks, one per invariant.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvariantEngine;

impl InvariantEngine {
    pub fn validate(&self, text: &str, kernel: &IdentityKernel) -> InvariantReport {
        let haystack = text.to_lowercase();
        let violations = kernel
            .invariants
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| {
                let present = haystack.contains(&rule.pattern.to_lowercase());
                let message = match (rule.kind, present) {
                    (InvariantKind::Contains, false) => {
                        format!("Required pattern '{}' missing.", rule.pattern)
                    }
                    (InvariantKind::ContainsNot, true) => {
                        format!("Restricted pattern '{}' detected.", rule.pattern)
                    }
                    _ => return None,
                };
                Some(InvariantViolation {
                    id: format!("inv_{i:02}"),
                    message,
                    severity: Severity::Error,
                })
            })
            .collect();
        InvariantReport::from_violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use kindred_types::identity::{IdentitySnapshot, Invariant};

    use super::*;

    fn kernel(invariants: Vec<Invariant>) -> IdentityKernel {
        let mut k = IdentitySnapshot::skeleton().kernel;
        k.invariants = invariants;
        k
    }

    #[test]
    fn clean_text_passes() {
        let report = InvariantEngine.validate(
            "Happy to help with that.",
            &IdentitySnapshot::skeleton().kernel,
        );
        assert!(report.passed);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn restricted_pattern_is_case_insensitive() {
        let report = InvariantEngine.validate(
            "That would be ILLEGAL.",
            &IdentitySnapshot::skeleton().kernel,
        );
        assert!(!report.passed);
        assert_eq!(
            report.messages(),
            vec!["Restricted pattern 'illegal' detected.".to_string()]
        );
    }

    #[test]
    fn required_pattern_missing() {
        let k = kernel(vec![Invariant::contains("Cheers"), Invariant::contains_not("damn")]);
        let report = InvariantEngine.validate("Hello there", &k);
        assert_eq!(
            report.messages(),
            vec!["Required pattern 'Cheers' missing.".to_string()]
        );

        let report = InvariantEngine.validate("cheers, damn it", &k);
        assert_eq!(
            report.messages(),
            vec!["Restricted pattern 'damn' detected.".to_string()]
        );
    }

    #[test]
    fn no_invariants_always_pass() {
        let report = InvariantEngine.validate("anything at all", &kernel(Vec::new()));
        assert!(report.passed);
    }
}
