//! Section-by-section prompt assembly under a token budget.
//!
//! Sections are emitted in exactly the order given. Each is formatted with
//! a `---` / `## TITLE` header, counted, and charged against the budget
//! under its lower-cased name. When the budget refuses a section:
//! - degradable sections are replaced by a short omission placeholder;
//! - non-degradable sections are included anyway.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::budget::TokenBudget;

use super::tokenizer::Tokenizer;

/// One named block of the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    pub name: String,
    pub content: String,
    /// Informational; order is always the order of the input slice.
    pub priority: i32,
    pub degradable: bool,
    /// Header text. Defaults to the upper-cased name.
    pub display_title: Option<String>,
}

impl SectionSpec {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            priority: 0,
            degradable: true,
            display_title: None,
        }
    }

    pub fn critical(mut self) -> Self {
        self.degradable = false;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.display_title = Some(title.into());
        self
    }

    pub fn header(&self) -> String {
        self.display_title
            .clone()
            .unwrap_or_else(|| self.name.to_uppercase())
    }
}

/// Output of [`PromptAssembler::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    /// Names of sections replaced by a placeholder.
    pub degraded: Vec<String>,
    /// Names of non-degradable sections included past the budget.
    pub forced: Vec<String>,
}

/// Canonical section layout.
pub fn format_section(header: &str, content: &str) -> String {
    format!("---\n## {header}\n{content}\n")
}

/// Builds the final prompt text from ordered section specs.
#[derive(Clone)]
pub struct PromptAssembler {
    tokenizer: Arc<dyn Tokenizer>,
}

impl PromptAssembler {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn count_tokens(&self, text: &str) -> u32 {
        u32::try_from(self.tokenizer.count_tokens(text)).unwrap_or(u32::MAX)
    }

    pub fn assemble(&self, sections: &[SectionSpec], budget: &mut TokenBudget) -> AssembledPrompt {
        let mut parts = Vec::with_capacity(sections.len());
        let mut degraded = Vec::new();
        let mut forced = Vec::new();

        for section in sections {
            let header = section.header();
            let formatted = format_section(&header, &section.content);
            let tokens = self.count_tokens(&formatted);

            if budget.allocate(&section.name.to_lowercase(), tokens) {
                parts.push(formatted);
            } else if section.degradable {
                debug!(section = %section.name, tokens, "section degraded to placeholder");
                parts.push(format_section(
                    &header,
                    &format!("[{header} omitted due to budget constraints]"),
                ));
                degraded.push(section.name.clone());
            } else {
                warn!(section = %section.name, tokens, "critical section exceeds budget, including anyway");
                parts.push(formatted);
                forced.push(section.name.clone());
            }
        }

        AssembledPrompt {
            text: parts.join("\n"),
            degraded,
            forced,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::prompt::tokenizer::HeuristicTokenizer;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(Arc::new(HeuristicTokenizer))
    }

    fn caps(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn sections_formatted_in_order() {
        let specs = vec![
            SectionSpec::new("system", "Be kind.").critical(),
            SectionSpec::new("identity", "Name: Ada").with_title("WHO YOU ARE"),
        ];
        let mut budget = TokenBudget::with_ceiling(10_000, BTreeMap::new());
        let out = assembler().assemble(&specs, &mut budget);
        assert_eq!(
            out.text,
            "---\n## SYSTEM\nBe kind.\n\n---\n## WHO YOU ARE\nName: Ada\n"
        );
        assert!(out.degraded.is_empty());
        assert!(out.forced.is_empty());
        assert_eq!(budget.report().sections.len(), 2);
    }

    #[test]
    fn degradable_section_replaced_by_placeholder() {
        let long = "memory ".repeat(200);
        let specs = vec![
            SectionSpec::new("system", "Rules.").critical(),
            SectionSpec::new("memory", long),
            SectionSpec::new("request", "hi").critical(),
        ];
        let mut budget = TokenBudget::with_ceiling(10_000, caps(&[("memory", 10)]));
        let out = assembler().assemble(&specs, &mut budget);
        assert!(out.text.contains("---\n## MEMORY\n[MEMORY omitted due to budget constraints]\n"));
        assert_eq!(out.degraded, vec!["memory".to_string()]);
        // The placeholder is not charged.
        assert!(!budget.report().sections.contains_key("memory"));
        // Order preserved.
        let sys = out.text.find("## SYSTEM").unwrap();
        let mem = out.text.find("## MEMORY").unwrap();
        let req = out.text.find("## REQUEST").unwrap();
        assert!(sys < mem && mem < req);
    }

    #[test]
    fn critical_section_forced_past_budget() {
        let specs = vec![SectionSpec::new("request", "a very long request indeed").critical()];
        let mut budget = TokenBudget::with_ceiling(2, BTreeMap::new());
        let out = assembler().assemble(&specs, &mut budget);
        assert!(out.text.contains("a very long request indeed"));
        assert_eq!(out.forced, vec!["request".to_string()]);
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn allocation_key_is_lowercased_name() {
        let specs = vec![SectionSpec::new("Mood", "calm")];
        let mut budget = TokenBudget::with_ceiling(1000, BTreeMap::new());
        assembler().assemble(&specs, &mut budget);
        assert!(budget.report().sections.contains_key("mood"));
    }

    fn assemble_twice_identical(specs: &[SectionSpec]) {
        let a = assembler().assemble(specs, &mut TokenBudget::with_ceiling(50, BTreeMap::new()));
        let b = assembler().assemble(specs, &mut TokenBudget::with_ceiling(50, BTreeMap::new()));
        assert_eq!(a, b);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let specs = vec![
            SectionSpec::new("system", "Stay in character.").critical(),
            SectionSpec::new("mood", "Feeling upbeat."),
            SectionSpec::new("memory", "User likes tea. ".repeat(40)),
            SectionSpec::new("request", "What should I drink?").critical(),
        ];
        assemble_twice_identical(&specs);
    }
}
