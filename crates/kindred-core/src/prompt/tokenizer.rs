//! Token counting.
//!
//! The engine only needs a deterministic count; exact agreement with the
//! serving model's tokenizer is not required, so the default is a cheap
//! heuristic. Swap in a model-specific counter via [`Tokenizer`].

/// Deterministic token counter, swappable per model family.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Word-piece style approximation.
///
/// Each run of alphanumeric characters costs one token per started four
/// characters; every other non-whitespace character costs one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl HeuristicTokenizer {
    const CHARS_PER_TOKEN: usize = 4;
}

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        let mut tokens: usize = 0;
        let mut run: usize = 0;
        for ch in text.chars() {
            if ch.is_alphanumeric() {
                run += 1;
                continue;
            }
            tokens += run.div_ceil(Self::CHARS_PER_TOKEN);
            run = 0;
            if !ch.is_whitespace() {
                tokens += 1;
            }
        }
        tokens + run.div_ceil(Self::CHARS_PER_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(HeuristicTokenizer.count_tokens(""), 0);
        assert_eq!(HeuristicTokenizer.count_tokens("   \n\t"), 0);
    }

    #[test]
    fn words_and_punctuation() {
        // "hello" -> 2, "," -> 1, "world" -> 2, "!" -> 1
        assert_eq!(HeuristicTokenizer.count_tokens("hello, world!"), 6);
        assert_eq!(HeuristicTokenizer.count_tokens("a b c"), 3);
        assert_eq!(HeuristicTokenizer.count_tokens("abcd"), 1);
    }

    #[test]
    fn counting_is_stable() {
        let text = "---\n## IDENTITY\nName: Ada\n";
        let first = HeuristicTokenizer.count_tokens(text);
        for _ in 0..5 {
            assert_eq!(HeuristicTokenizer.count_tokens(text), first);
        }
    }
}
