pub mod assembler;
pub mod tokenizer;

pub use assembler::{AssembledPrompt, PromptAssembler, SectionSpec, format_section};
pub use tokenizer::{HeuristicTokenizer, Tokenizer};
