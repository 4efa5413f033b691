//! ModelClient trait definition.
//!
//! The language model is treated as an opaque, single-shot call: a fully
//! assembled prompt goes in, text comes out.

use kindred_types::llm::{GenerationParams, ModelError, ModelResponse};

/// Trait for model backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in kindred-infra (e.g., `OpenAiCompatibleClient`).
/// Timeouts and cancellation are the implementation's responsibility.
pub trait ModelClient: Send + Sync {
    /// Model name this client serves (e.g., "gpt-4o-mini").
    fn name(&self) -> &str;

    /// Send one prompt and receive the full response text.
    fn call(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl std::future::Future<Output = Result<ModelResponse, ModelError>> + Send;
}
