//! BoxModelClient -- object-safe dynamic dispatch wrapper for ModelClient.
//!
//! 1. Define an object-safe `ModelClientDyn` trait with boxed futures
//! 2. Blanket-impl `ModelClientDyn` for all `T: ModelClient`
//! 3. `BoxModelClient` wraps `Box<dyn ModelClientDyn>` and delegates

use futures_util::future::BoxFuture;
use kindred_types::llm::{GenerationParams, ModelError, ModelResponse};

use super::client::ModelClient;

/// Object-safe version of [`ModelClient`] with boxed futures.
pub trait ModelClientDyn: Send + Sync {
    fn name(&self) -> &str;

    fn call_boxed<'a>(
        &'a self,
        prompt: &'a str,
        params: &'a GenerationParams,
    ) -> BoxFuture<'a, Result<ModelResponse, ModelError>>;
}

impl<T: ModelClient> ModelClientDyn for T {
    fn name(&self) -> &str {
        ModelClient::name(self)
    }

    fn call_boxed<'a>(
        &'a self,
        prompt: &'a str,
        params: &'a GenerationParams,
    ) -> BoxFuture<'a, Result<ModelResponse, ModelError>> {
        Box::pin(self.call(prompt, params))
    }
}

/// Type-erased model client for runtime model selection.
///
/// Since `ModelClient` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxModelClient` exposes the same methods and delegates to the
/// inner `ModelClientDyn` trait object.
pub struct BoxModelClient {
    inner: Box<dyn ModelClientDyn + Send + Sync>,
}

impl BoxModelClient {
    pub fn new<T: ModelClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn call(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ModelResponse, ModelError> {
        self.inner.call_boxed(prompt, params).await
    }
}
