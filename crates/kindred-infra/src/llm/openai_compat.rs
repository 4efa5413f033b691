//! OpenAI-compatible model client.
//!
//! One [`OpenAiCompatibleClient`] serves any endpoint that speaks the chat
//! completions protocol (OpenAI, local Ollama, vLLM, ...). The assembled
//! prompt is sent as a single user message; the first choice's text is
//! returned.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use kindred_core::llm::ModelClient;
use kindred_types::llm::{GenerationParams, ModelError, ModelResponse};

/// Client for a single OpenAI-compatible model.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleClient {
    client: Client<OpenAIConfig>,
    /// Name the registry knows this client by.
    name: String,
    /// Model identifier sent upstream.
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        api_base: &str,
        api_key: &SecretString,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            name: name.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )],
            max_completion_tokens: Some(params.max_tokens),
            temperature: params.temperature.map(|t| t as f32),
            top_p: params.top_p.map(|p| p as f32),
            ..Default::default()
        }
    }
}

impl ModelClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, prompt: &str, params: &GenerationParams) -> Result<ModelResponse, ModelError> {
        if params.max_tokens == 0 {
            return Err(ModelError::InvalidRequest("max_tokens must be positive".to_string()));
        }
        let request = self.build_request(prompt, params);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse(self.name.clone()));
        }

        debug!(model = %response.model, chars = text.len(), "model call completed");
        Ok(ModelResponse {
            text,
            model: response.model,
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`ModelError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> ModelError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                ModelError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                ModelError::RateLimited {
                    retry_after_ms: None,
                }
            } else {
                ModelError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => ModelError::AuthenticationFailed,
            Some(429) => ModelError::RateLimited {
                retry_after_ms: None,
            },
            _ => ModelError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::InvalidArgument(msg) => ModelError::InvalidRequest(msg.clone()),
        _ => ModelError::Provider {
            message: err.to_string(),
        },
    }
}
