//! Model client implementations and registry construction.
//!
//! [`build_registry`] turns the `[models]` configuration section into a
//! validated [`ModelRegistry`]. Any missing key or dangling model name is a
//! fatal startup error.

pub mod openai_compat;

use secrecy::SecretString;
use tracing::info;

use kindred_core::llm::{BoxModelClient, ModelRegistry};
use kindred_types::config::ModelsConfig;
use kindred_types::error::ConfigError;

use self::openai_compat::OpenAiCompatibleClient;

/// Build the registry, reading API keys from the environment.
pub fn build_registry(config: &ModelsConfig) -> Result<ModelRegistry, ConfigError> {
    build_registry_with(config, |var| std::env::var(var).ok())
}

/// Build the registry with an explicit key lookup.
pub fn build_registry_with<F>(config: &ModelsConfig, lookup_key: F) -> Result<ModelRegistry, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if config.default.trim().is_empty() {
        return Err(ConfigError::Missing("models.default".to_string()));
    }

    let mut registry = ModelRegistry::new(config.default.clone());
    for (name, endpoint) in &config.endpoints {
        let key = lookup_key(&endpoint.api_key_env)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::Missing(format!("{} (API key for model '{name}')", endpoint.api_key_env)))?;
        let secret = SecretString::from(key);
        let upstream = endpoint.model.clone().unwrap_or_else(|| name.clone());
        let client = OpenAiCompatibleClient::new(name.clone(), upstream, &endpoint.api_base, &secret);
        registry.register(name.clone(), BoxModelClient::new(client));
    }

    registry.apply_overrides(&config.overrides)?;
    registry.validate()?;
    info!(
        default = registry.default_model(),
        models = config.endpoints.len(),
        "model registry ready"
    );
    Ok(registry)
}
