//! Engine configuration types for Kindred.
//!
//! `EngineConfig` represents the top-level `config.toml` in the data
//! directory. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration for the turn engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub mood: MoodConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub coherence: CoherenceConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Context window and per-section token caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub total_context: u32,
    pub reserved_output: u32,
    /// Fraction of the context window usable before reserving output.
    pub safety_buffer: f64,
    /// Base for the mood-aware response/memory split.
    pub response_base: u32,
    pub caps: BTreeMap<String, u32>,
}

impl BudgetConfig {
    pub fn default_caps() -> BTreeMap<String, u32> {
        [
            ("system", 400),
            ("identity", 300),
            ("mood", 150),
            ("memory", 6000),
            ("request", 100_000),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_context: 128_000,
            reserved_output: 8_000,
            safety_buffer: 0.85,
            response_base: 4_000,
            caps: Self::default_caps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub half_life_seconds: f64,
    pub inertia: f64,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            half_life_seconds: 1800.0,
            inertia: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub episode_retention_days: i64,
    pub max_history_scan: u32,
    pub diversity_threshold: f64,
    pub recent_history_limit: u32,
    pub recent_history_hours: i64,
    pub fact_limit: u32,
    pub consolidation_age_hours: i64,
    pub consolidation_batch_size: u32,
    pub embedder: EmbedderKind,
    /// Vector size for the hashing embedder. Model-backed embedders use the
    /// model's native size.
    pub embedding_dimensions: usize,
}

/// Which embedding backend fills episode vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Local ONNX model via fastembed, downloaded on first use.
    #[default]
    Fastembed,
    /// Feature hashing; no model files, works offline.
    Hashing,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            episode_retention_days: 7,
            max_history_scan: 1000,
            diversity_threshold: 0.9,
            recent_history_limit: 5,
            recent_history_hours: 24,
            fact_limit: 10,
            consolidation_age_hours: 24,
            consolidation_batch_size: 500,
            embedder: EmbedderKind::Fastembed,
            embedding_dimensions: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherenceConfig {
    pub history_capacity: usize,
    pub min_history: usize,
    pub drift_lookback: usize,
    pub mood_drift_threshold: f64,
    pub identity_drift_threshold: f64,
    /// Ask the fact-extraction model for self-claims after each turn.
    pub extract_claims: bool,
    /// Sessions without a turn for this long lose their tracker.
    pub session_idle_secs: u64,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            min_history: 5,
            drift_lookback: 20,
            mood_drift_threshold: 0.4,
            identity_drift_threshold: 0.5,
            extract_claims: true,
            session_idle_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// When set, `auto` versions are never selected as current.
    pub require_review: bool,
}

/// Connection details for one OpenAI-compatible model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEndpoint {
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier sent upstream. Defaults to the table key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model used for any task without an override.
    pub default: String,
    /// Task name (e.g. `fact_extraction`) to model name.
    pub overrides: BTreeMap<String, String>,
    pub endpoints: BTreeMap<String, ModelEndpoint>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "gpt-4o-mini".to_string(),
            ModelEndpoint {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: None,
            },
        );
        Self {
            default: "gpt-4o-mini".to_string(),
            overrides: BTreeMap::new(),
            endpoints,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    /// Banner prepended by the host system-prompt hook.
    pub active_marker: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a conversational companion with a stable identity and memory \
                            of past conversations. Stay consistent with who you are."
                .to_string(),
            active_marker: "KINDRED ACTIVE".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.budget.total_context, 128_000);
        assert_eq!(config.budget.caps.get("system"), Some(&400));
        assert_eq!(config.mood.half_life_seconds, 1800.0);
        assert_eq!(config.memory.episode_retention_days, 7);
        assert_eq!(config.coherence.history_capacity, 100);
        assert_eq!(config.coherence.session_idle_secs, 3600);
        assert_eq!(config.memory.embedder, EmbedderKind::Fastembed);
        assert!(!config.identity.require_review);
        assert_eq!(config.models.default, "gpt-4o-mini");
    }

    #[test]
    fn test_engine_config_deserialize_empty() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_partial_sections() {
        let toml_str = r#"
[budget]
total_context = 32000

[budget.caps]
system = 200

[mood]
inertia = 0.5

[memory]
embedder = "hashing"

[models]
default = "local"

[models.overrides]
fact_extraction = "small"

[models.endpoints.local]
api_base = "http://localhost:11434/v1"
api_key_env = "LOCAL_KEY"

[models.endpoints.small]
api_base = "http://localhost:11434/v1"
api_key_env = "LOCAL_KEY"
model = "qwen2.5:3b"
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.budget.total_context, 32_000);
        assert_eq!(config.budget.reserved_output, 8_000);
        // An explicit caps table replaces the defaults wholesale.
        assert_eq!(config.budget.caps.len(), 1);
        assert_eq!(config.mood.inertia, 0.5);
        assert_eq!(config.mood.half_life_seconds, 1800.0);
        assert_eq!(config.memory.embedder, EmbedderKind::Hashing);
        assert_eq!(config.memory.fact_limit, 10);
        assert_eq!(config.models.default, "local");
        assert_eq!(
            config.models.overrides.get("fact_extraction").map(String::as_str),
            Some("small")
        );
        assert_eq!(
            config.models.endpoints["small"].model.as_deref(),
            Some("qwen2.5:3b")
        );
    }

    #[test]
    fn test_engine_config_serde_roundtrip() {
        let config = EngineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
