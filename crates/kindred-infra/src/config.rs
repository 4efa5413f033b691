//! Engine configuration loader for Kindred.
//!
//! Reads `config.toml` from the data directory (`~/.kindred/` in production,
//! overridable with `KINDRED_DATA_DIR`) and deserializes it into
//! [`EngineConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::{Path, PathBuf};

use kindred_types::config::EngineConfig;

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "KINDRED_DATA_DIR";

/// Resolve the data directory: `$KINDRED_DATA_DIR`, else `~/.kindred`.
pub fn data_dir() -> PathBuf {
    resolve_data_dir(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn resolve_data_dir(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".kindred")
        })
}

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_engine_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn load_engine_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
[budget]
total_context = 64000

[coherence]
min_history = 3
extract_claims = false

[identity]
require_review = true

[prompt]
active_marker = "COMPANION ON"
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.budget.total_context, 64_000);
        assert_eq!(config.coherence.min_history, 3);
        assert!(!config.coherence.extract_claims);
        assert!(config.identity.require_review);
        assert_eq!(config.prompt.active_marker, "COMPANION ON");
        // Untouched sections keep their defaults.
        assert_eq!(config.mood.half_life_seconds, 1800.0);
    }

    #[tokio::test]
    async fn load_engine_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn data_dir_override_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/kindred-test")));
        assert_eq!(dir, PathBuf::from("/tmp/kindred-test"));
    }

    #[test]
    fn data_dir_defaults_under_home() {
        assert!(resolve_data_dir(None).ends_with(".kindred"));
        assert!(resolve_data_dir(Some(PathBuf::new())).ends_with(".kindred"));
    }
}
