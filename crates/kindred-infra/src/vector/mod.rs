//! Embedding backends for episode vectors.

pub mod embedder;

use std::path::Path;

use kindred_core::memory::{BoxEmbedder, HashingEmbedder};
use kindred_types::config::{EmbedderKind, MemoryConfig};
use tracing::info;

pub use embedder::FastEmbedder;

/// Build the embedder selected by `[memory] embedder`. Fastembed models are
/// cached under `model_dir`.
pub fn build_embedder(config: &MemoryConfig, model_dir: &Path) -> BoxEmbedder {
    let embedder = match config.embedder {
        EmbedderKind::Fastembed => BoxEmbedder::new(FastEmbedder::new(model_dir)),
        EmbedderKind::Hashing => {
            BoxEmbedder::new(HashingEmbedder::new(config.embedding_dimensions))
        }
    };
    info!(
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "embedder selected"
    );
    embedder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_uses_configured_dimension() {
        let config = MemoryConfig {
            embedder: EmbedderKind::Hashing,
            embedding_dimensions: 64,
            ..MemoryConfig::default()
        };
        let embedder = build_embedder(&config, Path::new("unused"));
        assert_eq!(embedder.model_name(), "hashing-bow");
        assert_eq!(embedder.dimension(), 64);
    }

    #[test]
    fn fastembed_is_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let boxed = build_embedder(&MemoryConfig::default(), dir.path());
        assert_eq!(boxed.model_name(), embedder::FASTEMBED_MODEL_NAME);
        assert_eq!(boxed.dimension(), embedder::FASTEMBED_DIMENSION);
    }
}
