//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `kindred-core` using fastembed's
//! BGESmallENV15 model (384 dimensions) with ONNX runtime inference. The
//! model is loaded on the first non-empty batch, so commands that never
//! embed never download it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use kindred_core::memory::Embedder;
use kindred_types::error::RepositoryError;
use tracing::{debug, info};

pub const FASTEMBED_MODEL_NAME: &str = "BAAI/bge-small-en-v1.5";
pub const FASTEMBED_DIMENSION: usize = 384;

/// Local embedder backed by an ONNX model cached under `cache_dir`.
pub struct FastEmbedder {
    model: Arc<Mutex<Option<TextEmbedding>>>,
    cache_dir: PathBuf,
}

impl FastEmbedder {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: Arc::new(Mutex::new(None)),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Whether the ONNX model has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.model.lock().map(|m| m.is_some()).unwrap_or(false)
    }

    fn load(cache_dir: &Path) -> Result<TextEmbedding, RepositoryError> {
        info!(cache_dir = %cache_dir.display(), model = FASTEMBED_MODEL_NAME, "loading embedding model");
        let options = InitOptions::new(EmbeddingModel::BGESmallENV15)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(false);
        TextEmbedding::try_new(options)
            .map_err(|e| RepositoryError::Query(format!("failed to load embedding model: {e}")))
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let cache_dir = self.cache_dir.clone();
        let batch = texts.to_vec();

        // ONNX inference is CPU-bound; keep it off the async workers.
        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| RepositoryError::Query("embedding model lock poisoned".to_string()))?;
            if guard.is_none() {
                *guard = Some(Self::load(&cache_dir)?);
            }
            let embedding = guard
                .as_mut()
                .ok_or_else(|| RepositoryError::Query("embedding model unavailable".to_string()))?;
            embedding
                .embed(batch, None)
                .map_err(|e| RepositoryError::Query(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| RepositoryError::Query(format!("embedding task failed: {e}")))??;

        debug!(count = vectors.len(), "embedded batch");
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        FASTEMBED_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        FASTEMBED_DIMENSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_model_metadata_without_loading() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = FastEmbedder::new(dir.path());
        assert_eq!(embedder.model_name(), FASTEMBED_MODEL_NAME);
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.cache_dir(), dir.path());
        assert!(!embedder.is_loaded());
    }

    #[tokio::test]
    async fn empty_batch_does_not_load_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = FastEmbedder::new(dir.path());
        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
        assert!(!embedder.is_loaded());
    }
}
