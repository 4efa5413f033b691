//! Semantic fact repository trait definition.

use chrono::{DateTime, Utc};
use kindred_types::error::RepositoryError;
use kindred_types::memory::SemanticFact;

/// Store of subject-predicate-object facts keyed by the triple.
pub trait SemanticRepository: Send + Sync {
    /// Insert or reinforce facts.
    ///
    /// On an existing triple: `confidence = max(old, new)`, `timestamp = new`,
    /// `decay_age = min(1.0, old + 0.1)`.
    fn upsert(
        &self,
        facts: &[SemanticFact],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Facts whose subject, predicate or object contain every whitespace
    /// separated term of `query`, ranked by `confidence * decay_age` descending.
    fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<SemanticFact>, RepositoryError>> + Send;

    /// Age every fact: `decay_age = max(0.1, decay_age - 0.05 * elapsed_days)`.
    /// Returns the number of facts touched.
    fn apply_decay(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Split a free-text query into lexical search terms.
///
/// Characters other than alphanumerics and whitespace are deleted, so
/// "Alice's" searches for "Alices". An empty result means "match nothing".
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
