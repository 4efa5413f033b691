//! Episodic memory repository trait definition.

use chrono::{DateTime, Utc};
use kindred_types::error::RepositoryError;
use kindred_types::memory::EpisodicMemory;

/// Append-only log of conversational turns, keyed by `turn_id`.
///
/// Implementations live in kindred-infra (e.g., `SqliteEpisodicRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait EpisodicRepository: Send + Sync {
    /// Append one turn record. A duplicate `turn_id` is a `Conflict`.
    fn append(
        &self,
        episode: &EpisodicMemory,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Episodes for a user newer than `since`, newest first.
    fn recent_for_user(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<EpisodicMemory>, RepositoryError>> + Send;

    /// The user's most recent episode, if any.
    fn latest_for_user(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<EpisodicMemory>, RepositoryError>> + Send;

    /// Unconsolidated episodes older than `cutoff`, oldest first.
    fn unconsolidated_before(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<EpisodicMemory>, RepositoryError>> + Send;

    /// Distinct user ids with at least one episode.
    fn users(&self) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Total number of stored episodes.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete episodes older than `cutoff`. Returns the number deleted.
    fn expire_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
