//! Consolidation job repository trait definition.

use kindred_types::error::RepositoryError;
use kindred_types::memory::{ConsolidationJob, SemanticFact};
use uuid::Uuid;

/// Job bookkeeping plus the atomic write of one consolidation batch.
pub trait ConsolidationRepository: Send + Sync {
    /// Record a job in the `running` state.
    fn start_job(
        &self,
        job: &ConsolidationJob,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Upsert `facts`, mark `episode_ids` consolidated and store `job` (already
    /// marked completed) as one transaction. On error nothing is applied.
    fn commit(
        &self,
        job: &ConsolidationJob,
        facts: &[SemanticFact],
        episode_ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the job row with its failed state.
    fn fail_job(
        &self,
        job: &ConsolidationJob,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_job(
        &self,
        job_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ConsolidationJob>, RepositoryError>> + Send;

    /// Most recent jobs first.
    fn recent_jobs(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ConsolidationJob>, RepositoryError>> + Send;
}
