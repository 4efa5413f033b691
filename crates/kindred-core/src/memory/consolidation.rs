//! Episodic-to-semantic consolidation.
//!
//! Aged, unconsolidated episodes are grouped by session and summarised into
//! one semantic fact per session. The fact writes, the consolidated flags and
//! the job's completion are committed together; any failure rolls them back
//! and leaves the job marked failed. Failures never reach the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use kindred_types::config::MemoryConfig;
use kindred_types::error::RepositoryError;
use kindred_types::memory::{ConsolidationJob, EpisodicMemory, JobStatus, SemanticFact};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::repository::{ConsolidationRepository, EpisodicRepository};

/// Confidence assigned to session summary facts.
pub const SUMMARY_CONFIDENCE: f64 = 0.6;
pub const SUMMARY_PREDICATE: &str = "discussed";

/// One fact per session, in first-seen session order.
pub fn summarize_by_session(
    user_id: &str,
    episodes: &[EpisodicMemory],
    now: DateTime<Utc>,
) -> Vec<SemanticFact> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<&str, Vec<Uuid>> = BTreeMap::new();
    for episode in episodes {
        let entry = groups.entry(episode.session_id.as_str()).or_default();
        if entry.is_empty() {
            order.push(episode.session_id.as_str());
        }
        entry.push(episode.turn_id);
    }

    order
        .into_iter()
        .map(|session_id| {
            let ids = groups.remove(session_id).unwrap_or_default();
            let mut fact = SemanticFact::new(
                user_id,
                SUMMARY_PREDICATE,
                format!("{} exchanges in session {}", ids.len(), session_id),
                SUMMARY_CONFIDENCE,
                now,
            );
            fact.source_turn_ids = ids;
            fact
        })
        .collect()
}

/// Runs consolidation jobs.
pub struct ConsolidationService<E: EpisodicRepository, C: ConsolidationRepository> {
    episodic: E,
    jobs: C,
    config: MemoryConfig,
}

impl<E: EpisodicRepository, C: ConsolidationRepository> ConsolidationService<E, C> {
    pub fn new(episodic: E, jobs: C, config: MemoryConfig) -> Self {
        Self {
            episodic,
            jobs,
            config,
        }
    }

    pub fn jobs_repo(&self) -> &C {
        &self.jobs
    }

    /// Consolidate one user's aged episodes. Always returns the final job
    /// record; on failure its status is `failed` and `error` is set.
    pub async fn run_for_user(&self, user_id: &str, now: DateTime<Utc>) -> ConsolidationJob {
        let mut job = ConsolidationJob::start(user_id, now);
        info!(job_id = %job.job_id, user_id, "consolidation started");

        if let Err(e) = self.jobs.start_job(&job).await {
            error!(job_id = %job.job_id, error = %e, "could not record consolidation job");
            job.status = JobStatus::Failed;
            job.error = Some(e.to_string());
            job.finished_at = Some(Utc::now());
            return job;
        }

        match self.consolidate(&mut job, now).await {
            Ok(()) => {
                info!(
                    job_id = %job.job_id,
                    episodes = job.episodes_processed,
                    facts = job.facts_written,
                    "consolidation completed"
                );
            }
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "consolidation failed, rolled back");
                job.status = JobStatus::Failed;
                job.episodes_processed = 0;
                job.facts_written = 0;
                job.error = Some(e.to_string());
                job.finished_at = Some(Utc::now());
                if let Err(mark_err) = self.jobs.fail_job(&job).await {
                    error!(job_id = %job.job_id, error = %mark_err, "could not mark job failed");
                }
            }
        }
        job
    }

    /// Run the pass for several users, one after another.
    pub async fn run_for_users<S: AsRef<str>>(
        &self,
        users: &[S],
        now: DateTime<Utc>,
    ) -> Vec<ConsolidationJob> {
        let mut jobs = Vec::with_capacity(users.len());
        for user in users {
            jobs.push(self.run_for_user(user.as_ref(), now).await);
        }
        jobs
    }

    /// Run the pass for every user with stored episodes.
    pub async fn run_all(&self, now: DateTime<Utc>) -> Result<Vec<ConsolidationJob>, RepositoryError> {
        let users = self.episodic.users().await?;
        Ok(self.run_for_users(&users, now).await)
    }

    async fn consolidate(
        &self,
        job: &mut ConsolidationJob,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let cutoff = now - Duration::hours(self.config.consolidation_age_hours);
        let episodes = self
            .episodic
            .unconsolidated_before(&job.user_id, cutoff, self.config.consolidation_batch_size)
            .await?;

        let facts = summarize_by_session(&job.user_id, &episodes, now);
        let ids: Vec<Uuid> = episodes.iter().map(|e| e.turn_id).collect();

        let mut completed = job.clone();
        completed.status = JobStatus::Completed;
        completed.episodes_processed = u32::try_from(ids.len()).unwrap_or(u32::MAX);
        completed.facts_written = u32::try_from(facts.len()).unwrap_or(u32::MAX);
        completed.finished_at = Some(Utc::now());

        self.jobs.commit(&completed, &facts, &ids).await?;
        *job = completed;
        Ok(())
    }
}
