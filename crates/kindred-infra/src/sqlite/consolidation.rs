//! SQLite consolidation job repository.
//!
//! `commit` writes the facts, flags the episodes and completes the job row in
//! one writer transaction. Dropping the transaction on any error rolls all
//! three back.

use kindred_core::repository::ConsolidationRepository;
use kindred_types::error::RepositoryError;
use kindred_types::memory::{ConsolidationJob, JobStatus, SemanticFact};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::codec::{format_datetime, parse_datetime, query_err};
use super::pool::DatabasePool;
use super::semantic::upsert_fact;

/// SQLite-backed implementation of `ConsolidationRepository`.
pub struct SqliteConsolidationRepository {
    pool: DatabasePool,
}

impl SqliteConsolidationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<ConsolidationJob, RepositoryError> {
    let job_id: String = row.try_get("job_id").map_err(query_err)?;
    let status: String = row.try_get("status").map_err(query_err)?;
    let episodes: i64 = row.try_get("episodes_processed").map_err(query_err)?;
    let facts: i64 = row.try_get("facts_written").map_err(query_err)?;
    let started_at: String = row.try_get("started_at").map_err(query_err)?;
    let finished_at: Option<String> = row.try_get("finished_at").map_err(query_err)?;

    Ok(ConsolidationJob {
        job_id: Uuid::parse_str(&job_id)
            .map_err(|e| RepositoryError::Query(format!("invalid job_id: {e}")))?,
        user_id: row.try_get("user_id").map_err(query_err)?,
        status: status.parse::<JobStatus>().map_err(RepositoryError::Query)?,
        episodes_processed: u32::try_from(episodes).unwrap_or(0),
        facts_written: u32::try_from(facts).unwrap_or(0),
        started_at: parse_datetime(&started_at)?,
        finished_at: finished_at.as_deref().map(parse_datetime).transpose()?,
        error: row.try_get("error").map_err(query_err)?,
    })
}

/// Overwrite the mutable columns of an existing job row.
async fn update_job(conn: &mut SqliteConnection, job: &ConsolidationJob) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r#"UPDATE consolidation_jobs
           SET status = ?, episodes_processed = ?, facts_written = ?, finished_at = ?, error = ?
           WHERE job_id = ?"#,
    )
    .bind(job.status.to_string())
    .bind(i64::from(job.episodes_processed))
    .bind(i64::from(job.facts_written))
    .bind(job.finished_at.as_ref().map(format_datetime))
    .bind(&job.error)
    .bind(job.job_id.to_string())
    .execute(conn)
    .await
    .map_err(query_err)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

impl ConsolidationRepository for SqliteConsolidationRepository {
    async fn start_job(&self, job: &ConsolidationJob) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO consolidation_jobs (job_id, user_id, status, episodes_processed, facts_written, started_at, finished_at, error)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(job.job_id.to_string())
        .bind(&job.user_id)
        .bind(job.status.to_string())
        .bind(i64::from(job.episodes_processed))
        .bind(i64::from(job.facts_written))
        .bind(format_datetime(&job.started_at))
        .bind(job.finished_at.as_ref().map(format_datetime))
        .bind(&job.error)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                RepositoryError::Conflict(format!("job {} already exists", job.job_id))
            }
            _ => query_err(e),
        })?;
        Ok(())
    }

    async fn commit(
        &self,
        job: &ConsolidationJob,
        facts: &[SemanticFact],
        episode_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        for fact in facts {
            upsert_fact(&mut tx, fact).await?;
        }

        for id in episode_ids {
            sqlx::query("UPDATE episodic_memories SET consolidated = 1 WHERE turn_id = ?")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }

        update_job(&mut tx, job).await?;

        tx.commit().await.map_err(query_err)
    }

    async fn fail_job(&self, job: &ConsolidationJob) -> Result<(), RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        update_job(&mut conn, job).await
    }

    async fn get_job(&self, job_id: &Uuid) -> Result<Option<ConsolidationJob>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM consolidation_jobs WHERE job_id = ?")
            .bind(job_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;
        row.as_ref().map(row_to_job).transpose()
    }

    async fn recent_jobs(&self, limit: u32) -> Result<Vec<ConsolidationJob>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM consolidation_jobs ORDER BY started_at DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;
        rows.iter().map(row_to_job).collect()
    }
}
