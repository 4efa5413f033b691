//! SQLite episodic memory repository.

use chrono::{DateTime, Utc};
use kindred_core::repository::EpisodicRepository;
use kindred_types::error::RepositoryError;
use kindred_types::memory::{EpisodicMemory, TokenUsage};
use sqlx::Row;
use uuid::Uuid;

use super::codec::{format_datetime, from_json, parse_datetime, query_err, to_json};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `EpisodicRepository`.
pub struct SqliteEpisodicRepository {
    pool: DatabasePool,
}

impl SqliteEpisodicRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain EpisodicMemory.
struct EpisodeRow {
    turn_id: String,
    user_id: String,
    session_id: String,
    timestamp: String,
    user_input: String,
    response: String,
    identity_json: String,
    mood_json: String,
    prompt_tokens: i64,
    completion_tokens: i64,
    salience_score: f64,
    emotional_valence: f64,
    concept_tags: String,
    contradiction_flags: String,
    embedding: Option<String>,
    consolidated: i64,
}

impl EpisodeRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            turn_id: row.try_get("turn_id")?,
            user_id: row.try_get("user_id")?,
            session_id: row.try_get("session_id")?,
            timestamp: row.try_get("timestamp")?,
            user_input: row.try_get("user_input")?,
            response: row.try_get("response")?,
            identity_json: row.try_get("identity_json")?,
            mood_json: row.try_get("mood_json")?,
            prompt_tokens: row.try_get("prompt_tokens")?,
            completion_tokens: row.try_get("completion_tokens")?,
            salience_score: row.try_get("salience_score")?,
            emotional_valence: row.try_get("emotional_valence")?,
            concept_tags: row.try_get("concept_tags")?,
            contradiction_flags: row.try_get("contradiction_flags")?,
            embedding: row.try_get("embedding")?,
            consolidated: row.try_get("consolidated")?,
        })
    }

    fn into_episode(self) -> Result<EpisodicMemory, RepositoryError> {
        let turn_id = Uuid::parse_str(&self.turn_id)
            .map_err(|e| RepositoryError::Query(format!("invalid turn_id: {e}")))?;
        let embedding = self
            .embedding
            .as_deref()
            .map(|raw| from_json::<Vec<f32>>("embedding", raw))
            .transpose()?;

        Ok(EpisodicMemory {
            turn_id,
            user_id: self.user_id,
            session_id: self.session_id,
            timestamp: parse_datetime(&self.timestamp)?,
            user_input: self.user_input,
            response: self.response,
            identity: from_json("identity_json", &self.identity_json)?,
            mood: from_json("mood_json", &self.mood_json)?,
            token_usage: TokenUsage::new(
                self.prompt_tokens.max(0) as u32,
                self.completion_tokens.max(0) as u32,
            ),
            salience_score: self.salience_score,
            emotional_valence: self.emotional_valence,
            concept_tags: from_json("concept_tags", &self.concept_tags)?,
            contradiction_flags: from_json("contradiction_flags", &self.contradiction_flags)?,
            embedding,
            consolidated: self.consolidated != 0,
        })
    }
}

fn collect(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<EpisodicMemory>, RepositoryError> {
    rows.iter()
        .map(|row| EpisodeRow::from_row(row).map_err(query_err)?.into_episode())
        .collect()
}

impl EpisodicRepository for SqliteEpisodicRepository {
    async fn append(&self, episode: &EpisodicMemory) -> Result<(), RepositoryError> {
        let embedding = episode.embedding.as_deref().map(to_json).transpose()?;
        let result = sqlx::query(
            r#"INSERT INTO episodic_memories
                 (turn_id, user_id, session_id, timestamp, user_input, response, identity_json,
                  mood_json, prompt_tokens, completion_tokens, salience_score, emotional_valence,
                  concept_tags, contradiction_flags, embedding, consolidated)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(episode.turn_id.to_string())
        .bind(&episode.user_id)
        .bind(&episode.session_id)
        .bind(format_datetime(&episode.timestamp))
        .bind(&episode.user_input)
        .bind(&episode.response)
        .bind(to_json(&episode.identity)?)
        .bind(to_json(&episode.mood)?)
        .bind(i64::from(episode.token_usage.prompt_tokens))
        .bind(i64::from(episode.token_usage.completion_tokens))
        .bind(episode.salience_score)
        .bind(episode.emotional_valence)
        .bind(to_json(&episode.concept_tags)?)
        .bind(to_json(&episode.contradiction_flags)?)
        .bind(embedding)
        .bind(i64::from(episode.consolidated))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("turn {} already stored", episode.turn_id)),
            ),
            Err(e) => Err(query_err(e)),
        }
    }

    async fn recent_for_user(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EpisodicMemory>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM episodic_memories WHERE user_id = ? AND timestamp > ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(format_datetime(&since))
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        collect(&rows)
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<EpisodicMemory>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM episodic_memories WHERE user_id = ? ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        row.map(|r| EpisodeRow::from_row(&r).map_err(query_err)?.into_episode())
            .transpose()
    }

    async fn unconsolidated_before(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EpisodicMemory>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM episodic_memories
               WHERE user_id = ? AND consolidated = 0 AND timestamp < ?
               ORDER BY timestamp ASC LIMIT ?"#,
        )
        .bind(user_id)
        .bind(format_datetime(&cutoff))
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        collect(&rows)
    }

    async fn users(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT user_id FROM episodic_memories ORDER BY user_id")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_err)?;
        Ok(rows.into_iter().map(|(user,)| user).collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM episodic_memories")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(count.max(0) as u64)
    }

    async fn expire_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM episodic_memories WHERE timestamp < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(result.rows_affected())
    }
}
