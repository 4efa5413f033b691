//! Connection pools for the Kindred database.
//!
//! Writes are small and row-scoped (episode appends, fact upserts, identity
//! versions, job rows), so a single writer connection serializes them; turn
//! reads (history scans, fact search, identity lookup) use a read-only pool.
//! WAL journaling lets readers proceed while the writer commits.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::debug;

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "kindred.db";

const READER_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only pool plus a single-connection writer.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open `{dir}/kindred.db`, creating and migrating it as needed.
    pub async fn open(dir: &Path) -> Result<Self, sqlx::Error> {
        Self::connect(&database_url(dir)).await
    }

    /// Connect to `database_url`. Migrations run on the writer before any
    /// reader connects, so readers always see the current schema.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        debug!(database_url, "database ready");
        Ok(Self { reader, writer })
    }
}

/// `sqlite://` URL of the database file in `dir`.
pub fn database_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join(DATABASE_FILE).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(dir.path()).await.unwrap();
        assert!(dir.path().join(DATABASE_FILE).exists());

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "consolidation_jobs",
                "episodic_memories",
                "identity_versions",
                "semantic_facts",
            ]
        );
    }

    #[tokio::test]
    async fn writer_uses_wal_with_normal_sync() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(dir.path()).await.unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        // 1 = NORMAL
        let (sync,): (i64,) = sqlx::query_as("PRAGMA synchronous")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(sync, 1);
    }

    #[tokio::test]
    async fn reader_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(dir.path()).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO consolidation_jobs (job_id, user_id, status, started_at) \
             VALUES ('j', 'u', 'running', '2024-01-01T00:00:00.000000Z')",
        )
        .execute(&pool.reader)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        drop(DatabasePool::open(dir.path()).await.unwrap());
        assert!(DatabasePool::open(dir.path()).await.is_ok());
    }

    #[test]
    fn url_points_into_directory() {
        let url = database_url(Path::new("/tmp/kindred-data"));
        assert_eq!(url, "sqlite:///tmp/kindred-data/kindred.db");
    }
}
