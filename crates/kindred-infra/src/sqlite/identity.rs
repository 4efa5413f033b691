//! SQLite identity version repository.

use kindred_core::repository::IdentityRepository;
use kindred_types::error::RepositoryError;
use kindred_types::identity::{ApprovalStatus, IdentitySnapshot};
use sqlx::Row;

use super::codec::{format_datetime, from_json, parse_datetime, query_err, to_json};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `IdentityRepository`.
pub struct SqliteIdentityRepository {
    pool: DatabasePool,
}

impl SqliteIdentityRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_snapshot(row: &sqlx::sqlite::SqliteRow) -> Result<IdentitySnapshot, RepositoryError> {
    let version: i64 = row.try_get("version").map_err(query_err)?;
    let kernel_json: String = row.try_get("kernel_json").map_err(query_err)?;
    let timestamp: String = row.try_get("timestamp").map_err(query_err)?;
    let status: String = row.try_get("approval_status").map_err(query_err)?;
    let reflection: String = row.try_get("reflection").map_err(query_err)?;

    Ok(IdentitySnapshot {
        kernel: from_json("kernel_json", &kernel_json)?,
        version: u32::try_from(version)
            .map_err(|e| RepositoryError::Query(format!("invalid version: {e}")))?,
        timestamp: parse_datetime(&timestamp)?,
        approval_status: status
            .parse::<ApprovalStatus>()
            .map_err(RepositoryError::Query)?,
        reflection,
    })
}

impl IdentityRepository for SqliteIdentityRepository {
    async fn append(&self, user_id: &str, snapshot: &IdentitySnapshot) -> Result<(), RepositoryError> {
        // Check and insert in one transaction on the single writer.
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let (latest,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(version) FROM identity_versions WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(query_err)?;

        if let Some(latest) = latest {
            if i64::from(snapshot.version) <= latest {
                return Err(RepositoryError::Conflict(format!(
                    "identity version {} is not newer than {latest} for user {user_id}",
                    snapshot.version
                )));
            }
        }

        sqlx::query(
            r#"INSERT INTO identity_versions (user_id, version, kernel_json, timestamp, approval_status, reflection)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(i64::from(snapshot.version))
        .bind(to_json(&snapshot.kernel)?)
        .bind(format_datetime(&snapshot.timestamp))
        .bind(snapshot.approval_status.to_string())
        .bind(&snapshot.reflection)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)
    }

    async fn history(&self, user_id: &str) -> Result<Vec<IdentitySnapshot>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM identity_versions WHERE user_id = ? ORDER BY version ASC")
            .bind(user_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;
        rows.iter().map(row_to_snapshot).collect()
    }
}
