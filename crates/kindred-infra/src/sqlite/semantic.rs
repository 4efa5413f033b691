//! SQLite semantic fact repository.

use chrono::{DateTime, Utc};
use kindred_core::repository::SemanticRepository;
use kindred_core::repository::semantic::search_terms;
use kindred_types::error::RepositoryError;
use kindred_types::memory::SemanticFact;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::codec::{format_datetime, from_json, parse_datetime, query_err, to_json};
use super::pool::DatabasePool;

/// Reinforcing upsert keyed by the triple. Source turn ids are merged as a set.
const UPSERT_FACT: &str = r#"
INSERT INTO semantic_facts (subject, predicate, object, confidence, timestamp, decay_age, source_turn_ids)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (subject, predicate, object) DO UPDATE SET
    confidence = MAX(semantic_facts.confidence, excluded.confidence),
    timestamp = MAX(semantic_facts.timestamp, excluded.timestamp),
    decay_age = MIN(1.0, semantic_facts.decay_age + 0.1),
    source_turn_ids = (
        SELECT json_group_array(value) FROM (
            SELECT value FROM json_each(semantic_facts.source_turn_ids)
            UNION
            SELECT value FROM json_each(excluded.source_turn_ids)
        )
    )
"#;

/// Write one fact on an open connection or transaction.
pub(crate) async fn upsert_fact(
    conn: &mut SqliteConnection,
    fact: &SemanticFact,
) -> Result<(), RepositoryError> {
    let sources: Vec<String> = fact.source_turn_ids.iter().map(Uuid::to_string).collect();
    sqlx::query(UPSERT_FACT)
        .bind(&fact.subject)
        .bind(&fact.predicate)
        .bind(&fact.object)
        .bind(fact.confidence)
        .bind(format_datetime(&fact.timestamp))
        .bind(fact.decay_age)
        .bind(to_json(&sources)?)
        .execute(conn)
        .await
        .map_err(query_err)?;
    Ok(())
}

/// SQLite-backed implementation of `SemanticRepository`.
pub struct SqliteSemanticRepository {
    pool: DatabasePool,
}

impl SqliteSemanticRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct FactRow {
    subject: String,
    predicate: String,
    object: String,
    confidence: f64,
    timestamp: String,
    decay_age: f64,
    source_turn_ids: String,
}

impl FactRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            subject: row.try_get("subject")?,
            predicate: row.try_get("predicate")?,
            object: row.try_get("object")?,
            confidence: row.try_get("confidence")?,
            timestamp: row.try_get("timestamp")?,
            decay_age: row.try_get("decay_age")?,
            source_turn_ids: row.try_get("source_turn_ids")?,
        })
    }

    fn into_fact(self) -> Result<SemanticFact, RepositoryError> {
        let raw_ids: Vec<String> = from_json("source_turn_ids", &self.source_turn_ids)?;
        let source_turn_ids = raw_ids
            .iter()
            .map(|id| Uuid::parse_str(id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Query(format!("invalid source turn id: {e}")))?;
        Ok(SemanticFact {
            subject: self.subject,
            predicate: self.predicate,
            object: self.object,
            confidence: self.confidence,
            timestamp: parse_datetime(&self.timestamp)?,
            decay_age: self.decay_age,
            source_turn_ids,
        })
    }
}

impl SemanticRepository for SqliteSemanticRepository {
    async fn upsert(&self, facts: &[SemanticFact]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        for fact in facts {
            upsert_fact(&mut tx, fact).await?;
        }
        tx.commit().await.map_err(query_err)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SemanticFact>, RepositoryError> {
        let terms = search_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from("SELECT * FROM semantic_facts WHERE ");
        let clauses = vec!["LOWER(subject || ' ' || predicate || ' ' || object) LIKE ?"; terms.len()];
        sql.push_str(&clauses.join(" AND "));
        sql.push_str(" ORDER BY confidence * decay_age DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        for term in &terms {
            q = q.bind(format!("%{}%", term.to_lowercase()));
        }
        let rows = q
            .bind(i64::from(limit))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter()
            .map(|row| FactRow::from_row(row).map_err(query_err)?.into_fact())
            .collect()
    }

    async fn apply_decay(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE semantic_facts
               SET decay_age = MAX(0.1, decay_age - 0.05 * MAX(0.0, julianday(?) - julianday(timestamp)))"#,
        )
        .bind(format_datetime(&now))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM semantic_facts")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::sqlite::episodic::tests::test_pool;

    #[tokio::test]
    async fn reinforcing_upsert_keeps_max_confidence() {
        let repo = SqliteSemanticRepository::new(test_pool().await);
        let t0 = Utc::now() - Duration::hours(1);
        let mut first = SemanticFact::new("alice", "likes", "green tea", 0.6, t0);
        first.decay_age = 0.5;
        first.source_turn_ids = vec![Uuid::now_v7()];
        repo.upsert(std::slice::from_ref(&first)).await.unwrap();

        let mut second = SemanticFact::new("alice", "likes", "green tea", 0.8, Utc::now());
        second.source_turn_ids = vec![Uuid::now_v7()];
        repo.upsert(std::slice::from_ref(&second)).await.unwrap();
        // A weaker observation never lowers confidence.
        repo.upsert(&[SemanticFact::new("alice", "likes", "green tea", 0.2, t0)])
            .await
            .unwrap();

        let facts = repo.search("tea", 10).await.unwrap();
        assert_eq!(facts.len(), 1);
        let fact = &facts[0];
        assert_eq!(fact.confidence, 0.8);
        assert!((fact.decay_age - 0.7).abs() < 1e-9);
        assert_eq!(format_datetime(&fact.timestamp), format_datetime(&second.timestamp));
        assert_eq!(fact.source_turn_ids.len(), 2);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn decay_age_is_capped_at_one() {
        let repo = SqliteSemanticRepository::new(test_pool().await);
        let fact = SemanticFact::new("bob", "owns", "a bike", 0.5, Utc::now());
        repo.upsert(std::slice::from_ref(&fact)).await.unwrap();
        repo.upsert(std::slice::from_ref(&fact)).await.unwrap();
        let stored = repo.search("bike", 1).await.unwrap();
        assert_eq!(stored[0].decay_age, 1.0);
    }

    #[tokio::test]
    async fn search_ands_terms_and_ranks_by_weight() {
        let repo = SqliteSemanticRepository::new(test_pool().await);
        let now = Utc::now();
        let mut weak = SemanticFact::new("alice", "likes", "green tea", 0.9, now);
        weak.decay_age = 0.2;
        let strong = SemanticFact::new("alice", "drinks", "black tea", 0.7, now);
        let unrelated = SemanticFact::new("alice", "likes", "coffee", 1.0, now);
        repo.upsert(&[weak, strong, unrelated]).await.unwrap();

        let hits = repo.search("Alice tea?", 10).await.unwrap();
        let objects: Vec<&str> = hits.iter().map(|f| f.object.as_str()).collect();
        assert_eq!(objects, ["black tea", "green tea"]);

        // Apostrophes are deleted, not split on: "Alice's" looks for "alices".
        assert!(repo.search("Alice's tea", 10).await.unwrap().is_empty());
        assert_eq!(repo.search("gr-een tea", 10).await.unwrap().len(), 1);

        assert!(repo.search("alice green", 10).await.unwrap().len() == 1);
        assert!(repo.search("  !? ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn decay_shrinks_with_age_and_floors() {
        let repo = SqliteSemanticRepository::new(test_pool().await);
        let now = Utc::now();
        let recent = SemanticFact::new("a", "b", "recent", 0.5, now - Duration::days(2));
        let ancient = SemanticFact::new("a", "b", "ancient", 0.5, now - Duration::days(400));
        repo.upsert(&[recent, ancient]).await.unwrap();

        assert_eq!(repo.apply_decay(now).await.unwrap(), 2);
        let recent = &repo.search("recent", 1).await.unwrap()[0];
        assert!((recent.decay_age - 0.9).abs() < 1e-6);
        let ancient = &repo.search("ancient", 1).await.unwrap()[0];
        assert_eq!(ancient.decay_age, 0.1);
    }
}
