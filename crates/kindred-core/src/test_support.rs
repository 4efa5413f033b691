//! In-memory repository fakes and a scripted model client for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use kindred_types::error::RepositoryError;
use kindred_types::identity::IdentitySnapshot;
use kindred_types::llm::{GenerationParams, ModelError, ModelResponse};
use kindred_types::memory::{ConsolidationJob, EpisodicMemory, SemanticFact, TokenUsage};
use kindred_types::mood::PadState;
use uuid::Uuid;

use crate::llm::ModelClient;
use crate::repository::semantic::search_terms;
use crate::repository::{
    ConsolidationRepository, EpisodicRepository, IdentityRepository, SemanticRepository,
};

pub fn episode(
    user: &str,
    session: &str,
    input: &str,
    response: &str,
    at: DateTime<Utc>,
) -> EpisodicMemory {
    EpisodicMemory {
        turn_id: Uuid::now_v7(),
        user_id: user.to_string(),
        session_id: session.to_string(),
        timestamp: at,
        user_input: input.to_string(),
        response: response.to_string(),
        identity: IdentitySnapshot::skeleton(),
        mood: PadState::baseline(at),
        token_usage: TokenUsage::new(10, 5),
        salience_score: EpisodicMemory::DEFAULT_SALIENCE,
        emotional_valence: 0.0,
        concept_tags: Vec::new(),
        contradiction_flags: Vec::new(),
        embedding: None,
        consolidated: false,
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEpisodicRepository {
    rows: Arc<Mutex<Vec<EpisodicMemory>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryEpisodicRepository {
    pub fn insert(&self, episode: EpisodicMemory) {
        self.rows.lock().unwrap().push(episode);
    }

    pub fn all(&self) -> Vec<EpisodicMemory> {
        self.rows.lock().unwrap().clone()
    }

    /// Make every subsequent call fail.
    pub fn break_store(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection)
        } else {
            Ok(())
        }
    }

    pub fn mark_consolidated(&self, ids: &[Uuid]) {
        for row in self.rows.lock().unwrap().iter_mut() {
            if ids.contains(&row.turn_id) {
                row.consolidated = true;
            }
        }
    }
}

impl EpisodicRepository for InMemoryEpisodicRepository {
    async fn append(&self, episode: &EpisodicMemory) -> Result<(), RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.turn_id == episode.turn_id) {
            return Err(RepositoryError::Conflict(episode.turn_id.to_string()));
        }
        rows.push(episode.clone());
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EpisodicMemory>, RepositoryError> {
        self.check()?;
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp > since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn latest_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<EpisodicMemory>, RepositoryError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    async fn unconsolidated_before(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EpisodicMemory>, RepositoryError> {
        self.check()?;
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && !r.consolidated && r.timestamp < cutoff)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn users(&self) -> Result<Vec<String>, RepositoryError> {
        self.check()?;
        let mut users: Vec<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.user_id.clone())
            .collect();
        users.sort();
        users.dedup();
        Ok(users)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    async fn expire_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.timestamp >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Clone, Default)]
pub struct InMemorySemanticRepository {
    facts: Arc<Mutex<Vec<SemanticFact>>>,
}

impl InMemorySemanticRepository {
    pub fn all(&self) -> Vec<SemanticFact> {
        self.facts.lock().unwrap().clone()
    }

    fn upsert_sync(&self, incoming: &[SemanticFact]) {
        let mut facts = self.facts.lock().unwrap();
        for fact in incoming {
            match facts.iter_mut().find(|f| {
                f.subject == fact.subject && f.predicate == fact.predicate && f.object == fact.object
            }) {
                Some(existing) => {
                    existing.confidence = existing.confidence.max(fact.confidence);
                    existing.timestamp = fact.timestamp;
                    existing.decay_age = (existing.decay_age + 0.1).min(SemanticFact::MAX_DECAY_AGE);
                    existing.source_turn_ids.extend(fact.source_turn_ids.iter().copied());
                }
                None => facts.push(fact.clone()),
            }
        }
    }
}

impl SemanticRepository for InMemorySemanticRepository {
    async fn upsert(&self, facts: &[SemanticFact]) -> Result<(), RepositoryError> {
        self.upsert_sync(facts);
        Ok(())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SemanticFact>, RepositoryError> {
        let terms: Vec<String> = search_terms(query)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<SemanticFact> = self
            .facts
            .lock()
            .unwrap()
            .iter()
            .filter(|f| {
                let hay = format!("{} {} {}", f.subject, f.predicate, f.object).to_lowercase();
                terms.iter().all(|t| hay.contains(t.as_str()))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn apply_decay(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut facts = self.facts.lock().unwrap();
        for fact in facts.iter_mut() {
            let days = (now - fact.timestamp).num_seconds() as f64 / 86_400.0;
            fact.decay_age = (fact.decay_age - 0.05 * days).max(SemanticFact::MIN_DECAY_AGE);
        }
        Ok(facts.len() as u64)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.facts.lock().unwrap().len() as u64)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryIdentityRepository {
    versions: Arc<Mutex<HashMap<String, Vec<IdentitySnapshot>>>>,
}

impl IdentityRepository for InMemoryIdentityRepository {
    async fn append(
        &self,
        user_id: &str,
        snapshot: &IdentitySnapshot,
    ) -> Result<(), RepositoryError> {
        let mut versions = self.versions.lock().unwrap();
        let log = versions.entry(user_id.to_string()).or_default();
        if log.iter().any(|s| s.version >= snapshot.version) {
            return Err(RepositoryError::Conflict(format!(
                "version {} is not newer than the stored versions",
                snapshot.version
            )));
        }
        log.push(snapshot.clone());
        Ok(())
    }

    async fn history(&self, user_id: &str) -> Result<Vec<IdentitySnapshot>, RepositoryError> {
        let mut log = self
            .versions
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        log.sort_by_key(|s| s.version);
        Ok(log)
    }
}

#[derive(Clone)]
pub struct InMemoryConsolidationRepository {
    episodic: InMemoryEpisodicRepository,
    semantic: InMemorySemanticRepository,
    jobs: Arc<Mutex<Vec<ConsolidationJob>>>,
    fail_commit: Arc<AtomicBool>,
}

impl InMemoryConsolidationRepository {
    pub fn new(episodic: InMemoryEpisodicRepository) -> Self {
        Self {
            episodic,
            semantic: InMemorySemanticRepository::default(),
            jobs: Arc::new(Mutex::new(Vec::new())),
            fail_commit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn semantic(&self) -> &InMemorySemanticRepository {
        &self.semantic
    }

    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    fn put(&self, job: &ConsolidationJob) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.retain(|j| j.job_id != job.job_id);
        jobs.push(job.clone());
    }
}

impl ConsolidationRepository for InMemoryConsolidationRepository {
    async fn start_job(&self, job: &ConsolidationJob) -> Result<(), RepositoryError> {
        self.put(job);
        Ok(())
    }

    async fn commit(
        &self,
        job: &ConsolidationJob,
        facts: &[SemanticFact],
        episode_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Query("injected commit failure".to_string()));
        }
        self.semantic.upsert_sync(facts);
        self.episodic.mark_consolidated(episode_ids);
        self.put(job);
        Ok(())
    }

    async fn fail_job(&self, job: &ConsolidationJob) -> Result<(), RepositoryError> {
        self.put(job);
        Ok(())
    }

    async fn get_job(&self, job_id: &Uuid) -> Result<Option<ConsolidationJob>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| &j.job_id == job_id)
            .cloned())
    }

    async fn recent_jobs(&self, limit: u32) -> Result<Vec<ConsolidationJob>, RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap().clone();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }
}

/// Model client that replays queued replies and records every prompt.
#[derive(Clone)]
pub struct ScriptedModel {
    name: String,
    replies: Arc<Mutex<VecDeque<Result<String, ModelError>>>>,
    calls: Arc<Mutex<Vec<(String, GenerationParams)>>>,
}

impl ScriptedModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(ModelError::Provider {
            message: message.to_string(),
        }));
        self
    }

    pub fn calls(&self) -> Vec<(String, GenerationParams)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ModelResponse, ModelError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), params.clone()));
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()));
        next.map(|text| ModelResponse {
            text,
            model: self.name.clone(),
        })
    }
}
