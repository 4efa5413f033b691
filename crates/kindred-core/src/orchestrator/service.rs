//! The turn pipeline.
//!
//! One call to [`Orchestrator::orchestrate`] walks the stages
//! LOAD_STATE, BUDGET, RETRIEVE_MEMORY, ASSEMBLE_PROMPT, GENERATE,
//! CHECK_CONTRADICTIONS, an optional single REGENERATE,
//! CHECK_INVARIANTS_AND_DRIFT, PERSIST and EMIT_METRICS. Nothing is written
//! before GENERATE succeeds.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use kindred_types::coherence::TurnStateSnapshot;
use kindred_types::config::EngineConfig;
use kindred_types::error::TurnError;
use kindred_types::identity::IdentitySnapshot;
use kindred_types::llm::{GenerationParams, TaskType};
use kindred_types::memory::{EpisodicMemory, TokenUsage};
use kindred_types::mood::{MoodSource, PadState};
use kindred_types::turn::{TurnMetadata, TurnMetrics, TurnRequest, TurnResponse, TurnStage};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::budget::{TokenBudget, mood_aware_allocation};
use crate::coherence::{
    CoherenceTracker, ContradictionDetector, ContradictionInput, extract_claims,
};
use crate::identity::{ApprovalPolicy, InvariantEngine};
use crate::llm::ModelRegistry;
use crate::memory::{MemoryService, RecallQuery};
use crate::metrics::{MetricsSink, NullMetricsSink};
use crate::mood::{MoodDecayEngine, modulate};
use crate::prompt::{PromptAssembler, Tokenizer};
use crate::repository::{EpisodicRepository, IdentityRepository, SemanticRepository};

use super::sections::{TurnPromptParts, regeneration_prompt, turn_sections, wrap_system_prompt};

/// Identity and mood in effect at the start of a turn.
#[derive(Debug, Clone)]
struct LoadedState {
    identity: IdentitySnapshot,
    mood: PadState,
    episodic_count: u64,
    semantic_count: u64,
}

/// A session's coherence tracker and when a turn last touched it.
struct SessionEntry {
    tracker: Arc<Mutex<CoherenceTracker>>,
    last_seen: Instant,
}

/// Sequences every component for one conversational turn.
///
/// Generic over the repository ports and the contradiction detector so
/// kindred-core never depends on kindred-infra.
pub struct Orchestrator<E, S, I, D>
where
    E: EpisodicRepository,
    S: SemanticRepository,
    I: IdentityRepository,
    D: ContradictionDetector,
{
    memory: MemoryService<E, S>,
    identities: I,
    detector: D,
    models: Arc<ModelRegistry>,
    assembler: PromptAssembler,
    decay: MoodDecayEngine,
    invariants: InvariantEngine,
    metrics: Arc<dyn MetricsSink>,
    trackers: DashMap<String, SessionEntry>,
    config: EngineConfig,
}

impl<E, S, I, D> Orchestrator<E, S, I, D>
where
    E: EpisodicRepository,
    S: SemanticRepository,
    I: IdentityRepository,
    D: ContradictionDetector,
{
    pub fn new(
        memory: MemoryService<E, S>,
        identities: I,
        detector: D,
        models: Arc<ModelRegistry>,
        tokenizer: Arc<dyn Tokenizer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            memory,
            identities,
            detector,
            models,
            assembler: PromptAssembler::new(tokenizer),
            decay: MoodDecayEngine::from_config(&config.mood),
            invariants: InvariantEngine,
            metrics: Arc::new(NullMetricsSink),
            trackers: DashMap::new(),
            config,
        }
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn memory(&self) -> &MemoryService<E, S> {
        &self.memory
    }

    pub fn identity_repo(&self) -> &I {
        &self.identities
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            require_review: self.config.identity.require_review,
        }
    }

    /// The coherence tracker for a session, created on first use. Marks the
    /// session as seen now.
    pub fn tracker_for(&self, session_id: &str) -> Arc<Mutex<CoherenceTracker>> {
        let mut entry = self
            .trackers
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                tracker: Arc::new(Mutex::new(CoherenceTracker::new(
                    self.config.coherence.clone(),
                ))),
                last_seen: Instant::now(),
            });
        entry.last_seen = Instant::now();
        entry.tracker.clone()
    }

    pub fn session_count(&self) -> usize {
        self.trackers.len()
    }

    /// Drop sessions idle for at least `coherence.session_idle_secs` as of
    /// `now`, with their model overrides. Sessions with a turn in flight are
    /// kept. Returns how many were dropped.
    pub fn evict_idle_sessions(&self, now: Instant) -> usize {
        let idle = Duration::from_secs(self.config.coherence.session_idle_secs);
        let mut evicted = Vec::new();
        self.trackers.retain(|session_id, entry| {
            let in_use = Arc::strong_count(&entry.tracker) > 1;
            let keep = in_use || now.saturating_duration_since(entry.last_seen) < idle;
            if !keep {
                evicted.push(session_id.clone());
            }
            keep
        });
        for session_id in &evicted {
            self.models.clear_session(session_id);
        }
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), "evicted idle sessions");
        }
        evicted.len()
    }

    /// Forget a session's coherence history and model overrides.
    pub fn end_session(&self, session_id: &str) {
        self.trackers.remove(session_id);
        self.models.clear_session(session_id);
    }

    /// Current identity for the user, or the skeleton when none is usable.
    pub async fn current_identity(&self, user_id: &str) -> Result<IdentitySnapshot, TurnError> {
        let current = self
            .identities
            .current(user_id, self.approval_policy())
            .await?;
        Ok(current.unwrap_or_else(|| {
            debug!(user_id, "no identity version, using skeleton");
            IdentitySnapshot::skeleton()
        }))
    }

    /// Mood carried by the user's latest episode, decayed to `now`.
    pub async fn current_mood(
        &self,
        user_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<PadState, TurnError> {
        let last = match self.memory.episodic_repo().latest_for_user(user_id).await? {
            Some(episode) => PadState {
                source: MoodSource::Stored,
                ..episode.mood
            },
            None => PadState::baseline(now),
        };
        Ok(self.decay.decay(&last, now))
    }

    /// Host hook: wrap the host's system prompt with the active identity
    /// and mood.
    pub async fn modify_system_prompt(&self, base: &str, user_id: &str) -> Result<String, TurnError> {
        let identity = self.current_identity(user_id).await?;
        let mood = self.current_mood(user_id, Utc::now()).await?;
        Ok(wrap_system_prompt(
            &self.config.prompt.active_marker,
            base,
            &identity,
            &mood,
        ))
    }

    /// Produce one validated response for a request.
    pub async fn orchestrate(&self, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        if request.user_id.trim().is_empty() {
            return Err(TurnError::InvalidRequest("user_id is empty".to_string()));
        }
        if request.session_id.trim().is_empty() {
            return Err(TurnError::InvalidRequest("session_id is empty".to_string()));
        }

        let turn_id = Uuid::now_v7();
        let span = info_span!(
            "turn",
            %turn_id,
            user_id = %request.user_id,
            session_id = %request.session_id
        );
        self.run_turn(turn_id, &request).instrument(span).await
    }

    async fn run_turn(&self, turn_id: Uuid, request: &TurnRequest) -> Result<TurnResponse, TurnError> {
        let started = Instant::now();
        let mut stages = Vec::with_capacity(11);
        let now = request.timestamp;

        // Turns within one session run one at a time.
        let session_tracker = self.tracker_for(&request.session_id);
        let mut tracker = session_tracker.lock().await;

        enter(&mut stages, TurnStage::LoadState);
        let state = self.load_state(&request.user_id, now).await?;

        enter(&mut stages, TurnStage::Budget);
        let mut budget = TokenBudget::from_config(&self.config.budget);
        let allocation = mood_aware_allocation(state.mood.arousal, self.config.budget.response_base);
        let modulation = modulate(&state.mood);

        enter(&mut stages, TurnStage::RetrieveMemory);
        let turn_memory = self
            .memory
            .retrieve_memory_for_turn(
                &request.user_id,
                &request.user_input,
                allocation.memory_context,
                now,
            )
            .await?;
        let exclude: HashSet<Uuid> = turn_memory.recent_turn_ids.iter().copied().collect();
        let mut recall_budget = TokenBudget::with_ceiling(allocation.memory_context, BTreeMap::new());
        let recall = self
            .memory
            .retrieve_relevant(
                RecallQuery {
                    user_id: &request.user_id,
                    session_id: &request.session_id,
                    text: &request.user_input,
                    expertise_domains: &state.identity.kernel.expertise_domains,
                    now,
                },
                &mut recall_budget,
                &exclude,
            )
            .await?;

        enter(&mut stages, TurnStage::AssemblePrompt);
        let system = wrap_system_prompt(
            &self.config.prompt.active_marker,
            &self.config.prompt.system_prompt,
            &state.identity,
            &state.mood,
        );
        let sections = turn_sections(&TurnPromptParts {
            system: &system,
            identity: &state.identity,
            mood: &modulation,
            memory: &turn_memory.text,
            recall: &recall.text,
            request: &request.user_input,
        });
        let prompt = self.assembler.assemble(&sections, &mut budget);

        enter(&mut stages, TurnStage::Generate);
        let client = self
            .models
            .get_model_for_session(&request.session_id, TaskType::PrimaryReasoning)?;
        let params = GenerationParams {
            max_tokens: allocation.response,
            temperature: Some(modulation.temperature),
            top_p: Some(modulation.top_p),
        };
        let generated = client.call(&prompt.text, &params).await?;
        let mut prompt_tokens = self.assembler.count_tokens(&prompt.text);
        let mut text = generated.text;
        let mut model_used = generated.model;

        enter(&mut stages, TurnStage::CheckContradictions);
        let prior_claims = tracker.prior_claims();
        let report = self
            .detector
            .detect(&ContradictionInput {
                response: &text,
                user_input: &request.user_input,
                identity: &state.identity,
                prior_claims: &prior_claims,
            })
            .await;

        let mut regenerated = false;
        let mut completion_tokens = self.assembler.count_tokens(&text);
        if report.requires_regeneration() {
            enter(&mut stages, TurnStage::Regenerate);
            warn!(findings = report.findings.len(), "contradictions found, regenerating once");
            let retry_prompt = regeneration_prompt(&report, &request.user_input);
            let retry = client.call(&retry_prompt, &params).await?;
            prompt_tokens = prompt_tokens.saturating_add(self.assembler.count_tokens(&retry_prompt));
            completion_tokens = completion_tokens.saturating_add(self.assembler.count_tokens(&retry.text));
            text = retry.text;
            model_used = retry.model;
            regenerated = true;
        }

        enter(&mut stages, TurnStage::CheckInvariantsAndDrift);
        let invariants = self
            .invariants
            .validate(&text, &state.identity.kernel)
            .merge(tracker.check_invariants(&text, &state.identity));
        let claims = self.claims_for(&request.session_id, &text).await;
        let snapshot = TurnStateSnapshot {
            turn_id,
            timestamp: now,
            identity: state.identity.clone(),
            mood: PadState {
                timestamp: now,
                source: MoodSource::Turn,
                ..state.mood
            },
            claims,
            episodic_count: state.episodic_count + 1,
            semantic_count: state.semantic_count,
        };
        let drift = tracker.detect_drift_with(&snapshot);
        if drift.drift_detected {
            warn!(reason = %drift.reason, "identity drift detected");
        }
        if !invariants.passed {
            warn!(violations = invariants.violations.len(), "invariant violations in response");
        }

        enter(&mut stages, TurnStage::Persist);
        let token_usage = TokenUsage::new(prompt_tokens, completion_tokens);
        let episode = EpisodicMemory {
            turn_id,
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            timestamp: now,
            user_input: request.user_input.clone(),
            response: text.clone(),
            identity: state.identity.clone(),
            mood: snapshot.mood,
            token_usage,
            salience_score: EpisodicMemory::DEFAULT_SALIENCE,
            emotional_valence: state.mood.valence,
            concept_tags: Vec::new(),
            contradiction_flags: invariants.messages(),
            embedding: None,
            consolidated: false,
        };
        // A missing vector only costs the episode its similarity score.
        let embedding = match self.memory.embedder().embed_one(&episode.searchable_text()).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "episode embedding failed, storing without vector");
                None
            }
        };
        let episode = EpisodicMemory {
            embedding,
            ..episode
        };
        self.memory.episodic_repo().append(&episode).await?;
        tracker.push(snapshot);
        drop(tracker);

        enter(&mut stages, TurnStage::EmitMetrics);
        let contradiction_count = u32::try_from(report.findings.len()).unwrap_or(u32::MAX);
        let metrics = TurnMetrics {
            turn_id,
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            tokens_used: token_usage.total_tokens,
            contradiction_count,
            model_used: model_used.clone(),
        };
        if let Err(e) = self.metrics.record(&metrics) {
            warn!(error = %e, "metrics sink rejected turn metrics");
        }

        enter(&mut stages, TurnStage::Done);
        info!(
            latency_ms = metrics.latency_ms,
            tokens = token_usage.total_tokens,
            regenerated,
            "turn complete"
        );

        Ok(TurnResponse {
            text,
            turn_id,
            metadata: TurnMetadata {
                drift_detected: drift.drift_detected,
                drift_reason: drift.reason,
                mood_drift: drift.mood_drift,
                identity_drift: drift.identity_drift,
                token_usage,
                budget: budget.report(),
                invariants,
                contradiction_severity: report.severity(),
                contradiction_count,
                regenerated,
                degraded_sections: prompt.degraded,
                forced_sections: prompt.forced,
                identity_version: state.identity.version,
                model_used,
                stages,
            },
        })
    }

    async fn load_state(
        &self,
        user_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<LoadedState, TurnError> {
        let identity = self.current_identity(user_id).await?;
        let mood = self.current_mood(user_id, now).await?;
        let episodic_count = self.memory.episodic_repo().count().await?;
        let semantic_count = self.memory.semantic_repo().count().await?;
        Ok(LoadedState {
            identity,
            mood,
            episodic_count,
            semantic_count,
        })
    }

    /// Self-claims made in `response`. Extraction problems only cost the
    /// claims, never the turn.
    async fn claims_for(&self, session_id: &str, response: &str) -> Vec<String> {
        if !self.config.coherence.extract_claims {
            return Vec::new();
        }
        let client = match self
            .models
            .get_model_for_session(session_id, TaskType::FactExtraction)
        {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "no model for claim extraction");
                return Vec::new();
            }
        };
        match extract_claims(&client, response).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "claim extraction failed");
                Vec::new()
            }
        }
    }
}

fn enter(stages: &mut Vec<TurnStage>, stage: TurnStage) {
    debug!(stage = %stage, "entering stage");
    stages.push(stage);
}
