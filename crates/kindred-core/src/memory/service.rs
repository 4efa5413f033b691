//! Memory retrieval for a turn.
//!
//! Two independent paths feed the prompt:
//! - [`MemoryService::retrieve_memory_for_turn`] builds the MEMORY section
//!   from lexically matched facts plus the last few exchanges, trimmed by a
//!   cheap characters-per-token estimate;
//! - [`MemoryService::retrieve_relevant`] ranks older episodes and packs the
//!   best ones into a dedicated token budget.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kindred_types::config::MemoryConfig;
use kindred_types::error::RepositoryError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::budget::TokenBudget;
use crate::prompt::Tokenizer;
use crate::repository::{EpisodicRepository, SemanticRepository};

use super::box_embedder::BoxEmbedder;
use super::ranker::{MemoryRanker, RankingContext, cosine_similarity};

/// Budget component charged for each packed episode.
pub const FRAGMENT_COMPONENT: &str = "memory_fragment";
/// Returned by packing when nothing qualifies.
pub const NO_CONTEXT_SENTINEL: &str = "[No prior relevant context]";
pub const TRUNCATION_MARKER: &str = "... [Context Truncated]";
const CHARS_PER_TOKEN: usize = 4;

/// The MEMORY section body plus what went into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnMemory {
    pub text: String,
    /// Episodes rendered in the recent-history block.
    pub recent_turn_ids: Vec<Uuid>,
    pub fact_count: usize,
    pub truncated: bool,
}

/// Ranked, diversity-filtered episodes that fit the budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedMemory {
    pub text: String,
    pub included: Vec<Uuid>,
}

/// Inputs for ranked recall.
#[derive(Debug, Clone, Copy)]
pub struct RecallQuery<'a> {
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub text: &'a str,
    pub expertise_domains: &'a [String],
    pub now: DateTime<Utc>,
}

/// Reads both memory tiers for prompt assembly.
///
/// Generic over the episodic and semantic repositories so kindred-core
/// never depends on kindred-infra.
pub struct MemoryService<E: EpisodicRepository, S: SemanticRepository> {
    episodic: E,
    semantic: S,
    embedder: Arc<BoxEmbedder>,
    tokenizer: Arc<dyn Tokenizer>,
    ranker: MemoryRanker,
    config: MemoryConfig,
}

impl<E: EpisodicRepository, S: SemanticRepository> MemoryService<E, S> {
    pub fn new(
        episodic: E,
        semantic: S,
        embedder: Arc<BoxEmbedder>,
        tokenizer: Arc<dyn Tokenizer>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            episodic,
            semantic,
            embedder,
            tokenizer,
            ranker: MemoryRanker,
            config,
        }
    }

    pub fn episodic_repo(&self) -> &E {
        &self.episodic
    }

    pub fn semantic_repo(&self) -> &S {
        &self.semantic
    }

    pub fn embedder(&self) -> &Arc<BoxEmbedder> {
        &self.embedder
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Facts matching `text` followed by the user's recent exchanges.
    ///
    /// When the combined text is longer than `allowance * 4` characters it
    /// is cut at that length and marked truncated.
    pub async fn retrieve_memory_for_turn(
        &self,
        user_id: &str,
        text: &str,
        allowance: u32,
        now: DateTime<Utc>,
    ) -> Result<TurnMemory, RepositoryError> {
        let facts = self.semantic.search(text, self.config.fact_limit).await?;
        let since = now - Duration::hours(self.config.recent_history_hours);
        let mut recent = self
            .episodic
            .recent_for_user(user_id, since, self.config.recent_history_limit)
            .await?;
        recent.reverse();

        let mut lines = Vec::new();
        if !facts.is_empty() {
            lines.push("[RELEVANT FACTS]".to_string());
            lines.extend(facts.iter().map(|f| {
                format!(
                    "- {} {} {} (confidence: {:.2})",
                    f.subject, f.predicate, f.object, f.confidence
                )
            }));
        }
        if !recent.is_empty() {
            let header = if lines.is_empty() { "[RECENT HISTORY]" } else { "\n[RECENT HISTORY]" };
            lines.push(header.to_string());
            lines.extend(
                recent
                    .iter()
                    .map(|e| format!("User: {}\nAssistant: {}", e.user_input, e.response)),
            );
        }

        let mut context = lines.join("\n");
        let max_chars = (allowance as usize).saturating_mul(CHARS_PER_TOKEN);
        let truncated = context.chars().count() > max_chars;
        if truncated {
            let cut = context
                .char_indices()
                .nth(max_chars)
                .map_or(context.len(), |(i, _)| i);
            context.truncate(cut);
            context.push_str(TRUNCATION_MARKER);
        }

        debug!(
            user_id,
            facts = facts.len(),
            recent = recent.len(),
            truncated,
            "retrieved turn memory"
        );

        Ok(TurnMemory {
            text: context,
            recent_turn_ids: recent.iter().map(|e| e.turn_id).collect(),
            fact_count: facts.len(),
            truncated,
        })
    }

    /// Rank the user's episodes against the query and pack the best ones.
    ///
    /// Candidates too similar to an already-packed episode are skipped. The
    /// first candidate the budget refuses ends packing.
    pub async fn retrieve_relevant(
        &self,
        query: RecallQuery<'_>,
        budget: &mut TokenBudget,
        exclude: &HashSet<Uuid>,
    ) -> Result<PackedMemory, RepositoryError> {
        let candidates = self
            .episodic
            .recent_for_user(
                query.user_id,
                DateTime::<Utc>::UNIX_EPOCH,
                self.config.max_history_scan,
            )
            .await?
            .into_iter()
            .filter(|e| !exclude.contains(&e.turn_id))
            .collect::<Vec<_>>();

        // Without a query vector every candidate gets the neutral similarity.
        let query_embedding = match self.embedder.embed_one(query.text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "query embedding failed, ranking without similarity");
                None
            }
        };
        let ctx = RankingContext {
            query_embedding: query_embedding.as_deref(),
            session_id: query.session_id,
            expertise_domains: query.expertise_domains,
            now: query.now,
        };
        let ranked = self.ranker.rank(candidates, &ctx);

        let mut selected_embeddings: Vec<Vec<f32>> = Vec::new();
        let mut fragments = Vec::new();
        let mut included = Vec::new();

        for candidate in ranked {
            let episode = candidate.episode;
            if let Some(embedding) = episode.embedding.as_deref() {
                let redundant = selected_embeddings.iter().any(|chosen| {
                    cosine_similarity(embedding, chosen)
                        .is_some_and(|sim| sim > self.config.diversity_threshold)
                });
                if redundant {
                    continue;
                }
            }

            let fragment = format!(
                "[{}] USER: {}\nASSISTANT: {}",
                episode.timestamp.format("%Y-%m-%d %H:%M"),
                episode.user_input,
                episode.response
            );
            let tokens = u32::try_from(self.tokenizer.count_tokens(&fragment)).unwrap_or(u32::MAX);
            if !budget.allocate(FRAGMENT_COMPONENT, tokens) {
                debug!(packed = included.len(), "memory budget exhausted, stopping pack");
                break;
            }

            if let Some(embedding) = episode.embedding {
                selected_embeddings.push(embedding);
            }
            included.push(episode.turn_id);
            fragments.push(fragment);
        }

        let text = if fragments.is_empty() {
            NO_CONTEXT_SENTINEL.to_string()
        } else {
            fragments.join("\n\n")
        };
        Ok(PackedMemory { text, included })
    }
}
