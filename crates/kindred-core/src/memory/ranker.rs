//! Episode relevance scoring.
//!
//! score = 0.50 * similarity + 0.30 * recency + 0.15 * session + 0.05 * domain,
//! rounded to four decimals.

use chrono::{DateTime, Utc};
use kindred_types::memory::EpisodicMemory;

const W_SIMILARITY: f64 = 0.50;
const W_RECENCY: f64 = 0.30;
const W_SESSION: f64 = 0.15;
const W_DOMAIN: f64 = 0.05;

/// Similarity assumed when embeddings are missing or unusable.
const NEUTRAL_SIMILARITY: f64 = 0.5;
const RECENCY_RATE_PER_HOUR: f64 = 0.01;
const SAME_SESSION: f64 = 1.0;
const OTHER_SESSION: f64 = 0.5;
const DOMAIN_MATCH: f64 = 0.9;
const DOMAIN_MISS: f64 = 0.5;

/// Cosine similarity, clamped to [-1, 1].
///
/// `None` for empty, zero-norm or differently-sized vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    Some((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0))
}

/// Whole-word, case-insensitive phrase match.
fn contains_phrase(text_words: &[String], phrase: &str) -> bool {
    let needle: Vec<String> = words(phrase);
    !needle.is_empty()
        && text_words
            .windows(needle.len())
            .any(|window| window == needle.as_slice())
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// What a candidate is scored against.
#[derive(Debug, Clone, Copy)]
pub struct RankingContext<'a> {
    pub query_embedding: Option<&'a [f32]>,
    pub session_id: &'a str,
    pub expertise_domains: &'a [String],
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEpisode {
    pub episode: EpisodicMemory,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryRanker;

impl MemoryRanker {
    pub fn score(&self, episode: &EpisodicMemory, ctx: &RankingContext<'_>) -> f64 {
        let similarity = match (ctx.query_embedding, episode.embedding.as_deref()) {
            (Some(q), Some(m)) => cosine_similarity(q, m).unwrap_or(NEUTRAL_SIMILARITY),
            _ => NEUTRAL_SIMILARITY,
        };

        let age_hours = ((ctx.now - episode.timestamp).num_seconds() as f64 / 3600.0).max(0.0);
        let recency = (-RECENCY_RATE_PER_HOUR * age_hours).exp();

        let session = if episode.session_id == ctx.session_id {
            SAME_SESSION
        } else {
            OTHER_SESSION
        };

        let text_words = words(&episode.searchable_text());
        let domain = if ctx
            .expertise_domains
            .iter()
            .any(|d| contains_phrase(&text_words, d))
        {
            DOMAIN_MATCH
        } else {
            DOMAIN_MISS
        };

        let raw = W_SIMILARITY * similarity
            + W_RECENCY * recency
            + W_SESSION * session
            + W_DOMAIN * domain;
        (raw * 10_000.0).round() / 10_000.0
    }

    /// Score and sort descending. Equal scores keep their input order.
    pub fn rank(
        &self,
        episodes: Vec<EpisodicMemory>,
        ctx: &RankingContext<'_>,
    ) -> Vec<RankedEpisode> {
        let mut ranked: Vec<RankedEpisode> = episodes
            .into_iter()
            .map(|episode| RankedEpisode {
                score: self.score(&episode, ctx),
                episode,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}
