//! Two-tier memory for Kindred.
//!
//! Episodic records are ranked and packed into the prompt; aged episodes are
//! periodically consolidated into semantic facts.

pub mod box_embedder;
pub mod consolidation;
pub mod embedder;
pub mod ranker;
pub mod service;

pub use box_embedder::BoxEmbedder;
pub use consolidation::ConsolidationService;
pub use embedder::{Embedder, HashingEmbedder};
pub use ranker::{MemoryRanker, RankedEpisode, RankingContext, cosine_similarity};
pub use service::{MemoryService, PackedMemory, RecallQuery, TurnMemory};
