//! Coherence checks run on every generated response.

pub mod claims;
pub mod contradiction;
pub mod tracker;

pub use claims::{claims_prompt, extract_claims, parse_claims};
pub use contradiction::{
    ContradictionDetector, ContradictionInput, NoopContradictionDetector, SelfNameDetector,
};
pub use tracker::{CoherenceTracker, trait_distance};
