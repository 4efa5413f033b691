//! Shared domain types for Kindred.
//!
//! This crate contains the value types used across the turn engine:
//! identity, mood, memory, coherence and turn records, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod coherence;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
pub mod memory;
pub mod mood;
pub mod turn;
