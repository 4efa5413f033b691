//! Business logic and repository trait definitions for Kindred.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements. It depends only on `kindred-types` -- never on
//! `kindred-infra` or any database/IO crate.

pub mod budget;
pub mod coherence;
pub mod identity;
pub mod llm;
pub mod memory;
pub mod metrics;
pub mod mood;
pub mod orchestrator;
pub mod prompt;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;
