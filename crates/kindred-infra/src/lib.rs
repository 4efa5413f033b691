//! Infrastructure layer for Kindred.
//!
//! Contains implementations of the repository and model-client traits
//! defined in `kindred-core`: SQLite storage, the OpenAI-compatible model
//! client, the fastembed embedder and the `config.toml` loader.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod vector;
