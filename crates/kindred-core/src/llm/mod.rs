//! Model abstraction layer for Kindred.
//!
//! The `ModelClient` trait is implemented by backends in kindred-infra;
//! `ModelRegistry` resolves which client serves each task.

pub mod box_client;
pub mod client;
pub mod registry;

pub use box_client::BoxModelClient;
pub use client::ModelClient;
pub use registry::ModelRegistry;
