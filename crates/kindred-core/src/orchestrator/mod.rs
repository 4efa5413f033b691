//! Turn orchestration: the state machine that sequences every component.

pub mod sections;
pub mod service;

pub use sections::{regeneration_prompt, turn_sections, wrap_system_prompt};
pub use service::Orchestrator;
