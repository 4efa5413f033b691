//! REST API handlers.

pub mod metrics;
pub mod session;
pub mod turn;
