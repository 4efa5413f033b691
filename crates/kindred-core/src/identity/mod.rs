pub mod invariant;
pub mod versioning;

pub use invariant::InvariantEngine;
pub use versioning::{ApprovalPolicy, next_version, select_current};
