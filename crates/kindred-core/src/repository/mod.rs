//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (kindred-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod consolidation;
pub mod episodic;
pub mod identity;
pub mod semantic;

pub use consolidation::ConsolidationRepository;
pub use episodic::EpisodicRepository;
pub use identity::IdentityRepository;
pub use semantic::SemanticRepository;
