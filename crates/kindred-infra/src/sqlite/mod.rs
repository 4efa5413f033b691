//! SQLite storage layer.
//!
//! Repository implementations of the kindred-core ports, sharing one
//! [`DatabasePool`].

pub(crate) mod codec;
pub mod consolidation;
pub mod episodic;
pub mod identity;
pub mod pool;
pub mod semantic;

pub use consolidation::SqliteConsolidationRepository;
pub use episodic::SqliteEpisodicRepository;
pub use identity::SqliteIdentityRepository;
pub use pool::{DatabasePool, database_url};
pub use semantic::SqliteSemanticRepository;
