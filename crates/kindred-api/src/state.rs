//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository traits, but AppState pins them to the
//! concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use kindred_core::coherence::SelfNameDetector;
use kindred_core::llm::ModelRegistry;
use kindred_core::memory::{ConsolidationService, MemoryService};
use kindred_core::metrics::{FanoutMetricsSink, MetricsRecorder};
use kindred_core::orchestrator::Orchestrator;
use kindred_core::prompt::HeuristicTokenizer;
use kindred_infra::config::{data_dir, load_engine_config};
use kindred_infra::llm::build_registry;
use kindred_infra::vector::build_embedder;
use kindred_infra::sqlite::{
    DatabasePool, SqliteConsolidationRepository, SqliteEpisodicRepository,
    SqliteIdentityRepository, SqliteSemanticRepository,
};
use kindred_observe::TracingMetricsSink;
use kindred_types::config::EngineConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteOrchestrator = Orchestrator<
    SqliteEpisodicRepository,
    SqliteSemanticRepository,
    SqliteIdentityRepository,
    SelfNameDetector,
>;

pub type ConcreteConsolidationService =
    ConsolidationService<SqliteEpisodicRepository, SqliteConsolidationRepository>;

/// Whether the command about to run talks to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAccess {
    /// Build and validate the registry; a missing key is fatal.
    Required,
    /// Skip the registry; turns would fail with an unknown-model error.
    Skip,
}

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub consolidation: Arc<ConcreteConsolidationService>,
    pub metrics: Arc<MetricsRecorder>,
    pub config: Arc<EngineConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init(models: ModelAccess) -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_engine_config(&data_dir).await;

        let db_pool = DatabasePool::open(&data_dir).await?;

        let registry = match models {
            ModelAccess::Required => build_registry(&config.models)?,
            ModelAccess::Skip => ModelRegistry::new(config.models.default.clone()),
        };

        let tokenizer = Arc::new(HeuristicTokenizer);
        let memory = MemoryService::new(
            SqliteEpisodicRepository::new(db_pool.clone()),
            SqliteSemanticRepository::new(db_pool.clone()),
            Arc::new(build_embedder(&config.memory, &data_dir.join("models"))),
            tokenizer.clone(),
            config.memory.clone(),
        );

        let metrics = Arc::new(MetricsRecorder::default());
        let sink = FanoutMetricsSink::new()
            .with(metrics.clone())
            .with(Arc::new(TracingMetricsSink));

        let orchestrator = Orchestrator::new(
            memory,
            SqliteIdentityRepository::new(db_pool.clone()),
            SelfNameDetector,
            Arc::new(registry),
            tokenizer,
            config.clone(),
        )
        .with_metrics_sink(Arc::new(sink));

        let consolidation = ConsolidationService::new(
            SqliteEpisodicRepository::new(db_pool.clone()),
            SqliteConsolidationRepository::new(db_pool.clone()),
            config.memory.clone(),
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            consolidation: Arc::new(consolidation),
            metrics,
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}
