//! Kindred CLI and REST API entry point.
//!
//! Binary name: `kindred`
//!
//! Parses CLI arguments, loads configuration, initializes the database and
//! services, then dispatches to the command handler or starts the REST API
//! server.

mod cli;
mod http;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cli::{Cli, Commands};
use state::{AppState, ModelAccess};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    kindred_observe::init_tracing(cli.otel, cli.log_filter())
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    kindred_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let models = match &cli.command {
        Commands::Turn { .. } | Commands::Chat { .. } | Commands::Serve { .. } => {
            ModelAccess::Required
        }
        _ => ModelAccess::Skip,
    };

    // Initialize application state (config, DB, services)
    let state = AppState::init(models).await?;

    match cli.command {
        Commands::Turn { target, message } => {
            cli::turn::run_turn(&state, &target, &message, cli.json).await?;
        }

        Commands::Chat { target } => {
            cli::turn::chat(&state, &target, cli.json).await?;
        }

        Commands::Consolidate { users } => {
            cli::consolidate::consolidate(&state, &users, cli.json).await?;
        }

        Commands::Identity { action } => {
            cli::identity::handle(&state, action, cli.json).await?;
        }

        Commands::Facts { action } => {
            cli::memory::handle_facts(&state, action, cli.json).await?;
        }

        Commands::Episodes { action } => {
            cli::memory::handle_episodes(&state, action, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Kindred API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {}",
                console::style("Press Ctrl+C to stop").dim()
            );

            let sweeper = spawn_session_sweeper(state.orchestrator.clone());
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            sweeper.abort();

            println!("\n  Server stopped.");
        }
    }

    Ok(())
}

/// Periodically drop coherence trackers of sessions that went quiet
/// without calling `DELETE /api/v1/sessions/{id}`.
fn spawn_session_sweeper(
    orchestrator: Arc<state::ConcreteOrchestrator>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = orchestrator.evict_idle_sessions(std::time::Instant::now());
            if evicted > 0 {
                tracing::info!(evicted, "idle sessions evicted");
            }
        }
    })
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
