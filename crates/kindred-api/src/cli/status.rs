//! System status dashboard command.

use anyhow::Result;
use console::style;

use kindred_core::repository::{ConsolidationRepository, EpisodicRepository, SemanticRepository};

use super::consolidate::jobs_table;
use crate::state::AppState;

/// Display system status dashboard.
///
/// Shows store counts, configured models and the latest consolidation jobs.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let memory = state.orchestrator.memory();
    let episodes = memory.episodic_repo().count().await?;
    let users = memory.episodic_repo().users().await?;
    let facts = memory.semantic_repo().count().await?;
    let jobs = state.consolidation.jobs_repo().recent_jobs(5).await?;

    let models = &state.config.models;
    let endpoints: Vec<&str> = models.endpoints.keys().map(String::as_str).collect();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "episodes": episodes,
            "users": users.len(),
            "facts": facts,
            "models": {
                "default": models.default,
                "configured": endpoints,
                "overrides": models.overrides,
            },
            "recent_jobs": jobs,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Kindred v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Memory ──").dim());
    println!("  Episodes: {}", style(episodes).bold());
    println!("  Users:    {}", style(users.len()).bold());
    println!("  Facts:    {}", style(facts).bold());
    println!();

    println!("  {}", style("── Models ──").dim());
    println!("  Default:  {}", style(&models.default).cyan());
    println!("  Known:    {}", endpoints.join(", "));
    for (task, model) in &models.overrides {
        println!("  {task} → {model}");
    }
    println!();

    println!("  {}", style("── Consolidation ──").dim());
    if jobs.is_empty() {
        println!("  No jobs yet.");
    } else {
        println!("{}", jobs_table(&jobs));
    }
    println!();

    println!(
        "  {}",
        style(format!("Data: {}", state.data_dir.display())).dim()
    );
    println!();
    Ok(())
}
