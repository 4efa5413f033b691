//! Memory maintenance commands: fact search and decay, episode expiry.

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use kindred_core::repository::{EpisodicRepository, SemanticRepository};
use kindred_types::memory::SemanticFact;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum FactsCommand {
    /// Keyword search over stored facts, strongest first.
    Search {
        /// Words that must all appear in the fact.
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Age every fact by the time since it was last reinforced.
    Decay,
}

#[derive(Subcommand)]
pub enum EpisodesCommand {
    /// Delete episodes older than the retention window.
    Expire {
        /// Retention in days. Defaults to `memory.episode_retention_days`.
        #[arg(long)]
        days: Option<i64>,
    },
}

pub async fn handle_facts(state: &AppState, action: FactsCommand, json: bool) -> Result<()> {
    let semantic = state.orchestrator.memory().semantic_repo();
    match action {
        FactsCommand::Search { query, limit } => {
            let facts = semantic.search(&query, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&facts)?);
            } else if facts.is_empty() {
                println!("  No facts match '{query}'.");
            } else {
                println!("{}", facts_table(&facts));
            }
        }
        FactsCommand::Decay => {
            let touched = semantic.apply_decay(Utc::now()).await?;
            if json {
                println!("{}", serde_json::json!({ "facts_decayed": touched }));
            } else {
                println!("  {} Decayed {touched} fact(s)", style("✓").green());
            }
        }
    }
    Ok(())
}

pub async fn handle_episodes(state: &AppState, action: EpisodesCommand, json: bool) -> Result<()> {
    match action {
        EpisodesCommand::Expire { days } => {
            let days = days.unwrap_or(state.config.memory.episode_retention_days);
            anyhow::ensure!(days >= 0, "retention days must not be negative");
            let cutoff = Utc::now() - Duration::days(days);
            let deleted = state
                .orchestrator
                .memory()
                .episodic_repo()
                .expire_before(cutoff)
                .await?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "episodes_deleted": deleted, "cutoff": cutoff })
                );
            } else {
                println!(
                    "  {} Deleted {deleted} episode(s) older than {days} day(s)",
                    style("✓").green()
                );
            }
        }
    }
    Ok(())
}

fn facts_table(facts: &[SemanticFact]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Subject").fg(Color::White),
        Cell::new("Predicate").fg(Color::White),
        Cell::new("Object").fg(Color::White),
        Cell::new("Confidence").fg(Color::White),
        Cell::new("Freshness").fg(Color::White),
        Cell::new("Sources").fg(Color::White),
    ]);

    for fact in facts {
        table.add_row(vec![
            Cell::new(&fact.subject),
            Cell::new(&fact.predicate),
            Cell::new(&fact.object),
            Cell::new(format!("{:.2}", fact.confidence)),
            Cell::new(format!("{:.2}", fact.decay_age)),
            Cell::new(fact.source_turn_ids.len()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facts_table_formats_scores() {
        let fact = SemanticFact::new("ada", "likes", "tea", 0.75, Utc::now());
        let rendered = facts_table(&[fact]).to_string();
        assert!(rendered.contains("likes"));
        assert!(rendered.contains("0.75"));
    }
}
