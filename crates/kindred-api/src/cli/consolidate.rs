//! Consolidation command.

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use kindred_types::memory::{ConsolidationJob, JobStatus};

use crate::state::AppState;

/// Consolidate the given users, or every user with episodes when empty.
pub async fn consolidate(state: &AppState, users: &[String], json: bool) -> Result<()> {
    let now = Utc::now();
    let jobs = if users.is_empty() {
        state.consolidation.run_all(now).await?
    } else {
        state.consolidation.run_for_users(users, now).await
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }
    if jobs.is_empty() {
        println!("  Nothing to consolidate.");
        return Ok(());
    }
    println!("{}", jobs_table(&jobs));

    let failed = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();
    if failed > 0 {
        println!("  {} {failed} job(s) failed and were rolled back", style("!").yellow().bold());
    }
    Ok(())
}

pub fn jobs_table(jobs: &[ConsolidationJob]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("User").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Episodes").fg(Color::White),
        Cell::new("Facts").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Error").fg(Color::White),
    ]);

    for job in jobs {
        let status = match job.status {
            JobStatus::Completed => Cell::new(job.status).fg(Color::Green),
            JobStatus::Failed => Cell::new(job.status).fg(Color::Red),
            JobStatus::Running => Cell::new(job.status).fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(&job.user_id),
            status,
            Cell::new(job.episodes_processed),
            Cell::new(job.facts_written),
            Cell::new(job.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(job.error.as_deref().unwrap_or("")),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_table_shows_errors() {
        let mut job = ConsolidationJob::start("ada", Utc::now());
        job.status = JobStatus::Failed;
        job.error = Some("disk full".to_string());
        let rendered = jobs_table(&[job]).to_string();
        assert!(rendered.contains("ada"));
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("disk full"));
    }
}
