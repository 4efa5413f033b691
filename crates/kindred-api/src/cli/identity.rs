//! Identity commands: show the current version, list history, append a new one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use kindred_core::identity::next_version;
use kindred_core::repository::IdentityRepository;
use kindred_types::identity::{ApprovalStatus, IdentityKernel, IdentitySnapshot};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum IdentityCommand {
    /// Show the identity version in effect for a user.
    Show {
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// List every stored version, oldest first.
    History {
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Append a new version from a TOML kernel file.
    Append {
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Path to a TOML file with name, role, core_values, ... fields.
        #[arg(long)]
        kernel: PathBuf,

        /// Approval status: auto, reviewed, user_approved or system_rollback.
        #[arg(long, default_value = "user_approved")]
        status: ApprovalStatus,

        /// Why this version exists.
        #[arg(long, default_value = "")]
        reflection: String,
    },
}

pub async fn handle(state: &AppState, action: IdentityCommand, json: bool) -> Result<()> {
    match action {
        IdentityCommand::Show { user } => show(state, &user, json).await,
        IdentityCommand::History { user } => history(state, &user, json).await,
        IdentityCommand::Append {
            user,
            kernel,
            status,
            reflection,
        } => append(state, &user, &kernel, status, reflection, json).await,
    }
}

async fn show(state: &AppState, user: &str, json: bool) -> Result<()> {
    let current = state.orchestrator.current_identity(user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&current)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} {}",
        style("◆").cyan(),
        style(&current.kernel.name).bold(),
        style(format!("v{} ({})", current.version, current.approval_status)).dim()
    );
    if current.version == 0 {
        println!("  {}", style("No stored version; using the built-in fallback").yellow());
    }
    println!();
    for line in current.kernel.to_prompt_text().lines() {
        println!("  {line}");
    }
    if !current.kernel.invariants.is_empty() {
        println!("  Invariants: {}", current.kernel.invariants.len());
    }
    println!();
    Ok(())
}

async fn history(state: &AppState, user: &str, json: bool) -> Result<()> {
    let versions = state.orchestrator.identity_repo().history(user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }
    if versions.is_empty() {
        println!("  No identity versions stored for '{user}'.");
        return Ok(());
    }
    println!("{}", history_table(&versions));
    Ok(())
}

fn history_table(versions: &[IdentitySnapshot]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Version").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Created").fg(Color::White),
        Cell::new("Reflection").fg(Color::White),
    ]);

    for v in versions {
        table.add_row(vec![
            v.version.to_string(),
            v.kernel.name.clone(),
            v.approval_status.to_string(),
            v.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            v.reflection.clone(),
        ]);
    }
    table
}

async fn append(
    state: &AppState,
    user: &str,
    kernel_path: &Path,
    status: ApprovalStatus,
    reflection: String,
    json: bool,
) -> Result<()> {
    let kernel = read_kernel(kernel_path).await?;
    let repo = state.orchestrator.identity_repo();
    let latest = repo.history(user).await?.pop();
    let snapshot = next_version(latest.as_ref(), kernel, status, reflection, Utc::now());
    repo.append(user, &snapshot).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!(
            "  {} Appended {} v{} for '{}'",
            style("✓").green(),
            style(&snapshot.kernel.name).cyan(),
            snapshot.version,
            user
        );
    }
    Ok(())
}

async fn read_kernel(path: &Path) -> Result<IdentityKernel> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let kernel: IdentityKernel =
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    anyhow::ensure!(!kernel.name.trim().is_empty(), "identity name must not be empty");
    Ok(kernel)
}
