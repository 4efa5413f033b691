//! CLI command definitions and dispatch for the `kindred` binary.
//!
//! Uses clap derive macros for argument parsing. Commands follow a
//! noun-verb pattern (e.g., `kindred identity show`, `kindred facts search`).

pub mod consolidate;
pub mod identity;
pub mod memory;
pub mod status;
pub mod turn;

use clap::{Parser, Subcommand};

/// Run a companion agent with a stable identity, mood and memory.
#[derive(Parser)]
#[command(name = "kindred", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "KINDRED_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Map verbosity flags to a tracing filter directive.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,kindred=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one conversational turn and print the response.
    Turn {
        #[command(flatten)]
        target: TurnTarget,

        /// The user message.
        message: String,
    },

    /// Interactive conversation on stdin (empty line or `/quit` exits).
    Chat {
        #[command(flatten)]
        target: TurnTarget,
    },

    /// Consolidate aged episodes into semantic facts.
    Consolidate {
        /// Only these users (repeatable). Defaults to every user.
        #[arg(long = "user")]
        users: Vec<String>,
    },

    /// Versioned identity management (show, history, append).
    Identity {
        #[command(subcommand)]
        action: identity::IdentityCommand,
    },

    /// Semantic fact store (search, decay).
    Facts {
        #[command(subcommand)]
        action: memory::FactsCommand,
    },

    /// Episodic store maintenance (expire).
    Episodes {
        #[command(subcommand)]
        action: memory::EpisodesCommand,
    },

    /// System status dashboard.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

/// Who is talking and in which conversation.
#[derive(clap::Args, Debug, Clone)]
pub struct TurnTarget {
    /// User id the turn belongs to.
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Session id. Defaults to a fresh one per invocation.
    #[arg(short, long)]
    pub session: Option<String>,
}

impl TurnTarget {
    pub fn session_id(&self) -> String {
        self.session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_maps_to_filter() {
        let cli = Cli::parse_from(["kindred", "status"]);
        assert_eq!(cli.log_filter(), "warn");
        let cli = Cli::parse_from(["kindred", "-v", "status"]);
        assert_eq!(cli.log_filter(), "info,kindred=debug");
        let cli = Cli::parse_from(["kindred", "--quiet", "status"]);
        assert_eq!(cli.log_filter(), "error");
    }

    #[test]
    fn turn_parses_target_and_message() {
        let cli = Cli::parse_from(["kindred", "turn", "-u", "ada", "-s", "s1", "hello"]);
        match cli.command {
            Commands::Turn { target, message } => {
                assert_eq!(target.user, "ada");
                assert_eq!(target.session_id(), "s1");
                assert_eq!(message, "hello");
            }
            _ => panic!("expected turn"),
        }
    }

    #[test]
    fn consolidate_collects_users() {
        let cli = Cli::parse_from(["kindred", "consolidate", "--user", "a", "--user", "b"]);
        match cli.command {
            Commands::Consolidate { users } => assert_eq!(users, vec!["a", "b"]),
            _ => panic!("expected consolidate"),
        }
    }
}
