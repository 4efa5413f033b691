//! Turn commands: a single `turn` and the interactive `chat` loop.

use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use kindred_types::coherence::Severity;
use kindred_types::turn::{TurnRequest, TurnResponse};

use super::TurnTarget;
use crate::state::AppState;

/// Run one turn and print the response.
pub async fn run_turn(state: &AppState, target: &TurnTarget, message: &str, json: bool) -> Result<()> {
    let session_id = target.session_id();
    let request = TurnRequest::new(&target.user, &session_id, message);
    let response = state.orchestrator.orchestrate(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!();
        println!("{}", response.text);
        println!();
        println!("{}", render_turn_footer(&response));
    }
    Ok(())
}

/// Interactive loop: one turn per input line within a single session.
pub async fn chat(state: &AppState, target: &TurnTarget, json: bool) -> Result<()> {
    let session_id = target.session_id();
    let identity = state.orchestrator.current_identity(&target.user).await?;

    if !json {
        println!();
        println!(
            "  {} Talking to {} (v{}), session {}",
            style("●").green(),
            style(&identity.kernel.name).cyan().bold(),
            identity.version,
            style(&session_id).dim()
        );
        println!("  {}", style("Empty line or /quit to exit").dim());
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        if !json {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() || input == "/quit" {
            break;
        }

        let request = TurnRequest::new(&target.user, &session_id, input);
        match state.orchestrator.orchestrate(request).await {
            Ok(response) if json => println!("{}", serde_json::to_string(&response)?),
            Ok(response) => {
                println!();
                println!("{}", response.text);
                println!("{}", render_turn_footer(&response));
                println!();
            }
            // A failed turn leaves the session usable.
            Err(e) => eprintln!("  {} {e}", style("✗").red()),
        }
    }

    state.orchestrator.end_session(&session_id);
    Ok(())
}

/// One dim line of turn diagnostics.
pub fn render_turn_footer(response: &TurnResponse) -> String {
    let meta = &response.metadata;
    let mut parts = vec![
        format!("v{}", meta.identity_version),
        meta.model_used.clone(),
        format!("{} tokens", meta.token_usage.total_tokens),
        format!("budget {:.0}%", meta.budget.utilization * 100.0),
    ];
    if meta.regenerated {
        parts.push("regenerated".to_string());
    }
    if meta.contradiction_severity != Severity::None {
        parts.push(format!("{} contradiction(s)", meta.contradiction_count));
    }
    if meta.drift_detected {
        parts.push(format!("drift: {}", meta.drift_reason));
    }
    if !meta.invariants.passed {
        parts.push(format!("{} invariant violation(s)", meta.invariants.violations.len()));
    }
    format!("  {}", style(format!("[{}]", parts.join(" · "))).dim())
}

#[cfg(test)]
mod tests {
    use kindred_types::coherence::InvariantReport;
    use kindred_types::memory::TokenUsage;
    use kindred_types::turn::{BudgetReport, TurnMetadata};
    use uuid::Uuid;

    use super::*;

    fn metadata() -> TurnMetadata {
        TurnMetadata {
            drift_detected: false,
            drift_reason: String::new(),
            mood_drift: 0.0,
            identity_drift: 0.0,
            token_usage: TokenUsage::default(),
            budget: BudgetReport::default(),
            invariants: InvariantReport::from_violations(Vec::new()),
            contradiction_severity: Severity::None,
            contradiction_count: 0,
            regenerated: false,
            degraded_sections: Vec::new(),
            forced_sections: Vec::new(),
            identity_version: 0,
            model_used: String::new(),
            stages: Vec::new(),
        }
    }

    fn response(metadata: TurnMetadata) -> TurnResponse {
        TurnResponse {
            text: "hi".to_string(),
            turn_id: Uuid::now_v7(),
            metadata,
        }
    }

    #[test]
    fn footer_shows_usage_and_model() {
        let metadata = TurnMetadata {
            identity_version: 3,
            model_used: "gpt-4o-mini".to_string(),
            token_usage: TokenUsage::new(90, 10),
            ..metadata()
        };
        let footer = render_turn_footer(&response(metadata));
        assert!(footer.contains("v3"));
        assert!(footer.contains("gpt-4o-mini"));
        assert!(footer.contains("100 tokens"));
        assert!(!footer.contains("regenerated"));
    }

    #[test]
    fn footer_flags_regeneration_and_drift() {
        let metadata = TurnMetadata {
            regenerated: true,
            drift_detected: true,
            drift_reason: "Significant emotional shift detected over history".to_string(),
            ..metadata()
        };
        let footer = render_turn_footer(&response(metadata));
        assert!(footer.contains("regenerated"));
        assert!(footer.contains("emotional shift"));
    }
}
