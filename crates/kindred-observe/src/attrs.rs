//! Span and event attribute names for turn instrumentation.
//!
//! Model-call attributes follow the OpenTelemetry GenAI semantic
//! conventions; engine-specific ones use the `kindred.` prefix.

/// The model that served the call.
pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

/// Total tokens attributed to the turn (prompt plus completion).
pub const GEN_AI_USAGE_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";

/// Identifier of the turn.
pub const KINDRED_TURN_ID: &str = "kindred.turn.id";

/// Wall-clock latency of the turn in milliseconds.
pub const KINDRED_TURN_LATENCY_MS: &str = "kindred.turn.latency_ms";

/// Contradictions reported for the final response.
pub const KINDRED_TURN_CONTRADICTIONS: &str = "kindred.turn.contradictions";
