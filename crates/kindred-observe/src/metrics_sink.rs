//! A [`MetricsSink`] that emits one structured event per turn.
//!
//! With OpenTelemetry enabled the event is attached to the active turn span
//! and exported with it. Field names match the constants in [`crate::attrs`].

use kindred_core::metrics::{MetricsError, MetricsSink};
use kindred_types::turn::TurnMetrics;

/// Emits turn metrics as `tracing` events under the `kindred::metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(&self, metrics: &TurnMetrics) -> Result<(), MetricsError> {
        tracing::info!(
            target: "kindred::metrics",
            {
                kindred.turn.id = %metrics.turn_id,
                kindred.turn.latency_ms = metrics.latency_ms,
                gen_ai.usage.total_tokens = metrics.tokens_used,
                kindred.turn.contradictions = metrics.contradiction_count,
                gen_ai.response.model = metrics.model_used.as_str(),
            },
            "turn metrics"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::Registry;
    use uuid::Uuid;

    use super::*;
    use crate::attrs::{
        GEN_AI_RESPONSE_MODEL, GEN_AI_USAGE_TOTAL_TOKENS, KINDRED_TURN_CONTRADICTIONS,
        KINDRED_TURN_ID, KINDRED_TURN_LATENCY_MS,
    };

    #[derive(Clone, Default)]
    struct FieldCapture {
        fields: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Visit for FieldCapture {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.fields
                .lock()
                .unwrap()
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }

    impl<S: Subscriber> Layer<S> for FieldCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() == "kindred::metrics" {
                let mut visitor = self.clone();
                event.record(&mut visitor);
            }
        }
    }

    fn metrics() -> TurnMetrics {
        TurnMetrics {
            turn_id: Uuid::now_v7(),
            latency_ms: 42,
            tokens_used: 900,
            contradiction_count: 1,
            model_used: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn record_never_fails() {
        assert!(TracingMetricsSink.record(&metrics()).is_ok());
    }

    #[test]
    fn event_carries_attribute_names() {
        let capture = FieldCapture::default();
        let subscriber = Registry::default().with(capture.clone());
        let metrics = metrics();

        tracing::subscriber::with_default(subscriber, || {
            TracingMetricsSink.record(&metrics).unwrap();
        });

        let fields = capture.fields.lock().unwrap().clone();
        let value_of = |name: &str| {
            fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(value_of(KINDRED_TURN_ID), Some(metrics.turn_id.to_string()));
        assert_eq!(value_of(KINDRED_TURN_LATENCY_MS).as_deref(), Some("42"));
        assert_eq!(value_of(GEN_AI_USAGE_TOTAL_TOKENS).as_deref(), Some("900"));
        assert_eq!(value_of(KINDRED_TURN_CONTRADICTIONS).as_deref(), Some("1"));
        assert_eq!(
            value_of(GEN_AI_RESPONSE_MODEL).as_deref(),
            Some("\"gpt-4o-mini\"")
        );
    }
}
