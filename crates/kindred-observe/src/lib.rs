//! Observability for Kindred: subscriber setup, attribute names and a
//! tracing-backed metrics sink.

pub mod attrs;
pub mod metrics_sink;
pub mod tracing_setup;

pub use metrics_sink::TracingMetricsSink;
pub use tracing_setup::{init_tracing, shutdown_tracing};
