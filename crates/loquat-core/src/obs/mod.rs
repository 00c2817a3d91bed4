//! Observability: statement counters and the sink abstraction.
//!
//! Statement text itself is logged through `tracing` under the
//! `loquat::sql` target; this module only carries structured events.

pub mod metrics;
pub mod sink;

// re-exports
pub use metrics::{EventReport, StatementMetrics};
pub use sink::{MetricsEvent, MetricsSink, StatementKind};
