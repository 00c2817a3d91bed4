//! Metrics sink boundary.
//!
//! Sessions and the model cache never touch counters directly; all
//! instrumentation flows through MetricsEvent and MetricsSink.

///
/// StatementKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Raw,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ModelDerived {
        entity_path: &'static str,
    },
    StatementStart {
        kind: StatementKind,
        entity_path: &'static str,
    },
    StatementFinish {
        kind: StatementKind,
        entity_path: &'static str,
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}
