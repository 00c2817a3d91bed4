use crate::obs::sink::{MetricsEvent, MetricsSink, StatementKind};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

///
/// EventReport
/// Point-in-time copy of the counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub models_derived: u64,
    pub select_calls: u64,
    pub insert_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub ddl_calls: u64,
    pub raw_calls: u64,
    pub rows_loaded: u64,
    pub rows_affected: u64,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub statements: u64,
    pub rows: u64,
}

///
/// StatementMetrics
/// In-memory sink counting statements and rows per entity.
///

#[derive(Debug, Default)]
pub struct StatementMetrics {
    state: Mutex<EventReport>,
}

impl StatementMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> EventReport {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = EventReport::default();
    }
}

impl MetricsSink for StatementMetrics {
    fn record(&self, event: MetricsEvent) {
        let mut m = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            MetricsEvent::ModelDerived { .. } => {
                m.models_derived = m.models_derived.saturating_add(1);
            }
            MetricsEvent::StatementStart { kind, entity_path } => {
                let calls = match kind {
                    StatementKind::Select => &mut m.select_calls,
                    StatementKind::Insert => &mut m.insert_calls,
                    StatementKind::Update => &mut m.update_calls,
                    StatementKind::Delete => &mut m.delete_calls,
                    StatementKind::Ddl => &mut m.ddl_calls,
                    StatementKind::Raw => &mut m.raw_calls,
                };
                *calls = calls.saturating_add(1);

                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.statements = entry.statements.saturating_add(1);
            }
            MetricsEvent::StatementFinish {
                kind,
                entity_path,
                rows,
            } => {
                if kind == StatementKind::Select {
                    m.rows_loaded = m.rows_loaded.saturating_add(rows);
                } else {
                    m.rows_affected = m.rows_affected.saturating_add(rows);
                }

                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.rows = entry.rows.saturating_add(rows);
            }
        }
    }
}
