//! Relational session: derives models through its cache, compiles
//! statements and hands them to the executor.

mod schema;
mod write;

#[cfg(test)]
mod tests;

use crate::{
    config::{Backend, Config},
    db::{
        executor::{Arg, Executor, Row},
        query::{Filter, Query, parse_filters},
    },
    error::{Error, ErrorOrigin},
    key::Key,
    model::{EntityModel, ModelCache},
    obs::{MetricsEvent, MetricsSink, StatementKind},
    traits::Entity,
};
use std::sync::Arc;

// entity label of statements not tied to one entity
const RAW_ENTITY: &str = "raw";

///
/// Session
///
/// Entry point of the query surface. Cheap to share; a transaction runs on
/// a copy of the session flagged as transactional.
///

pub struct Session<X: Executor> {
    executor: Arc<X>,
    models: Arc<ModelCache>,
    config: Config,
    sink: Option<Arc<dyn MetricsSink>>,
    transaction: bool,
}

impl<X: Executor> Session<X> {
    #[must_use]
    pub fn new(executor: X, config: Config) -> Self {
        Self::shared(Arc::new(executor), config)
    }

    #[must_use]
    pub fn shared(executor: Arc<X>, config: Config) -> Self {
        Self {
            executor,
            models: Arc::new(ModelCache::new()),
            config,
            sink: None,
            transaction: false,
        }
    }

    /// Share a model cache with other sessions.
    #[must_use]
    pub fn with_models(mut self, models: Arc<ModelCache>) -> Self {
        self.models = models;
        self
    }

    /// Route statement events to `sink`.
    #[must_use]
    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn executor(&self) -> &X {
        &self.executor
    }

    #[must_use]
    pub fn models(&self) -> &ModelCache {
        &self.models
    }

    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.transaction
    }

    /// Cached model of `E`.
    pub fn model<E: Entity>(&self) -> Result<Arc<EntityModel>, Error> {
        self.models.model_with_sink::<E>(self.sink.as_deref())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[must_use]
    pub fn query<E: Entity>(&self) -> Query<'_, E, X> {
        Query::new(self)
    }

    /// Load the record stored under `key`.
    pub fn find<E: Entity>(&self, key: &Key) -> Result<E, Error> {
        self.query::<E>().find(key)
    }

    /// Parse a JSON filter document against `E`'s columns.
    pub fn parse_filters<E: Entity>(&self, document: &str) -> Result<Vec<Filter>, Error> {
        let model = self.model::<E>()?;

        Ok(parse_filters(&model, self.config.backend, document)?)
    }

    /// Run a raw query.
    pub fn statement(&self, sql: &str, args: &[Arg]) -> Result<Vec<Row>, Error> {
        self.ensure_relational("statement")?;

        self.run_query(StatementKind::Raw, RAW_ENTITY, sql, args)
    }

    /// Run a raw statement that returns no rows.
    pub fn execute(&self, sql: &str, args: &[Arg]) -> Result<u64, Error> {
        self.ensure_relational("execute")?;

        self.run_execute(StatementKind::Raw, RAW_ENTITY, sql, args)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Run `f` inside a transaction: committed when it returns `Ok`, rolled
    /// back otherwise. Lock clauses only take effect in here. A session that
    /// is already transactional runs `f` in the outer transaction; only the
    /// outermost call commits or rolls back.
    pub fn run_in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.ensure_relational("transaction")?;
        if self.transaction {
            return f(self);
        }

        self.executor.begin().map_err(Error::execution)?;
        let tx = Self {
            executor: Arc::clone(&self.executor),
            models: Arc::clone(&self.models),
            config: self.config.clone(),
            sink: self.sink.clone(),
            transaction: true,
        };

        match f(&tx) {
            Ok(value) => {
                self.executor.commit().map_err(Error::execution)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.executor.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    pub(crate) fn ensure_relational(&self, action: &str) -> Result<(), Error> {
        match self.config.backend {
            Backend::Relational => Ok(()),
            Backend::Hierarchical => Err(Error::unsupported(
                ErrorOrigin::Session,
                format!("{action} needs the relational backend"),
            )),
        }
    }

    pub(crate) fn run_query(
        &self,
        kind: StatementKind,
        entity_path: &'static str,
        sql: &str,
        args: &[Arg],
    ) -> Result<Vec<Row>, Error> {
        self.trace(sql, args);
        self.emit(MetricsEvent::StatementStart { kind, entity_path });

        let rows = self.executor.query(sql, args).map_err(Error::execution)?;

        self.emit(MetricsEvent::StatementFinish {
            kind,
            entity_path,
            rows: rows.len() as u64,
        });

        Ok(rows)
    }

    pub(crate) fn run_execute(
        &self,
        kind: StatementKind,
        entity_path: &'static str,
        sql: &str,
        args: &[Arg],
    ) -> Result<u64, Error> {
        self.trace(sql, args);
        self.emit(MetricsEvent::StatementStart { kind, entity_path });

        let affected = self.executor.execute(sql, args).map_err(Error::execution)?;

        self.emit(MetricsEvent::StatementFinish {
            kind,
            entity_path,
            rows: affected,
        });

        Ok(affected)
    }

    fn trace(&self, sql: &str, args: &[Arg]) {
        if self.config.debug {
            tracing::debug!(target: "loquat::sql", ?args, "{sql}");
        }
    }

    fn emit(&self, event: MetricsEvent) {
        if let Some(sink) = &self.sink {
            sink.record(event);
        }
    }
}
