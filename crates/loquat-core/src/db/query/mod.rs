//! Filter compilation and the fluent query surface.

mod filter;
mod operator;
mod parse;
mod statement;


pub use filter::{Filter, RenderFn, ancestor_sql, key_pair_sql};
pub use operator::{Compatibility, Operator};
pub use parse::parse_filters;
pub use statement::{LockMode, Statement};

use crate::{
    KEY_TAG, PRIMARY_KEY_COLUMN, RESERVED_COLUMNS, SOFT_DELETE_COLUMN,
    config::Backend,
    db::{
        Arg,
        cursor::{Page, PageRequest},
        decode::decode_rows,
        executor::{Executor, Row},
        qualified_table, quote_ident,
        session::Session,
    },
    error::{Error, ErrorOrigin},
    key::{Key, KeyError},
    model::EntityModel,
    obs::StatementKind,
    traits::Entity,
    value::{CodecError, Value},
};
use std::{marker::PhantomData, sync::Arc};
use thiserror::Error as ThisError;

///
/// FilterError
///

#[derive(Debug, ThisError)]
pub enum FilterError {
    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("operator '{operator}' is not supported by the {backend} backend")]
    IncompatibleOperator {
        operator: &'static str,
        backend: Backend,
    },

    #[error("'{field}' cannot be compared to null with '{operator}'")]
    NullComparison {
        field: String,
        operator: &'static str,
    },

    #[error("{entity} has no column '{field}'")]
    UnknownField { entity: &'static str, field: String },

    #[error("key filters do not support '{operator}'")]
    KeyOperator { operator: &'static str },

    #[error("ancestor key '{key}' is incomplete")]
    IncompleteKey { key: String },

    #[error("invalid filter document: {0}")]
    InvalidDocument(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

// Purpose
// reads get the implicit soft-delete filter, mutations do not
#[derive(Clone, Copy, Eq, PartialEq)]
enum Purpose {
    Read,
    Mutation,
}

///
/// Query
///
/// Session-bound, fluent query over one entity type. Builder calls never
/// fail; the first error is kept and returned by the terminal operation.
///

pub struct Query<'a, E: Entity, X: Executor> {
    session: &'a Session<X>,
    model: Option<Arc<EntityModel>>,
    table: Option<String>,
    unions: Vec<String>,
    filters: Vec<Filter>,
    orders: Vec<String>,
    ancestors: Vec<Key>,
    limit: Option<u32>,
    offset: u64,
    with_trashed: bool,
    lock: Option<LockMode>,
    error: Option<Error>,
    _marker: PhantomData<E>,
}

impl<'a, E: Entity, X: Executor> Query<'a, E, X> {
    pub(crate) fn new(session: &'a Session<X>) -> Self {
        let (model, error) = match session.model::<E>() {
            Ok(model) => (Some(model), None),
            Err(err) => (None, Some(err)),
        };

        Self {
            session,
            model,
            table: None,
            unions: Vec::new(),
            filters: Vec::new(),
            orders: Vec::new(),
            ancestors: Vec::new(),
            limit: None,
            offset: 0,
            with_trashed: false,
            lock: None,
            error,
            _marker: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Intent builders
    // ------------------------------------------------------------------

    /// Add a predicate `field <operator> value`, AND-ed with the others.
    ///
    /// `operator` is one of `=`, `!=`, `>`, `>=`, `<`, `<=`, `like`,
    /// `not like`, `in`, `not in`.
    #[must_use]
    pub fn filter(self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        match Operator::parse(operator) {
            Ok(operator) => self.filter_op(field, operator, value),
            Err(err) => self.fail(err),
        }
    }

    /// Alias of [`Query::filter`].
    #[must_use]
    pub fn where_(self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.filter(field, operator, value)
    }

    #[must_use]
    pub fn filter_op(mut self, field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        if let Err(err) = self.check_filter(field, operator) {
            return self.fail(err);
        }
        self.filters.extend(Filter::expand(field, operator, value));
        self
    }

    /// Add pre-built filters.
    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        for filter in filters {
            if let Err(err) = self.check_filter(filter.field(), filter.operator()) {
                return self.fail(err);
            }
            self.filters.push(filter);
        }
        self
    }

    /// Add the filters of a JSON filter document.
    #[must_use]
    pub fn parse_filters(self, document: &str) -> Self {
        let Some(model) = self.model.clone() else {
            return self;
        };

        match parse_filters(&model, self.session.config().backend, document) {
            Ok(filters) => self.filters(filters),
            Err(err) => self.fail(err),
        }
    }

    /// Append a sort column; a leading `-` sorts descending.
    #[must_use]
    pub fn order(mut self, field: &str) -> Self {
        let (column, direction) = match field.strip_prefix('-') {
            Some(column) => (column, "DESC"),
            None => (field, "ASC"),
        };
        if let Err(err) = self.check_field(column) {
            return self.fail(err);
        }
        let column = if column == KEY_TAG {
            PRIMARY_KEY_COLUMN
        } else {
            column
        };
        self.orders
            .push(format!("{} {direction}", quote_ident(column)));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Restrict to descendants of `key`.
    #[must_use]
    pub fn ancestor(mut self, key: Key) -> Self {
        if !key.is_complete() {
            return self.fail(FilterError::IncompleteKey {
                key: key.to_string(),
            });
        }
        self.ancestors.push(key);
        self
    }

    /// Include soft-deleted rows.
    #[must_use]
    pub const fn with_trashed(mut self) -> Self {
        self.with_trashed = true;
        self
    }

    /// Read from `table` instead of the entity's own table.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Read `table` as well, through `UNION ALL`.
    #[must_use]
    pub fn union(mut self, table: impl Into<String>) -> Self {
        self.unions.push(table.into());
        self
    }

    /// `LOCK IN SHARE MODE`; dropped outside a transaction.
    #[must_use]
    pub const fn lock_for_share(mut self) -> Self {
        self.lock = Some(LockMode::Share);
        self
    }

    /// `FOR UPDATE`; dropped outside a transaction.
    #[must_use]
    pub const fn lock_for_update(mut self) -> Self {
        self.lock = Some(LockMode::Update);
        self
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    /// Compile the read statement without executing it.
    pub fn compile(&self) -> Result<Statement, Error> {
        self.compile_for(Purpose::Read)
    }

    fn compile_for(&self, purpose: Purpose) -> Result<Statement, Error> {
        if let Some(err) = &self.error {
            return Err(Error::new(err.class, err.origin, err.message.clone()));
        }
        let model = self.model()?;
        let schema = &self.session.config().schema;

        let tables = std::iter::once(self.primary_table(model))
            .chain(self.unions.iter().map(String::as_str))
            .map(|table| qualified_table(schema, table))
            .collect();

        let mut filters = self
            .filters
            .iter()
            .map(Filter::to_sql)
            .collect::<Result<Vec<_>, _>>()?;
        for key in &self.ancestors {
            filters.push(ancestor_sql(key)?);
        }
        if purpose == Purpose::Read && model.soft_delete.is_some() && !self.with_trashed {
            filters.push(Filter::new(SOFT_DELETE_COLUMN, Operator::Equal, Value::Null).to_sql()?);
        }

        let lock = match self.lock {
            Some(_) if !self.session.in_transaction() => {
                tracing::trace!(
                    target: "loquat::sql",
                    entity = E::PATH,
                    "lock clause dropped outside a transaction"
                );
                None
            }
            lock => lock,
        };

        Ok(Statement {
            tables,
            filters,
            orders: self.orders.clone(),
            limit: self.limit.map(u64::from),
            offset: self.offset,
            lock,
        })
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Every matching record.
    pub fn get(&self) -> Result<Vec<E>, Error> {
        self.session.ensure_relational("get")?;
        let stmt = self.compile()?;

        self.load(&stmt)
    }

    /// The first matching record, if any.
    pub fn first(&self) -> Result<Option<E>, Error> {
        self.session.ensure_relational("first")?;
        let mut stmt = self.compile()?;
        stmt.limit = Some(1);

        Ok(self.load(&stmt)?.into_iter().next())
    }

    /// The record stored under `key`; `NotFound` when there is none.
    pub fn find(&self, key: &Key) -> Result<E, Error> {
        self.session.ensure_relational("find")?;
        let mut stmt = self.compile()?;
        stmt.filters.insert(0, key_pair_sql(key)?);
        stmt.limit = Some(1);
        stmt.offset = 0;

        self.load(&stmt)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(E::NAME, key))
    }

    /// One page of records, fetched one row past the page size to detect a
    /// following page.
    pub fn paginate(&self, request: &PageRequest) -> Result<Page<E>, Error> {
        self.session.ensure_relational("paginate")?;
        let limit = self.session.config().page_size(request.limit);
        let offset = request.cursor.offset();

        let mut stmt = self.compile()?;
        stmt.orders
            .push(format!("{} ASC", quote_ident(PRIMARY_KEY_COLUMN)));
        stmt.limit = Some(u64::from(limit) + 1);
        stmt.offset = offset;

        Ok(Page::from_overfetch(self.load(&stmt)?, offset, limit))
    }

    pub fn count(&self) -> Result<u64, Error> {
        self.session.ensure_relational("count")?;
        let stmt = self.compile()?;
        let rows = self.session.run_query(
            StatementKind::Select,
            E::PATH,
            &stmt.count_sql(),
            &[],
        )?;

        let text = scalar(&rows).unwrap_or("0");
        text.trim()
            .parse()
            .map_err(|_| Error::encoding(ErrorOrigin::Statement, format!("invalid count '{text}'")))
    }

    /// Sum of a numeric column over the matching rows; zero when none match.
    pub fn sum(&self, field: &str) -> Result<f64, Error> {
        self.session.ensure_relational("sum")?;
        if field == KEY_TAG {
            return Err(Error::invalid_input(
                ErrorOrigin::Statement,
                "sum over the key is not numeric",
            ));
        }
        self.check_field(field)?;
        let stmt = self.compile()?;
        let rows = self.session.run_query(
            StatementKind::Select,
            E::PATH,
            &stmt.sum_sql(field),
            &[],
        )?;

        let text = scalar(&rows).unwrap_or("0");
        text.trim()
            .parse()
            .map_err(|_| Error::encoding(ErrorOrigin::Statement, format!("invalid sum '{text}'")))
    }

    /// Set columns on every matching row. Refuses to run without a filter.
    pub fn update(&self, values: &[(&str, Value)]) -> Result<u64, Error> {
        self.session.ensure_relational("update")?;
        if values.is_empty() {
            return Err(Error::invalid_input(
                ErrorOrigin::Statement,
                "update without values",
            ));
        }
        let stmt = self.compile_mutation("update")?;
        let model = self.model()?;

        let mut assignments = Vec::with_capacity(values.len());
        let mut args: Vec<Arg> = Vec::with_capacity(values.len());
        for (name, value) in values {
            let field = model
                .stored_fields()
                .find(|f| f.name == *name)
                .ok_or_else(|| FilterError::UnknownField {
                    entity: model.name,
                    field: (*name).to_string(),
                })?;
            assignments.push(format!("{} = ?", quote_ident(&field.name)));
            args.push(field.storage_text(value)?);
        }

        self.session.run_execute(
            StatementKind::Update,
            E::PATH,
            &stmt.update_sql(&assignments),
            &args,
        )
    }

    /// Delete every matching row. Refuses to run without a filter.
    pub fn delete(&self) -> Result<u64, Error> {
        self.session.ensure_relational("delete")?;
        let stmt = self.compile_mutation("delete")?;

        self.session
            .run_execute(StatementKind::Delete, E::PATH, &stmt.delete_sql(), &[])
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn fail(mut self, err: impl Into<Error>) -> Self {
        if self.error.is_none() {
            self.error = Some(err.into());
        }
        self
    }

    fn model(&self) -> Result<&EntityModel, Error> {
        self.model.as_deref().ok_or_else(|| {
            Error::configuration(ErrorOrigin::Model, format!("no model for {}", E::PATH))
        })
    }

    fn primary_table<'m>(&'m self, model: &'m EntityModel) -> &'m str {
        self.table.as_deref().unwrap_or(model.name)
    }

    fn check_filter(&self, field: &str, operator: Operator) -> Result<(), FilterError> {
        operator.check(self.session.config().backend)?;
        self.check_field(field)
    }

    // check_field
    // the key tag, reserved columns and stored columns are addressable
    fn check_field(&self, field: &str) -> Result<(), FilterError> {
        let Some(model) = &self.model else {
            return Ok(());
        };
        if field == KEY_TAG
            || RESERVED_COLUMNS.contains(&field)
            || model.stored_fields().any(|f| f.name == field)
        {
            return Ok(());
        }

        Err(FilterError::UnknownField {
            entity: model.name,
            field: field.to_string(),
        })
    }

    fn compile_mutation(&self, action: &str) -> Result<Statement, Error> {
        if !self.unions.is_empty() {
            return Err(Error::invalid_input(
                ErrorOrigin::Statement,
                format!("{action} cannot target a union"),
            ));
        }
        if self.offset > 0 {
            return Err(Error::invalid_input(
                ErrorOrigin::Statement,
                format!("{action} cannot skip rows with an offset"),
            ));
        }
        let mut stmt = self.compile_for(Purpose::Mutation)?;
        if stmt.filters.is_empty() {
            return Err(Error::scope_guard(format!(
                "{action} on {} without filters",
                E::NAME
            )));
        }
        stmt.lock = None;

        Ok(stmt)
    }

    fn load(&self, stmt: &Statement) -> Result<Vec<E>, Error> {
        let model = self.model()?;
        let rows = self
            .session
            .run_query(StatementKind::Select, E::PATH, &stmt.select_sql(), &[])?;

        decode_rows::<E>(model, self.primary_table(model), &rows)
    }
}

// scalar
// first column of the first row, when present and not null
fn scalar(rows: &[Row]) -> Option<&str> {
    rows.first()?
        .columns()
        .next()
        .and_then(|(_, bytes)| bytes)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
}
