//! Relational storage: filter and statement compilation, pagination, schema
//! migration and the session that hands compiled statements to an executor.

pub mod cursor;
pub(crate) mod decode;
pub mod executor;
pub mod migrate;
pub mod query;
pub mod session;

pub use cursor::{Cursor, CursorError, Page, PageRequest};
pub use executor::{Arg, Executor, ExecutorError, Row};
pub use migrate::{CatalogColumn, MigrationError, MigrationPlan};
pub use query::{Filter, FilterError, LockMode, Operator, Query, Statement};
pub use session::Session;

/// Backtick-quote an identifier.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `schema`.`table`, or just `table` when no schema is configured.
#[must_use]
pub fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        quote_ident(table)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }
}
