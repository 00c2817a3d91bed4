//! Additive schema migration.
//!
//! The target column list of an entity is diffed against the live column
//! catalog. A missing table yields one `CREATE TABLE`; an existing one
//! yields a single `ALTER TABLE` of ADD, MODIFY and DROP clauses, or
//! nothing when the catalog already matches. Dropped columns are gone for
//! good: nothing asks for confirmation.

mod catalog;


pub use catalog::CatalogColumn;

use crate::{
    KEY_COLUMN, PARENT_COLUMN, PRIMARY_KEY_COLUMN,
    db::quote_ident,
    model::{EntityModel, FieldSchema, ID_LENGTH, KEY_LENGTH, LATIN2, UTF8},
};
use std::collections::HashMap;
use thiserror::Error as ThisError;

///
/// MigrationError
///

#[derive(Debug, ThisError)]
pub enum MigrationError {
    #[error("catalog row has no {column} column")]
    MissingColumn { column: &'static str },

    #[error("catalog column {column} holds invalid text '{text}'")]
    InvalidText { column: &'static str, text: String },
}

///
/// TargetColumn
///

#[derive(Clone, Debug, PartialEq)]
pub struct TargetColumn {
    pub name: String,
    pub schema: FieldSchema,
}

impl TargetColumn {
    #[must_use]
    pub fn sql(&self) -> String {
        self.schema.column_sql(&self.name)
    }
}

///
/// MigrationPlan
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MigrationPlan {
    Create(String),
    Alter(String),
    NoOp,
}

impl MigrationPlan {
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Create(sql) | Self::Alter(sql) => Some(sql),
            Self::NoOp => None,
        }
    }

    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

/// Columns of the entity's table in storage order: the three key columns,
/// the entity's fields, then the soft-delete column.
#[must_use]
pub fn target_columns(model: &EntityModel) -> Vec<TargetColumn> {
    let key_column = |name: &str, length: usize| TargetColumn {
        name: name.to_string(),
        schema: FieldSchema::column(format!("varchar({length})"), None, true).charset(LATIN2),
    };

    let mut columns = vec![
        key_column(PRIMARY_KEY_COLUMN, KEY_LENGTH),
        key_column(KEY_COLUMN, ID_LENGTH),
        key_column(PARENT_COLUMN, KEY_LENGTH),
    ];
    columns.extend(model.stored_fields().filter_map(|field| {
        field.schema.clone().map(|schema| TargetColumn {
            name: field.name.clone(),
            schema,
        })
    }));

    columns
}

/// Plan the statement that brings `table` (already qualified) to `target`.
/// An empty catalog means the table does not exist.
#[must_use]
pub fn plan(table: &str, target: &[TargetColumn], catalog: &[CatalogColumn]) -> MigrationPlan {
    if catalog.is_empty() {
        return MigrationPlan::Create(create_sql(table, target));
    }

    let live: HashMap<&str, &CatalogColumn> =
        catalog.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut adds = Vec::new();
    let mut modifies = Vec::new();
    for (i, column) in target.iter().enumerate() {
        let position = i.checked_sub(1).map_or_else(
            || "FIRST".to_string(),
            |prev| format!("AFTER {}", quote_ident(&target[prev].name)),
        );
        match live.get(column.name.as_str()) {
            None => adds.push(format!("ADD {} {position}", column.sql())),
            Some(existing) if !existing.matches(&column.schema) => {
                modifies.push(format!("MODIFY {} {position}", column.sql()));
            }
            Some(_) => {}
        }
    }

    let mut deprecated = catalog
        .iter()
        .filter(|c| !target.iter().any(|t| t.name == c.name))
        .collect::<Vec<_>>();
    deprecated.sort_by_key(|c| c.position);
    let drops = deprecated
        .into_iter()
        .map(|c| format!("DROP {}", quote_ident(&c.name)));

    let clauses = adds
        .into_iter()
        .chain(modifies)
        .chain(drops)
        .collect::<Vec<_>>();
    if clauses.is_empty() {
        return MigrationPlan::NoOp;
    }

    MigrationPlan::Alter(format!("ALTER TABLE {table} {};", clauses.join(",")))
}

fn create_sql(table: &str, target: &[TargetColumn]) -> String {
    let mut defs = target.iter().map(TargetColumn::sql).collect::<Vec<_>>();
    defs.push(format!(
        "CONSTRAINT {} UNIQUE ({}, {})",
        quote_ident(PRIMARY_KEY_COLUMN),
        quote_ident(PARENT_COLUMN),
        quote_ident(KEY_COLUMN)
    ));

    format!(
        "CREATE TABLE {table} ({}) CHARACTER SET {} COLLATE {};",
        defs.join(","),
        quote_ident(UTF8.encoding),
        quote_ident(UTF8.collation)
    )
}
