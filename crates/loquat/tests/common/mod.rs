#![allow(dead_code)]

use chrono::{DateTime, Utc};
use loquat::{
    Config, Entity, Error, Record, Session,
    db::{Arg, Executor, ExecutorError, Row},
    key::Key,
    traits::RecordHooks,
    types::{GeoPoint, SoftDelete},
};
use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

///
/// Statement
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Arg>,
}

///
/// MockExecutor
///
/// Records statements and serves queued result sets in order.
///

#[derive(Default)]
pub struct MockExecutor {
    statements: Mutex<Vec<Statement>>,
    results: Mutex<VecDeque<Vec<Row>>>,
    catalog: Mutex<Vec<Row>>,
    log: Mutex<Vec<String>>,
    reject: Mutex<Option<String>>,
}

impl MockExecutor {
    pub fn queue(&self, rows: Vec<Row>) {
        guard(&self.results).push_back(rows);
    }

    pub fn set_catalog(&self, rows: Vec<Row>) {
        *guard(&self.catalog) = rows;
    }

    /// Fail every statement containing `fragment`.
    pub fn reject(&self, fragment: &str) {
        *guard(&self.reject) = Some(fragment.to_string());
    }

    pub fn statements(&self) -> Vec<Statement> {
        guard(&self.statements).clone()
    }

    pub fn last(&self) -> Statement {
        self.statements().pop().expect("a statement was run")
    }

    /// Transaction calls, in order.
    pub fn log(&self) -> Vec<String> {
        guard(&self.log).clone()
    }

    fn run(&self, sql: &str, args: &[Arg]) -> Result<(), ExecutorError> {
        guard(&self.statements).push(Statement {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        if let Some(fragment) = guard(&self.reject).as_deref() {
            if sql.contains(fragment) {
                return Err(format!("duplicate entry for '{fragment}'").into());
            }
        }

        Ok(())
    }
}

impl Executor for MockExecutor {
    fn execute(&self, sql: &str, args: &[Arg]) -> Result<u64, ExecutorError> {
        self.run(sql, args)?;
        Ok(1)
    }

    fn query(&self, sql: &str, args: &[Arg]) -> Result<Vec<Row>, ExecutorError> {
        self.run(sql, args)?;
        Ok(guard(&self.results).pop_front().unwrap_or_default())
    }

    fn query_catalog_columns(&self, _: &str, _: &str) -> Result<Vec<Row>, ExecutorError> {
        Ok(guard(&self.catalog).clone())
    }

    fn begin(&self) -> Result<(), ExecutorError> {
        guard(&self.log).push("BEGIN".into());
        Ok(())
    }

    fn commit(&self) -> Result<(), ExecutorError> {
        guard(&self.log).push("COMMIT".into());
        Ok(())
    }

    fn rollback(&self) -> Result<(), ExecutorError> {
        guard(&self.log).push("ROLLBACK".into());
        Ok(())
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn session() -> Session<MockExecutor> {
    let config = Config::from_toml_str(
        r#"
        schema = "shop"
        default_page_size = 2
        "#,
    )
    .expect("config");

    Session::new(MockExecutor::default(), config)
}

// ---------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Record)]
pub struct Dimensions {
    #[loquat("Width")]
    pub width: f32,
    #[loquat("Height")]
    pub height: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Record, Entity)]
#[loquat(name = "Store")]
pub struct Store {
    #[loquat("__key__")]
    pub key: Key,
    #[loquat("Name,unique")]
    pub name: String,
    #[loquat("Location")]
    pub location: GeoPoint,
}

#[derive(Clone, Debug, Default, PartialEq, Record, Entity)]
#[loquat(name = "Product", hooks)]
pub struct Product {
    #[loquat("__key__")]
    pub key: Key,
    #[loquat("Sku")]
    pub sku: String,
    #[loquat("Title")]
    pub title: String,
    #[loquat("Price")]
    pub price: f64,
    #[loquat("Stock")]
    pub stock: i32,
    #[loquat("Labels")]
    pub labels: Vec<String>,
    #[loquat("Size,flatten")]
    pub size: Dimensions,
    #[loquat("Supplier")]
    pub supplier: Option<Key>,
    #[loquat("UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    pub deleted: SoftDelete,
}

impl RecordHooks for Product {
    fn on_save(&mut self) -> Result<(), Error> {
        self.sku = self.sku.to_uppercase();
        Ok(())
    }
}

/// Stored row of a product, as the store returns it.
pub fn product_row(leaf: &str, parent: &str, sku: &str, price: &str) -> Row {
    Row::new()
        .with("$PrimaryKey", Some(format!("{parent}/{leaf}").as_str()))
        .with("$Key", Some(leaf))
        .with("$Parent", Some(parent))
        .with("Sku", Some(sku))
        .with("Title", Some("Widget"))
        .with("Price", Some(price))
        .with("Stock", Some("3"))
        .with("Labels", Some(r#"["new"]"#))
        .with("Size.Width", Some("1.250000"))
        .with("Size.Height", Some("2.000000"))
        .with("Supplier", None)
        .with("UpdatedAt", Some("2024-05-01 10:00:00"))
        .with("DeletedAt", None)
}
