//! Recording executor and sample records shared by unit tests.

use crate::{
    config::Config,
    db::{
        Session,
        executor::{Arg, Executor, ExecutorError, Row},
    },
    error::Error,
    key::Key,
    traits::RecordHooks,
    types::{GeoPoint, SoftDelete},
};
use loquat_derive::{Entity, Record};
use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

///
/// Call
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Call {
    pub sql: String,
    pub args: Vec<Arg>,
}

///
/// RecordingExecutor
///
/// Records every statement, answers queries from a queue of canned results
/// and fails any statement containing `fail_on`.
///

#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    results: Mutex<VecDeque<Vec<Row>>>,
    catalog: Mutex<Vec<Row>>,
    transactions: Mutex<Vec<&'static str>>,
    fail_on: Option<String>,
}

impl RecordingExecutor {
    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        lock(&self.results).push_back(rows);
    }

    pub fn set_catalog(&self, rows: Vec<Row>) {
        *lock(&self.catalog) = rows;
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn sqls(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.sql).collect()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no statement recorded")
    }

    pub fn transactions(&self) -> Vec<&'static str> {
        lock(&self.transactions).clone()
    }

    fn record(&self, sql: &str, args: &[Arg]) -> Result<(), ExecutorError> {
        lock(&self.calls).push(Call {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        match &self.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => {
                Err(format!("rejected: {fragment}").into())
            }
            _ => Ok(()),
        }
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, sql: &str, args: &[Arg]) -> Result<u64, ExecutorError> {
        self.record(sql, args)?;

        Ok(1)
    }

    fn query(&self, sql: &str, args: &[Arg]) -> Result<Vec<Row>, ExecutorError> {
        self.record(sql, args)?;

        Ok(lock(&self.results).pop_front().unwrap_or_default())
    }

    fn query_catalog_columns(&self, _schema: &str, _table: &str) -> Result<Vec<Row>, ExecutorError> {
        Ok(lock(&self.catalog).clone())
    }

    fn begin(&self) -> Result<(), ExecutorError> {
        lock(&self.transactions).push("begin");
        Ok(())
    }

    fn commit(&self) -> Result<(), ExecutorError> {
        lock(&self.transactions).push("commit");
        Ok(())
    }

    fn rollback(&self) -> Result<(), ExecutorError> {
        lock(&self.transactions).push("rollback");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session over a fresh recording executor with schema `app`.
pub fn session() -> Session<RecordingExecutor> {
    Session::new(RecordingExecutor::default(), Config::new("app"))
}

// ---------------------------------------------------------------------
// Sample records
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Record)]
pub struct Address {
    #[loquat("Line")]
    pub line: String,
    #[loquat("City")]
    pub city: String,
}

#[derive(Clone, Debug, Default, PartialEq, Record, Entity)]
#[loquat(name = "User")]
pub struct User {
    #[loquat("__key__")]
    pub key: Key,
    #[loquat("Name")]
    pub name: String,
    #[loquat("Age,unsigned")]
    pub age: u32,
    #[loquat("Score")]
    pub score: f64,
    #[loquat("Tags")]
    pub tags: Vec<String>,
    #[loquat("Address,flatten")]
    pub address: Address,
    #[loquat("Location")]
    pub location: Option<GeoPoint>,
    pub deleted: SoftDelete,
    #[loquat("-")]
    pub scratch: u8,
}

/// Entity without a soft-delete marker whose save hook trims the name.
#[derive(Clone, Debug, Default, PartialEq, Record, Entity)]
#[loquat(name = "Note", hooks)]
pub struct Note {
    #[loquat("__key__")]
    pub key: Key,
    #[loquat("Body")]
    pub body: String,
    #[loquat("-")]
    pub loaded: bool,
}

impl RecordHooks for Note {
    fn on_load(&mut self) -> Result<(), Error> {
        self.loaded = true;
        Ok(())
    }

    fn on_save(&mut self) -> Result<(), Error> {
        self.body = self.body.trim().to_string();
        Ok(())
    }
}

/// Row of `User` as the store would return it.
pub fn user_row(leaf: &str, parent: &str, name: &str) -> Row {
    Row::new()
        .with("$PrimaryKey", Some(format!("{parent}/{leaf}").as_str()))
        .with("$Key", Some(leaf))
        .with("$Parent", Some(parent))
        .with("Name", Some(name))
        .with("Age", Some("30"))
        .with("Score", Some("1.500000"))
        .with("Tags", Some(r#"["a","b"]"#))
        .with("Address.Line", Some("1 Main St"))
        .with("Address.City", Some("Ipoh"))
        .with("Location", None)
        .with("DeletedAt", None)
}
