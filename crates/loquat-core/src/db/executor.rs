//! Execution collaborator boundary.
//!
//! Connection handling and the wire protocol live behind [`Executor`]; the
//! engine only hands it statement text and positional arguments.

/// Error raised by an executor, carried unchanged as the source of
/// `Error::Execution`.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// One positional statement argument; `None` binds SQL NULL.
pub type Arg = Option<String>;

///
/// Row
///
/// One result row: ordered `(column, raw bytes)` pairs, `None` for NULL.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Row {
    columns: Vec<(String, Option<Vec<u8>>)>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Row::push`] for text columns.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, text: Option<&str>) -> Self {
        self.push(column, text.map(|t| t.as_bytes().to_vec()));
        self
    }

    pub fn push(&mut self, column: impl Into<String>, bytes: Option<Vec<u8>>) {
        self.columns.push((column.into(), bytes));
    }

    /// `None` when the column is absent, `Some(None)` when it is NULL.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<Option<&[u8]>> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, bytes)| bytes.as_deref())
    }

    /// Text of a present, non-null, UTF-8 column.
    #[must_use]
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column)
            .flatten()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.columns
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_deref()))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

///
/// Executor
///
/// Runs compiled statements. Implementations own connections and decide
/// what `begin`/`commit`/`rollback` mean for them.
///

pub trait Executor: Send + Sync {
    /// Run a statement that returns no rows; yields the affected-row count.
    fn execute(&self, sql: &str, args: &[Arg]) -> Result<u64, ExecutorError>;

    fn query(&self, sql: &str, args: &[Arg]) -> Result<Vec<Row>, ExecutorError>;

    /// Rows of `INFORMATION_SCHEMA.COLUMNS` for one table, any order.
    fn query_catalog_columns(&self, schema: &str, table: &str) -> Result<Vec<Row>, ExecutorError>;

    fn begin(&self) -> Result<(), ExecutorError>;

    fn commit(&self) -> Result<(), ExecutorError>;

    fn rollback(&self) -> Result<(), ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_distinguishes_missing_from_null() {
        let row = Row::new().with("a", Some("1")).with("b", None);

        assert_eq!(row.get("a"), Some(Some(&b"1"[..])));
        assert_eq!(row.get("b"), Some(None));
        assert_eq!(row.get("c"), None);
        assert_eq!(row.text("a"), Some("1"));
        assert_eq!(row.len(), 2);
    }
}
