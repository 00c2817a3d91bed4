use crate::{KEY_COLUMN, db::quote_ident};

///
/// LockMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockMode {
    Share,
    Update,
}

impl LockMode {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Share => "LOCK IN SHARE MODE",
            Self::Update => "FOR UPDATE",
        }
    }
}

///
/// Statement
///
/// Compiled clauses of one query. Sources are already-qualified table
/// references; several sources are read as one `UNION ALL`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Statement {
    pub tables: Vec<String>,
    pub filters: Vec<String>,
    pub orders: Vec<String>,
    pub limit: Option<u64>,
    pub offset: u64,
    pub lock: Option<LockMode>,
}

impl Statement {
    /// The FROM target: the table itself, or the union aliased as `Master`.
    #[must_use]
    pub fn source(&self) -> String {
        match self.tables.as_slice() {
            [table] => table.clone(),
            tables => {
                let selects = tables
                    .iter()
                    .map(|t| format!("SELECT * FROM {t}"))
                    .collect::<Vec<_>>();
                format!("({}) AS {}", selects.join(" UNION ALL "), quote_ident("Master"))
            }
        }
    }

    #[must_use]
    pub fn select_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.source());
        self.push_where(&mut sql);
        self.push_order(&mut sql);
        self.push_limit(&mut sql);
        self.push_lock(&mut sql);
        sql.push(';');

        sql
    }

    #[must_use]
    pub fn count_sql(&self) -> String {
        let mut sql = format!(
            "SELECT count({}) FROM {}",
            quote_ident(KEY_COLUMN),
            self.source()
        );
        self.push_where(&mut sql);
        sql.push(';');

        sql
    }

    #[must_use]
    pub fn sum_sql(&self, column: &str) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            Self::sum_expr(column),
            self.source()
        );
        self.push_where(&mut sql);
        sql.push(';');

        sql
    }

    /// Selected expression of [`Statement::sum_sql`], also its column label.
    #[must_use]
    pub fn sum_expr(column: &str) -> String {
        format!("COALESCE(SUM({}),0)", quote_ident(column))
    }

    /// `UPDATE` of the first source. `assignments` are complete `col = ?`
    /// fragments.
    #[must_use]
    pub fn update_sql(&self, assignments: &[String]) -> String {
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.tables.first().map_or("", String::as_str),
            assignments.join(",")
        );
        self.push_where(&mut sql);
        self.push_order(&mut sql);
        self.push_row_limit(&mut sql);
        sql.push(';');

        sql
    }

    #[must_use]
    pub fn delete_sql(&self) -> String {
        let mut sql = format!(
            "DELETE FROM {}",
            self.tables.first().map_or("", String::as_str)
        );
        self.push_where(&mut sql);
        self.push_order(&mut sql);
        self.push_row_limit(&mut sql);
        sql.push(';');

        sql
    }

    fn push_where(&self, sql: &mut String) {
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
    }

    fn push_order(&self, sql: &mut String) {
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(","));
        }
    }

    fn push_limit(&self, sql: &mut String) {
        // OFFSET needs a LIMIT; u64::MAX is the usual "no limit" stand-in
        let limit = match (self.limit, self.offset) {
            (Some(limit), _) => limit,
            (None, 0) => return,
            (None, _) => u64::MAX,
        };
        sql.push_str(&format!(" LIMIT {limit}"));
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
    }

    // push_row_limit
    // UPDATE and DELETE take a row count only, never an OFFSET
    fn push_row_limit(&self, sql: &mut String) {
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
    }

    fn push_lock(&self, sql: &mut String) {
        if let Some(lock) = self.lock {
            sql.push(' ');
            sql.push_str(lock.sql());
        }
    }
}
