use crate::{
    KEY_COLUMN, PARENT_COLUMN, PRIMARY_KEY_COLUMN,
    db::{
        executor::Executor,
        migrate::{CatalogColumn, MigrationPlan, plan, target_columns},
        query::FilterError,
        quote_ident,
        session::Session,
    },
    error::{Error, ErrorOrigin},
    model::EntityModel,
    obs::StatementKind,
    traits::Entity,
};

impl<X: Executor> Session<X> {
    /// Bring `E`'s table in line with its model and return the plan that was
    /// run. Nothing runs when the plan is a no-op.
    pub fn migrate<E: Entity>(&self) -> Result<MigrationPlan, Error> {
        self.ensure_relational("migrate")?;
        let model = self.model::<E>()?;

        let schema = &self.config().schema;
        let catalog = self
            .executor()
            .query_catalog_columns(schema, model.name)
            .map_err(Error::execution)?
            .iter()
            .map(CatalogColumn::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let plan = plan(&self.table_of(&model), &target_columns(&model), &catalog);
        match plan.statement() {
            Some(sql) => {
                tracing::debug!(entity = E::PATH, create = catalog.is_empty(), "migrating table");
                self.run_execute(StatementKind::Ddl, E::PATH, sql, &[])?;
            }
            None => tracing::trace!(entity = E::PATH, "table already up to date"),
        }

        Ok(plan)
    }

    pub fn drop_table<E: Entity>(&self) -> Result<(), Error> {
        self.drop_with::<E>("DROP TABLE")
    }

    pub fn drop_table_if_exists<E: Entity>(&self) -> Result<(), Error> {
        self.drop_with::<E>("DROP TABLE IF EXISTS")
    }

    /// (Re)create a unique index over `columns`, named after them joined
    /// with `_`. An index of that name is dropped first.
    pub fn unique_index<E: Entity>(&self, columns: &[&str]) -> Result<(), Error> {
        self.ensure_relational("unique index")?;
        let model = self.model::<E>()?;
        let name = index_name(&model, columns)?;
        let table = self.table_of(&model);

        if self.index_exists(&model, &name)? {
            self.drop_index::<E>(&table, &name)?;
        }

        let sql = format!(
            "CREATE UNIQUE INDEX {} ON {table} ({});",
            quote_ident(&name),
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(","),
        );
        self.run_execute(StatementKind::Ddl, E::PATH, &sql, &[])?;

        Ok(())
    }

    /// Drop the unique index over `columns` if it exists.
    pub fn drop_unique_index<E: Entity>(&self, columns: &[&str]) -> Result<(), Error> {
        self.ensure_relational("drop unique index")?;
        let model = self.model::<E>()?;
        let name = index_name(&model, columns)?;

        if self.index_exists(&model, &name)? {
            self.drop_index::<E>(&self.table_of(&model), &name)?;
        }

        Ok(())
    }

    fn drop_with<E: Entity>(&self, verb: &str) -> Result<(), Error> {
        self.ensure_relational("drop table")?;
        let model = self.model::<E>()?;
        let sql = format!("{verb} {};", self.table_of(&model));

        self.run_execute(StatementKind::Ddl, E::PATH, &sql, &[])?;

        Ok(())
    }

    fn index_exists(&self, model: &EntityModel, name: &str) -> Result<bool, Error> {
        let sql = "SELECT * FROM INFORMATION_SCHEMA.STATISTICS \
                   WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = ?;";
        let args = [
            Some(self.config().schema.clone()),
            Some(model.name.to_string()),
            Some(name.to_string()),
        ];
        let rows = self.run_query(StatementKind::Select, model.path, sql, &args)?;

        Ok(!rows.is_empty())
    }

    fn drop_index<E: Entity>(&self, table: &str, name: &str) -> Result<(), Error> {
        let sql = format!("ALTER TABLE {table} DROP INDEX {};", quote_ident(name));
        self.run_execute(StatementKind::Ddl, E::PATH, &sql, &[])?;

        Ok(())
    }
}

// index_name
// every column must belong to the table
fn index_name(model: &EntityModel, columns: &[&str]) -> Result<String, Error> {
    if columns.is_empty() {
        return Err(Error::invalid_input(
            ErrorOrigin::Session,
            "unique index without columns",
        ));
    }
    for column in columns {
        let known = [PRIMARY_KEY_COLUMN, KEY_COLUMN, PARENT_COLUMN].contains(column)
            || model.stored_fields().any(|f| f.name == *column);
        if !known {
            return Err(FilterError::UnknownField {
                entity: model.name,
                field: (*column).to_string(),
            }
            .into());
        }
    }

    Ok(columns.join("_"))
}
