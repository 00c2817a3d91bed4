use crate::{
    KEY_COLUMN, KEY_TAG, PARENT_COLUMN, PRIMARY_KEY_COLUMN, SOFT_DELETE_COLUMN,
    db::{
        executor::{Arg, Executor},
        qualified_table, quote_ident,
        session::Session,
    },
    error::{Error, ErrorOrigin},
    key::Key,
    model::{EntityModel, read_path, write_path},
    obs::StatementKind,
    traits::Entity,
    value::{Value, format_datetime},
};
use chrono::Utc;

// Conflict
// upsert clause settings
struct Conflict<'e> {
    excluded: &'e [&'e str],
}

impl<X: Executor> Session<X> {
    // ------------------------------------------------------------------
    // Inserts
    // ------------------------------------------------------------------

    /// Insert one record, assigning its key. A complete `parent` of the
    /// entity's own kind is adopted as the key; any other parent becomes the
    /// ancestor of a generated key.
    pub fn create<E: Entity>(&self, record: &mut E, parent: Option<&Key>) -> Result<(), Error> {
        self.create_many(std::slice::from_mut(record), parent)
    }

    /// Insert records in one statement, all under the same `parent`.
    pub fn create_many<E: Entity>(&self, records: &mut [E], parent: Option<&Key>) -> Result<(), Error> {
        let parents = vec![parent.cloned(); records.len()];

        self.insert(records, &parents, None)
    }

    /// Insert records in one statement, each under its own parent.
    pub fn create_many_with_parents<E: Entity>(
        &self,
        records: &mut [E],
        parents: &[Key],
    ) -> Result<(), Error> {
        if parents.len() != records.len() {
            return Err(Error::invalid_input(
                ErrorOrigin::Session,
                format!(
                    "{} records given with {} parents",
                    records.len(),
                    parents.len()
                ),
            ));
        }
        let parents: Vec<_> = parents.iter().cloned().map(Some).collect();

        self.insert(records, &parents, None)
    }

    /// Insert a record or overwrite the row holding its key. Columns named in
    /// `excluded` keep their stored value on conflict.
    pub fn upsert<E: Entity>(
        &self,
        record: &mut E,
        parent: Option<&Key>,
        excluded: &[&str],
    ) -> Result<(), Error> {
        self.upsert_many(std::slice::from_mut(record), parent, excluded)
    }

    pub fn upsert_many<E: Entity>(
        &self,
        records: &mut [E],
        parent: Option<&Key>,
        excluded: &[&str],
    ) -> Result<(), Error> {
        let parents = vec![parent.cloned(); records.len()];

        self.insert(records, &parents, Some(Conflict { excluded }))
    }

    // ------------------------------------------------------------------
    // Keyed mutations
    // ------------------------------------------------------------------

    /// Overwrite every stored column of the row holding the record's key.
    pub fn update<E: Entity>(&self, record: &mut E) -> Result<u64, Error> {
        self.ensure_relational("update")?;
        let model = self.model::<E>()?;

        model.hooks.on_save(record)?;
        let key = record_key(&model, record)?.ok_or_else(|| {
            Error::invalid_input(
                ErrorOrigin::Session,
                format!("update of {} needs a complete key", model.name),
            )
        })?;
        key.validate()?;

        let mut assignments = Vec::new();
        let mut args: Vec<Arg> = Vec::new();
        for field in model.stored_fields() {
            assignments.push(format!("{} = ?", quote_ident(&field.name)));
            args.push(field.storage_text(&read_path(record, &field.path)?)?);
        }
        args.push(Some(key.primary_key_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?;",
            self.table_of(&model),
            assignments.join(","),
            quote_ident(PRIMARY_KEY_COLUMN),
        );

        self.run_execute(StatementKind::Update, E::PATH, &sql, &args)
    }

    /// Remove the row stored under `key`.
    pub fn delete<E: Entity>(&self, key: &Key) -> Result<u64, Error> {
        self.delete_many::<E>(std::slice::from_ref(key))
    }

    /// Remove the rows stored under `keys`; nothing to do for an empty list.
    pub fn delete_many<E: Entity>(&self, keys: &[Key]) -> Result<u64, Error> {
        self.ensure_relational("delete")?;
        if keys.is_empty() {
            return Ok(0);
        }
        let model = self.model::<E>()?;

        let args = keys
            .iter()
            .map(|key| {
                key.validate()?;
                Ok(Some(key.primary_key_string()))
            })
            .collect::<Result<Vec<Arg>, Error>>()?;

        let target = if keys.len() == 1 {
            "= ?".to_string()
        } else {
            format!("IN ({})", placeholders(keys.len()))
        };
        let sql = format!(
            "DELETE FROM {} WHERE {} {target};",
            self.table_of(&model),
            quote_ident(PRIMARY_KEY_COLUMN),
        );

        self.run_execute(StatementKind::Delete, E::PATH, &sql, &args)
    }

    /// Stamp the soft-delete marker of the row stored under `key` with the
    /// current time.
    pub fn soft_delete<E: Entity>(&self, key: &Key) -> Result<u64, Error> {
        self.ensure_relational("soft delete")?;
        let model = self.model::<E>()?;
        if model.soft_delete.is_none() {
            return Err(Error::unsupported(
                ErrorOrigin::Session,
                format!("{} has no soft-delete marker", model.name),
            ));
        }
        key.validate()?;

        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {} = ? AND {} = ?;",
            self.table_of(&model),
            quote_ident(SOFT_DELETE_COLUMN),
            quote_ident(KEY_COLUMN),
            quote_ident(PARENT_COLUMN),
        );
        let args = [
            Some(format_datetime(&Utc::now())),
            Some(key.leaf_token()),
            Some(key.parent_string()),
        ];

        self.run_execute(StatementKind::Update, E::PATH, &sql, &args)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn table_of(&self, model: &EntityModel) -> String {
        qualified_table(&self.config().schema, model.name)
    }

    fn insert<E: Entity>(
        &self,
        records: &mut [E],
        parents: &[Option<Key>],
        conflict: Option<Conflict<'_>>,
    ) -> Result<(), Error> {
        self.ensure_relational(if conflict.is_some() { "upsert" } else { "create" })?;
        if records.is_empty() {
            return Ok(());
        }
        let max = self.config().max_batch_size;
        if records.len() > max {
            return Err(Error::invalid_input(
                ErrorOrigin::Session,
                format!("{} records exceed the batch limit of {max}", records.len()),
            ));
        }
        let model = self.model::<E>()?;
        let fields: Vec<_> = model.stored_fields().collect();

        let mut columns = vec![
            quote_ident(PRIMARY_KEY_COLUMN),
            quote_ident(KEY_COLUMN),
            quote_ident(PARENT_COLUMN),
        ];
        columns.extend(fields.iter().map(|f| quote_ident(&f.name)));
        let row = format!("({})", placeholders(columns.len()));

        let mut args: Vec<Arg> = Vec::with_capacity(records.len() * columns.len());
        for (record, parent) in records.iter_mut().zip(parents) {
            let key = match (&conflict, parent) {
                (Some(_), None) => record_key(&model, record)?
                    .filter(|key| key.kind() == model.name)
                    .unwrap_or_else(|| Key::for_new_record(model.name, None)),
                (_, parent) => Key::for_new_record(model.name, parent.as_ref()),
            };
            key.validate()?;
            if let Some(pk) = &model.primary_key {
                write_path(record, &pk.path, Value::Key(key.clone()))?;
            }
            model.hooks.on_save(record)?;

            args.push(Some(key.primary_key_string()));
            args.push(Some(key.leaf_token()));
            args.push(Some(key.parent_string()));
            for field in &fields {
                args.push(field.storage_text(&read_path(record, &field.path)?)?);
            }
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table_of(&model),
            columns.join(","),
            vec![row; records.len()].join(","),
        );
        if let Some(conflict) = &conflict {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&conflict_updates(&model, conflict.excluded).join(","));
        }
        sql.push(';');

        self.run_execute(StatementKind::Insert, E::PATH, &sql, &args)?;

        Ok(())
    }
}

// record_key
// complete key held by the record's key field, if any
fn record_key<E: Entity>(model: &EntityModel, record: &E) -> Result<Option<Key>, Error> {
    let Some(pk) = &model.primary_key else {
        return Ok(None);
    };

    Ok(match read_path(record, &pk.path)? {
        Value::Key(key) if key.is_complete() => Some(key),
        _ => None,
    })
}

// conflict_updates
// key columns cannot be excluded; if everything else is, the clause
// rewrites the primary key onto itself so the statement stays valid
fn conflict_updates(model: &EntityModel, excluded: &[&str]) -> Vec<String> {
    let excluded: Vec<&str> = excluded
        .iter()
        .copied()
        .filter(|name| ![KEY_COLUMN, PARENT_COLUMN, KEY_TAG].contains(name))
        .collect();

    let updates: Vec<String> = model
        .stored_fields()
        .filter(|field| !excluded.contains(&field.name.as_str()))
        .map(|field| {
            let column = quote_ident(&field.name);
            format!("{column}=VALUES({column})")
        })
        .collect();

    if updates.is_empty() {
        let column = quote_ident(PRIMARY_KEY_COLUMN);
        vec![format!("{column}=VALUES({column})")]
    } else {
        updates
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
