use crate::{
    KEY_COLUMN, PARENT_COLUMN,
    db::executor::Row,
    error::{Error, ErrorOrigin},
    key::Key,
    model::{EntityModel, write_path},
    traits::Entity,
    value::{Value, decode},
};

/// Decode result rows of `table` into records.
pub(crate) fn decode_rows<E: Entity>(
    model: &EntityModel,
    table: &str,
    rows: &[Row],
) -> Result<Vec<E>, Error> {
    rows.iter()
        .map(|row| decode_row::<E>(model, table, row))
        .collect()
}

/// Decode one row. Columns absent from the row leave the field at its
/// default; NULL columns read as the field's zero value (or `None`).
pub(crate) fn decode_row<E: Entity>(
    model: &EntityModel,
    table: &str,
    row: &Row,
) -> Result<E, Error> {
    let mut record = E::default();

    if let Some(pk) = &model.primary_key {
        let leaf = column_text(row, KEY_COLUMN)?;
        if let Some(leaf) = leaf.filter(|leaf| !leaf.trim().is_empty()) {
            let parent = column_text(row, PARENT_COLUMN)?.unwrap_or_default();
            let key = Key::from_columns(table, leaf, parent)?;
            write_path(&mut record, &pk.path, Value::Key(key))?;
        }
    }

    for field in model.stored_fields() {
        let Some(bytes) = row.get(&field.name) else {
            continue;
        };
        let text = bytes.map(|b| utf8(&field.name, b)).transpose()?;
        let value = decode(&field.kind, text)?;
        write_path(&mut record, &field.path, value)?;
    }

    model.hooks.on_load(&mut record)?;

    Ok(record)
}

fn column_text<'r>(row: &'r Row, column: &str) -> Result<Option<&'r str>, Error> {
    row.get(column)
        .flatten()
        .map(|bytes| utf8(column, bytes))
        .transpose()
}

fn utf8<'b>(column: &str, bytes: &'b [u8]) -> Result<&'b str, Error> {
    std::str::from_utf8(bytes).map_err(|err| {
        Error::encoding(
            ErrorOrigin::Codec,
            format!("column '{column}' is not valid UTF-8: {err}"),
        )
    })
}
