use crate::{
    KEY_TAG,
    config::Backend,
    db::query::{Filter, FilterError, Operator},
    key::Key,
    model::{EntityModel, FieldKind},
    value::{Value, from_json, parse_datetime},
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as Json};

/// Parse a JSON filter document keyed by storage name.
///
/// A scalar means equality; an object maps operator names (`$eq`, `$in`,
/// ...) to operands. Operands are converted with the column's kind, so
/// timestamps are RFC 3339 text and the key field takes a canonical key
/// string, or an array of them meaning membership.
pub fn parse_filters(
    model: &EntityModel,
    backend: Backend,
    document: &str,
) -> Result<Vec<Filter>, FilterError> {
    let Json::Object(root) = serde_json::from_str::<Json>(document)
        .map_err(|err| FilterError::InvalidDocument(err.to_string()))?
    else {
        return Err(FilterError::InvalidDocument(
            "filter document must be an object".to_string(),
        ));
    };

    let mut filters = Vec::new();
    for (name, condition) in root {
        let kind = column_kind(model, &name)?;
        for (operator, operand) in operator_pairs(condition)? {
            let operator = operator.check(backend)?;
            let (operator, value) = operand_value(&name, kind, operator, operand)?;
            filters.extend(Filter::expand(name.clone(), operator, value));
        }
    }

    Ok(filters)
}

fn column_kind(model: &EntityModel, name: &str) -> Result<FieldKind, FilterError> {
    if name == KEY_TAG {
        return Ok(FieldKind::Key);
    }

    model
        .stored_fields()
        .find(|f| f.name == name)
        .map(|f| f.kind)
        .ok_or_else(|| FilterError::UnknownField {
            entity: model.name,
            field: name.to_string(),
        })
}

// operator_pairs
// a bare scalar or array is shorthand for {"$eq": value}
fn operator_pairs(condition: Json) -> Result<Vec<(Operator, Json)>, FilterError> {
    match condition {
        Json::Object(map) => map_pairs(map),
        other => Ok(vec![(Operator::Equal, other)]),
    }
}

fn map_pairs(map: Map<String, Json>) -> Result<Vec<(Operator, Json)>, FilterError> {
    map.into_iter()
        .map(|(name, operand)| Ok((Operator::from_json_name(&name)?, operand)))
        .collect()
}

fn operand_value(
    field: &str,
    kind: FieldKind,
    operator: Operator,
    operand: Json,
) -> Result<(Operator, Value), FilterError> {
    let base = kind.base();

    // key arrays always mean membership
    if matches!(base, FieldKind::Key) && field == KEY_TAG {
        return match operand {
            Json::Array(items) => {
                let keys = items
                    .iter()
                    .map(|item| key_operand(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                let operator = match operator {
                    Operator::Equal => Operator::In,
                    Operator::NotEqual => Operator::NotIn,
                    other => other,
                };
                Ok((operator, Value::List(keys)))
            }
            item => Ok((operator, key_operand(field, &item)?)),
        };
    }

    // operands of list columns are compared element-wise
    let scalar_kind = match base {
        FieldKind::List(elem) => elem(),
        other => other,
    };

    let value = match operand {
        Json::Array(items) => Value::List(
            items
                .into_iter()
                .map(|item| scalar_value(field, scalar_kind, item))
                .collect::<Result<_, _>>()?,
        ),
        item => scalar_value(field, scalar_kind, item)?,
    };

    Ok((operator, value))
}

fn key_operand(field: &str, item: &Json) -> Result<Value, FilterError> {
    match item {
        Json::Null => Ok(Value::Null),
        Json::String(text) => Ok(Value::Key(Key::parse(text)?)),
        other => Err(FilterError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a key string, found {other}"),
        }),
    }
}

fn scalar_value(field: &str, kind: FieldKind, item: Json) -> Result<Value, FilterError> {
    match (kind.base(), item) {
        (_, Json::Null) => Ok(Value::Null),
        (FieldKind::Timestamp | FieldKind::SoftDelete, Json::String(text)) => {
            Ok(Value::Timestamp(timestamp_operand(field, &text)?))
        }
        (base, item) => Ok(from_json(&base, item)?),
    }
}

fn timestamp_operand(field: &str, text: &str) -> Result<DateTime<Utc>, FilterError> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .or_else(|_| parse_datetime(text))
        .map_err(|_| FilterError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{text}' is not an RFC 3339 timestamp"),
        })
}
