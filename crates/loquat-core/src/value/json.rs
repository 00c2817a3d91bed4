use crate::{
    key::Key,
    model::{FieldKind, RecordShape, Tag},
    value::{
        CodecError, Value,
        codec::{format_datetime, parse_datetime, parse_error},
    },
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value as Json};

/// JSON form of a value stored in a composite column.
///
/// Nested records become objects keyed by tag name; timestamps, keys and
/// blobs become strings in their column encoding.
pub fn to_json(kind: &FieldKind, value: &Value) -> Result<Json, CodecError> {
    let json = match (kind, value) {
        (_, Value::Null) => Json::Null,
        (FieldKind::Optional(inner), _) => to_json(&inner(), value)?,
        (FieldKind::List(elem), Value::List(items)) => {
            let elem = elem();
            Json::Array(
                items
                    .iter()
                    .map(|item| to_json(&elem, item))
                    .collect::<Result<_, _>>()?,
            )
        }
        (FieldKind::Record(record), Value::Record(values)) => {
            record_to_json(&(record.shape)(), values)?
        }
        (FieldKind::List(_) | FieldKind::Record(_), other) => {
            return Err(CodecError::Mismatch {
                expected: kind.label(),
                found: other.label(),
            });
        }
        _ => value_to_json(value)?,
    };

    Ok(json)
}

/// Kind-free JSON form; nested records without a shape become arrays.
pub fn value_to_json(value: &Value) -> Result<Json, CodecError> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => Json::from(*v),
        Value::Uint(v) => Json::from(*v),
        Value::Float(v) => Json::Number(Number::from_f64(*v).ok_or(CodecError::NonFiniteFloat)?),
        Value::Text(v) => Json::String(v.clone()),
        Value::Blob(v) => Json::String(STANDARD.encode(v)),
        Value::Timestamp(v) => Json::String(format_datetime(v)),
        Value::GeoPoint(v) => serde_json::to_value(v)?,
        Value::Key(v) if v.is_zero() => Json::Null,
        Value::Key(v) => {
            v.validate()?;
            Json::String(v.to_string())
        }
        Value::List(items) | Value::Record(items) => Json::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<Result<_, _>>()?,
        ),
    };

    Ok(json)
}

/// Object keyed by tag name. Fields tagged `omitempty` are left out when
/// their value is empty.
pub fn record_to_json(shape: &RecordShape, values: &[Value]) -> Result<Json, CodecError> {
    let mut object = Map::new();
    for (raw, value) in shape.fields.iter().zip(values) {
        let tag = Tag::parse(raw.ident, raw.tag);
        if tag.skip || (tag.omit_empty && value.is_empty()) {
            continue;
        }
        object.insert(tag.name, to_json(&raw.kind, value)?);
    }

    Ok(Json::Object(object))
}

/// Inverse of [`to_json`].
pub fn from_json(kind: &FieldKind, json: Json) -> Result<Value, CodecError> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    let value = match kind {
        FieldKind::Optional(inner) => from_json(&inner(), json)?,
        FieldKind::Text => match json {
            Json::String(v) => Value::Text(v),
            other => Value::Text(other.to_string()),
        },
        FieldKind::Bool => match json {
            Json::Bool(v) => Value::Bool(v),
            Json::Number(n) => Value::Bool(n.as_i64().is_some_and(|n| n != 0)),
            other => return Err(mismatch(kind, &other)),
        },
        FieldKind::Int8 | FieldKind::Int16 | FieldKind::Int32 | FieldKind::Int64 => {
            Value::Int(json_number(kind, &json, Number::as_i64)?)
        }
        FieldKind::Uint16 | FieldKind::Uint32 | FieldKind::Uint64 => {
            Value::Uint(json_number(kind, &json, Number::as_u64)?)
        }
        FieldKind::Float32 | FieldKind::Float64 => {
            Value::Float(json_number(kind, &json, Number::as_f64)?)
        }
        FieldKind::Blob => Value::Blob(STANDARD.decode(json_str(kind, &json)?)?),
        FieldKind::Timestamp | FieldKind::SoftDelete => {
            Value::Timestamp(parse_datetime(json_str(kind, &json)?)?)
        }
        FieldKind::GeoPoint => Value::GeoPoint(serde_json::from_value(json)?),
        FieldKind::Key => Value::Key(Key::parse(json_str(kind, &json)?)?),
        FieldKind::List(elem) => match json {
            Json::Array(items) => {
                let elem = elem();
                Value::List(
                    items
                        .into_iter()
                        .map(|item| from_json(&elem, item))
                        .collect::<Result<_, _>>()?,
                )
            }
            other => return Err(mismatch(kind, &other)),
        },
        FieldKind::Record(record) => record_from_json(&(record.shape)(), json)?,
    };

    Ok(value)
}

/// Positional record value from an object keyed by tag name; absent keys
/// read as null.
pub fn record_from_json(shape: &RecordShape, json: Json) -> Result<Value, CodecError> {
    let Json::Object(mut object) = json else {
        return Err(CodecError::Mismatch {
            expected: "record",
            found: json_label(&json),
        });
    };

    let values = shape
        .fields
        .iter()
        .map(|raw| {
            let tag = Tag::parse(raw.ident, raw.tag);
            object
                .remove(&tag.name)
                .map_or(Ok(Value::Null), |json| from_json(&raw.kind, json))
        })
        .collect::<Result<_, _>>()?;

    Ok(Value::Record(values))
}

// json_number
// numbers may also arrive as decimal strings
fn json_number<T: std::str::FromStr>(
    kind: &FieldKind,
    json: &Json,
    read: fn(&Number) -> Option<T>,
) -> Result<T, CodecError> {
    match json {
        Json::Number(n) => read(n).ok_or_else(|| CodecError::OutOfRange {
            target: kind.label(),
            value: n.to_string(),
        }),
        Json::String(s) => s.trim().parse().map_err(|_| parse_error(kind.label(), s)),
        other => Err(mismatch(kind, other)),
    }
}

fn json_str<'a>(kind: &FieldKind, json: &'a Json) -> Result<&'a str, CodecError> {
    json.as_str().ok_or_else(|| mismatch(kind, json))
}

fn mismatch(kind: &FieldKind, json: &Json) -> CodecError {
    CodecError::Mismatch {
        expected: kind.label(),
        found: json_label(json),
    }
}

const fn json_label(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "text",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}
