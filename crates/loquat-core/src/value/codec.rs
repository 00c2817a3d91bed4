use crate::{
    key::Key,
    model::FieldKind,
    value::{CodecError, Value, json},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format of timestamp columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// fallback accepted when reading columns that carry fractional seconds
const DATETIME_FRACTION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// zero date some servers return for unset datetime columns
const ZERO_DATE: &str = "0000-00-00 00:00:00";

/// Single-quote `text` for inlining into a statement.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("''"),
            c => out.push(c),
        }
    }
    out.push('\'');

    out
}

/// Encode `value` as the stored text of a column of `kind`.
///
/// `Ok(None)` is SQL NULL: null values, unset keys and unset soft-delete
/// markers.
pub fn encode(kind: &FieldKind, value: &Value) -> Result<Option<String>, CodecError> {
    if value.is_null() {
        return Ok(None);
    }

    let text = match (kind, value) {
        (FieldKind::Optional(inner), _) => return encode(&inner(), value),

        (FieldKind::Text, Value::Text(v)) => v.clone(),
        (FieldKind::Bool, Value::Bool(v)) => bool_text(*v),
        (k, Value::Int(v)) if k.is_integer() => {
            if k.is_unsigned() && *v < 0 {
                return Err(CodecError::OutOfRange {
                    target: k.label(),
                    value: v.to_string(),
                });
            }
            v.to_string()
        }
        (k, Value::Uint(v)) if k.is_integer() => v.to_string(),
        (FieldKind::Float32 | FieldKind::Float64, Value::Float(v)) => float_text(*v)?,
        #[allow(clippy::cast_precision_loss)]
        (FieldKind::Float32 | FieldKind::Float64, Value::Int(v)) => float_text(*v as f64)?,
        (FieldKind::Blob, Value::Blob(v)) => STANDARD.encode(v),
        (FieldKind::Timestamp | FieldKind::SoftDelete, Value::Timestamp(v)) => format_datetime(v),
        (FieldKind::GeoPoint, Value::GeoPoint(v)) => {
            if !v.is_valid() {
                return Err(CodecError::Unencodable {
                    what: "out-of-range geo point",
                });
            }
            serde_json::to_string(v)?
        }
        (FieldKind::Key, Value::Key(v)) => return key_text(v),

        (FieldKind::List(_) | FieldKind::Record(_), _) => {
            serde_json::to_string(&json::to_json(kind, value)?)?
        }

        (kind, value) => {
            return Err(CodecError::Mismatch {
                expected: kind.label(),
                found: value.label(),
            });
        }
    };

    Ok(Some(text))
}

/// Decode the stored text of a column of `kind`; `None` is SQL NULL.
pub fn decode(kind: &FieldKind, text: Option<&str>) -> Result<Value, CodecError> {
    let Some(text) = text else {
        return Ok(Value::Null);
    };

    let value = match kind {
        FieldKind::Optional(inner) => decode(&inner(), Some(text))?,
        FieldKind::Text => Value::Text(text.to_string()),
        FieldKind::Bool => Value::Bool(parse_bool(text)?),
        FieldKind::Int8 | FieldKind::Int16 | FieldKind::Int32 | FieldKind::Int64 => Value::Int(
            text.trim()
                .parse()
                .map_err(|_| parse_error(kind.label(), text))?,
        ),
        FieldKind::Uint16 | FieldKind::Uint32 | FieldKind::Uint64 => Value::Uint(
            text.trim()
                .parse()
                .map_err(|_| parse_error(kind.label(), text))?,
        ),
        FieldKind::Float32 | FieldKind::Float64 => Value::Float(
            text.trim()
                .parse()
                .map_err(|_| parse_error(kind.label(), text))?,
        ),
        FieldKind::Blob => Value::Blob(STANDARD.decode(text.trim())?),
        FieldKind::Timestamp | FieldKind::SoftDelete => match text.trim() {
            "" | ZERO_DATE => Value::Null,
            trimmed => Value::Timestamp(parse_datetime(trimmed)?),
        },
        FieldKind::GeoPoint => match text.trim() {
            "" => Value::Null,
            trimmed => Value::GeoPoint(serde_json::from_str(trimmed)?),
        },
        FieldKind::Key if text.trim().is_empty() => Value::Null,
        FieldKind::Key => Value::Key(Key::parse(text)?),
        FieldKind::List(_) | FieldKind::Record(_) => match text.trim() {
            "" => Value::Null,
            trimmed => json::from_json(kind, serde_json::from_str(trimmed)?)?,
        },
    };

    Ok(value)
}

/// Stored text of a value whose column kind is unknown (filter operands).
pub fn value_text(value: &Value) -> Result<Option<String>, CodecError> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::Bool(v) => bool_text(*v),
        Value::Int(v) => v.to_string(),
        Value::Uint(v) => v.to_string(),
        Value::Float(v) => float_text(*v)?,
        Value::Text(v) => v.clone(),
        Value::Blob(v) => STANDARD.encode(v),
        Value::Timestamp(v) => format_datetime(v),
        Value::GeoPoint(v) => serde_json::to_string(v)?,
        Value::Key(v) => return key_text(v),
        Value::List(_) | Value::Record(_) => serde_json::to_string(&json::value_to_json(value)?)?,
    };

    Ok(Some(text))
}

/// Inline literal of `value`: `NULL`, a bare number, or a quoted string.
pub fn render_literal(value: &Value) -> Result<String, CodecError> {
    Ok(match value_text(value)? {
        None => "NULL".to_string(),
        Some(text) if value.needs_escape() => quote(&text),
        Some(text) => text,
    })
}

#[must_use]
pub fn format_datetime(at: &DateTime<Utc>) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>, CodecError> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, DATETIME_FRACTION_FORMAT))
        .map(|naive| naive.and_utc())
        .map_err(|_| parse_error("timestamp", text))
}

fn key_text(key: &Key) -> Result<Option<String>, CodecError> {
    if key.is_zero() {
        return Ok(None);
    }
    key.validate()?;

    Ok(Some(key.to_string()))
}

fn bool_text(v: bool) -> String {
    if v { "1" } else { "0" }.to_string()
}

fn float_text(v: f64) -> Result<String, CodecError> {
    if !v.is_finite() {
        return Err(CodecError::NonFiniteFloat);
    }

    Ok(format!("{v:.6}"))
}

fn parse_bool(text: &str) -> Result<bool, CodecError> {
    match text.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(parse_error("bool", text)),
    }
}

pub(crate) fn parse_error(expected: &'static str, text: &str) -> CodecError {
    CodecError::Parse {
        expected,
        text: text.to_string(),
    }
}
