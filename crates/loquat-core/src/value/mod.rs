//! Runtime values and their textual storage codec.

mod codec;
mod json;


pub use codec::{
    DATETIME_FORMAT, decode, encode, format_datetime, parse_datetime, quote, render_literal,
    value_text,
};
pub use json::{from_json, record_from_json, record_to_json, to_json};

use crate::{
    key::Key,
    types::{Blob, GeoPoint},
};
use chrono::{DateTime, Utc};
use thiserror::Error as ThisError;

///
/// CodecError
///

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("cannot decode '{text}' as {expected}")]
    Parse { expected: &'static str, text: String },

    #[error("expected {expected} value, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("integer {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("non-finite floats have no storage encoding")]
    NonFiniteFloat,

    #[error("{what} has no storage encoding")]
    Unencodable { what: &'static str },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    Key(#[from] crate::key::KeyError),
}

///
/// Value
///
/// Dynamically typed field value. `Record` holds the stored fields of a
/// nested record positionally, in declaration order.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    GeoPoint(GeoPoint),
    Key(Key),
    List(Vec<Self>),
    Record(Vec<Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Short label of the variant, used in error messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Timestamp(_) => "timestamp",
            Self::GeoPoint(_) => "geo point",
            Self::Key(_) => "key",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Values that need quoting when inlined into a statement.
    #[must_use]
    pub const fn needs_escape(&self) -> bool {
        !matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Uint(_) | Self::Float(_)
        )
    }

    /// Zero value of its variant (empty text, 0, false, empty list, ...).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(v) => !v,
            Self::Int(v) => *v == 0,
            Self::Uint(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Text(v) => v.is_empty(),
            Self::Blob(v) => v.is_empty(),
            Self::Timestamp(v) => v.timestamp() == 0 && v.timestamp_subsec_nanos() == 0,
            Self::GeoPoint(v) => *v == GeoPoint::default(),
            Self::Key(v) => v.is_zero(),
            Self::List(v) | Self::Record(v) => v.is_empty(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    DateTime<Utc> => Timestamp,
    GeoPoint => GeoPoint,
    Key => Key,
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        Self::Key(key.clone())
    }
}

impl From<Blob> for Value {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob.into_inner())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self> + Clone> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Self::List(items.iter().cloned().map(Into::into).collect())
    }
}
