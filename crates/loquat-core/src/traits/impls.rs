use crate::{
    key::Key,
    model::FieldKind,
    traits::FieldValue,
    types::{Blob, GeoPoint, SoftDelete},
    value::{CodecError, Value},
};
use chrono::{DateTime, Utc};

fn mismatch(expected: FieldKind, found: &Value) -> CodecError {
    CodecError::Mismatch {
        expected: expected.label(),
        found: found.label(),
    }
}

///
/// Text and bool
///

impl FieldValue for String {
    fn kind() -> FieldKind {
        FieldKind::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Text(v) => Ok(v),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

impl FieldValue for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::Uint(v) => Ok(v != 0),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

///
/// Integers
///
/// Either integer variant is accepted; the range is checked on conversion.
///

macro_rules! impl_signed {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, CodecError> {
                    let out_of_range = |value: String| CodecError::OutOfRange {
                        target: stringify!($ty),
                        value,
                    };
                    match value {
                        Value::Null => Ok(0),
                        Value::Int(v) => Self::try_from(v).map_err(|_| out_of_range(v.to_string())),
                        Value::Uint(v) => Self::try_from(v).map_err(|_| out_of_range(v.to_string())),
                        other => Err(mismatch(Self::kind(), &other)),
                    }
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn to_value(&self) -> Value {
                    Value::Uint(u64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, CodecError> {
                    let out_of_range = |value: String| CodecError::OutOfRange {
                        target: stringify!($ty),
                        value,
                    };
                    match value {
                        Value::Null => Ok(0),
                        Value::Int(v) => Self::try_from(v).map_err(|_| out_of_range(v.to_string())),
                        Value::Uint(v) => Self::try_from(v).map_err(|_| out_of_range(v.to_string())),
                        other => Err(mismatch(Self::kind(), &other)),
                    }
                }
            }
        )*
    };
}

impl_signed! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
}

impl_unsigned! {
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
}

///
/// Floats
///

impl FieldValue for f64 {
    fn kind() -> FieldKind {
        FieldKind::Float64
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as Self),
            Value::Uint(v) => Ok(v as Self),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

impl FieldValue for f32 {
    fn kind() -> FieldKind {
        FieldKind::Float32
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, CodecError> {
        f64::from_value(value).map(|v| v as Self)
    }
}

///
/// Structured leaves
///

impl FieldValue for Blob {
    fn kind() -> FieldKind {
        FieldKind::Blob
    }

    fn to_value(&self) -> Value {
        Value::Blob(self.0.clone())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Blob(v) => Ok(Self(v)),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(DateTime::UNIX_EPOCH),
            Value::Timestamp(v) => Ok(v),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

impl FieldValue for GeoPoint {
    fn kind() -> FieldKind {
        FieldKind::GeoPoint
    }

    fn to_value(&self) -> Value {
        Value::GeoPoint(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::GeoPoint(v) => Ok(v),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

impl FieldValue for Key {
    fn kind() -> FieldKind {
        FieldKind::Key
    }

    fn to_value(&self) -> Value {
        if self.is_zero() {
            Value::Null
        } else {
            Value::Key(self.clone())
        }
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Key(v) => Ok(v),
            Value::Text(v) => Ok(Self::parse(&v)?),
            other => Err(mismatch(FieldKind::Key, &other)),
        }
    }
}

impl FieldValue for SoftDelete {
    fn kind() -> FieldKind {
        FieldKind::SoftDelete
    }

    fn to_value(&self) -> Value {
        self.at().map_or(Value::Null, Value::Timestamp)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Timestamp(v) => Ok(Self::deleted_at(v)),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

///
/// Wrappers
///

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Optional(T::kind)
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }

    fn as_record(&self) -> Option<&dyn super::RecordAccess> {
        self.as_ref().and_then(T::as_record)
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn super::RecordAccess> {
        self.as_mut().and_then(T::as_record_mut)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::List(T::kind)
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(Self::kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reads_as_default() {
        assert_eq!(String::from_value(Value::Null).unwrap(), "");
        assert_eq!(i32::from_value(Value::Null).unwrap(), 0);
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
        assert!(Key::from_value(Value::Null).unwrap().is_zero());
    }

    #[test]
    fn key_rejects_non_key_values() {
        assert!(matches!(
            Key::from_value(Value::Int(3)),
            Err(CodecError::Mismatch {
                expected: "key",
                found: "int"
            })
        ));
        assert_eq!(
            Key::from_value(Value::Text("User,7".into())).unwrap(),
            Key::id_key("User", 7, None)
        );
    }

    #[test]
    fn integer_range_is_checked() {
        assert!(matches!(
            i8::from_value(Value::Int(300)),
            Err(CodecError::OutOfRange { target: "i8", .. })
        ));
        assert_eq!(u16::from_value(Value::Int(7)).unwrap(), 7);
        assert!(u32::from_value(Value::Int(-1)).is_err());
    }

    #[test]
    fn optional_kind_wraps_inner_kind() {
        assert_eq!(Option::<String>::kind(), FieldKind::Optional(String::kind));
        assert_eq!(Option::<String>::kind().base(), FieldKind::Text);
    }

    #[test]
    fn soft_delete_maps_unset_to_null() {
        assert_eq!(SoftDelete::default().to_value(), Value::Null);
    }

    #[test]
    fn list_converts_each_element() {
        let list = vec![1_i64, 2];

        assert_eq!(list.to_value(), Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(Vec::<i64>::from_value(list.to_value()).unwrap(), list);
    }
}
