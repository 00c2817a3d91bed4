use crate::{
    model::Tag,
    traits::Record,
    types::GeoPoint,
    value::{CodecError, Value, encode},
};
use std::{fmt, mem};

/// Width of `varchar` text columns.
pub const TEXT_LENGTH: usize = 255;

/// Width of key and parent-chain columns.
pub const KEY_LENGTH: usize = 512;

/// Width of the leaf-token column.
pub const ID_LENGTH: usize = 50;

/// Default of non-null timestamp columns.
pub const ZERO_DATETIME: &str = "1970-01-01 00:00:00";

/// Lazily resolved kind; keeps recursive record types finite.
pub type KindFn = fn() -> FieldKind;

///
/// FieldKind
///
/// Declared type of a record field, as reported by `FieldValue::kind`.
///

#[derive(Clone, Copy)]
pub enum FieldKind {
    Text,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Blob,
    Timestamp,
    GeoPoint,
    Key,
    SoftDelete,
    Optional(KindFn),
    List(KindFn),
    Record(RecordRef),
}

impl FieldKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
            Self::GeoPoint => "geo point",
            Self::Key => "key",
            Self::SoftDelete => "soft delete",
            Self::Optional(_) => "optional",
            Self::List(_) => "list",
            Self::Record(r) => r.path,
        }
    }

    /// The kind with every `Optional` layer removed.
    #[must_use]
    pub fn base(&self) -> Self {
        let mut kind = *self;
        while let Self::Optional(inner) = kind {
            kind = inner();
        }

        kind
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Has a direct, non-recursive storage encoding.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !matches!(self.base(), Self::List(_) | Self::Record(_))
    }

    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::Uint16 | Self::Uint32 | Self::Uint64)
    }

    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
        )
    }
}

impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Optional(a), Self::Optional(b)) | (Self::List(a), Self::List(b)) => a() == b(),
            (Self::Record(a), Self::Record(b)) => a.path == b.path,
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optional(inner) => write!(f, "Optional({:?})", inner()),
            Self::List(inner) => write!(f, "List({:?})", inner()),
            Self::Record(r) => write!(f, "Record({})", r.path),
            other => f.write_str(other.label()),
        }
    }
}

///
/// RecordRef
/// Path and shape constructor of a nested record type.
///

#[derive(Clone, Copy, Debug)]
pub struct RecordRef {
    pub path: &'static str,
    pub shape: fn() -> RecordShape,
}

impl RecordRef {
    #[must_use]
    pub fn of<R: Record>() -> Self {
        Self {
            path: R::PATH,
            shape: R::shape,
        }
    }
}

///
/// RawField
///
/// One stored field as declared: identifier, raw tag and kind. Slot indices
/// of a record are positions in its shape's field list.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RawField {
    pub ident: &'static str,
    pub tag: Option<&'static str>,
    pub kind: FieldKind,
}

impl RawField {
    #[must_use]
    pub const fn new(ident: &'static str, tag: Option<&'static str>, kind: FieldKind) -> Self {
        Self { ident, tag, kind }
    }
}

///
/// RecordShape
///

#[derive(Clone, Debug, PartialEq)]
pub struct RecordShape {
    pub path: &'static str,
    pub fields: Vec<RawField>,
}

impl RecordShape {
    #[must_use]
    pub const fn new(path: &'static str, fields: Vec<RawField>) -> Self {
        Self { path, fields }
    }
}

///
/// Charset
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Charset {
    pub encoding: &'static str,
    pub collation: &'static str,
}

pub const UTF8: Charset = Charset {
    encoding: "utf8",
    collation: "utf8_unicode_ci",
};

pub const LATIN2: Charset = Charset {
    encoding: "latin2",
    collation: "latin2_general_ci",
};

///
/// ColumnDefault
///

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnDefault {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ColumnDefault {
    /// Literal used after `DEFAULT` in column definitions.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Text(text) => crate::value::quote(text),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format!("{v:.2}"),
            Self::Bool(v) => v.to_string(),
        }
    }
}

///
/// FieldSchema
///
/// Storage column description derived from a field's kind and tag.
///

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    pub data_type: String,
    pub default: Option<ColumnDefault>,
    pub escape: bool,
    pub unique: bool,
    pub unsigned: bool,
    pub nullable: bool,
    pub charset: Option<Charset>,
}

impl FieldSchema {
    /// Schema of a leaf kind, or `None` when the kind is composite.
    #[must_use]
    pub fn for_kind(kind: &FieldKind, tag: &Tag) -> Option<Self> {
        let base = kind.base();
        let mut schema = match base {
            FieldKind::Text => {
                let data_type = if tag.long_text {
                    "text".to_string()
                } else {
                    format!("varchar({TEXT_LENGTH})")
                };
                let default = (!tag.long_text).then(|| ColumnDefault::Text(String::new()));

                Self::column(data_type, default, true)
                    .unique(tag.unique)
                    .nullable(tag.nullable)
                    .charset(UTF8)
            }
            FieldKind::Bool => Self::column("boolean", Some(ColumnDefault::Bool(false)), false),
            FieldKind::Int8
            | FieldKind::Int16
            | FieldKind::Int32
            | FieldKind::Uint16
            | FieldKind::Uint32 => Self::column("int", Some(ColumnDefault::Int(0)), false)
                .unique(tag.unique)
                .unsigned(tag.unsigned || base.is_unsigned()),
            FieldKind::Int64 | FieldKind::Uint64 => {
                Self::column("bigint", Some(ColumnDefault::Int(0)), false)
                    .unique(tag.unique)
                    .unsigned(tag.unsigned || base.is_unsigned())
            }
            FieldKind::Float32 => Self::column("double(8,6)", Some(ColumnDefault::Float(0.0)), false)
                .unique(tag.unique)
                .unsigned(tag.unsigned),
            FieldKind::Float64 => {
                Self::column("decimal(10,6)", Some(ColumnDefault::Float(0.0)), false)
                    .unique(tag.unique)
                    .unsigned(tag.unsigned)
            }
            FieldKind::Blob => Self::column("mediumblob", None, true).unique(tag.unique),
            FieldKind::SoftDelete => Self::column("datetime", None, true).nullable(true),
            FieldKind::Timestamp => Self::column(
                "datetime",
                Some(ColumnDefault::Text(ZERO_DATETIME.to_string())),
                true,
            ),
            FieldKind::Key => Self::column(format!("varchar({KEY_LENGTH})"), None, true)
                .unique(tag.unique)
                .nullable(true)
                .charset(LATIN2),
            FieldKind::GeoPoint => {
                let zero = encode(&FieldKind::GeoPoint, &Value::GeoPoint(GeoPoint::default()))
                    .ok()
                    .flatten()
                    .map(ColumnDefault::Text);

                Self::column("varchar(50)", zero, true).charset(LATIN2)
            }
            FieldKind::List(_) | FieldKind::Record(_) | FieldKind::Optional(_) => return None,
        };

        if kind.is_optional() {
            schema.nullable = true;
        }

        Some(schema)
    }

    /// Schema of a composite field stored as one JSON text column.
    #[must_use]
    pub fn composite() -> Self {
        Self::column("text", None, true).nullable(true).charset(UTF8)
    }

    pub(crate) fn column(
        data_type: impl Into<String>,
        default: Option<ColumnDefault>,
        escape: bool,
    ) -> Self {
        Self {
            data_type: data_type.into(),
            default,
            escape,
            unique: false,
            unsigned: false,
            nullable: false,
            charset: None,
        }
    }

    pub(crate) const fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub(crate) const fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    pub(crate) const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub(crate) const fn charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Column definition as used by CREATE TABLE and ALTER TABLE.
    #[must_use]
    pub fn column_sql(&self, name: &str) -> String {
        let mut props = Vec::new();
        if self.unsigned {
            props.push("UNSIGNED".to_string());
        }
        if let Some(charset) = self.charset {
            props.push(format!(
                "CHARACTER SET `{}` COLLATE `{}`",
                charset.encoding, charset.collation
            ));
        }
        if !self.nullable {
            props.push("NOT NULL".to_string());
            if let Some(default) = &self.default {
                props.push(format!("DEFAULT {}", default.to_sql()));
            }
        }
        if self.unique {
            props.push("UNIQUE".to_string());
        }

        let mut sql = format!("`{name}` {}", self.data_type);
        if !props.is_empty() {
            sql.push(' ');
            sql.push_str(&props.join(" "));
        }

        sql
    }
}

///
/// FieldModel
///
/// One stored column of an entity: storage name, declaring path and codec.
/// Immutable once derived.
///

#[derive(Clone, Debug, PartialEq)]
pub struct FieldModel {
    /// Storage column name (dot-joined for flattened sub-fields).
    pub name: String,
    pub field_name: &'static str,

    /// Slot indices from the entity down to the field.
    pub path: Vec<usize>,
    pub primary_key: bool,
    pub omit_empty: bool,
    pub kind: FieldKind,

    /// `None` only for the hierarchical key field.
    pub schema: Option<FieldSchema>,
}

impl FieldModel {
    #[must_use]
    pub fn nullable(&self) -> bool {
        self.schema.as_ref().is_some_and(|s| s.nullable)
    }

    /// Text written for `value`, `None` meaning SQL NULL.
    ///
    /// Empty text is written as NULL only when the column is nullable;
    /// otherwise it is stored literally.
    pub fn storage_text(&self, value: &Value) -> Result<Option<String>, CodecError> {
        let text = encode(&self.kind, value)?;

        Ok(match text {
            Some(text) if text.is_empty() && self.nullable() => None,
            other => other,
        })
    }
}
