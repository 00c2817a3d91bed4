use crate::{
    KEY_TAG, RESERVED_COLUMNS, SOFT_DELETE_COLUMN,
    model::{FieldKind, FieldModel, FieldSchema, ModelError, RecordShape, Tag},
    traits::{Entity, HookBindings},
};
use std::collections::{HashSet, VecDeque};

///
/// EntityModel
///
/// Storage metadata of one entity type: its ordered columns, the optional
/// key and soft-delete fields, and the hook pair bound at derivation.
///

#[derive(Clone, Debug)]
pub struct EntityModel {
    /// Fully-qualified type path; the cache key.
    pub path: &'static str,

    /// Kind and default table name.
    pub name: &'static str,
    pub fields: Vec<FieldModel>,
    pub primary_key: Option<FieldModel>,
    pub soft_delete: Option<FieldModel>,
    pub hooks: HookBindings,
}

impl EntityModel {
    /// Walk the entity's shape and build its model.
    pub fn derive<E: Entity>() -> Result<Self, ModelError> {
        validate_name(E::PATH, E::NAME)?;
        let DerivedFields {
            primary_key,
            soft_delete,
            fields,
        } = describe(E::shape())?;

        Ok(Self {
            path: E::PATH,
            name: E::NAME,
            fields,
            primary_key,
            soft_delete,
            hooks: E::hooks(),
        })
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Ordinary columns followed by the soft-delete column, if any.
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldModel> {
        self.fields.iter().chain(self.soft_delete.iter())
    }
}

///
/// DerivedFields
///

#[derive(Clone, Debug, Default)]
pub struct DerivedFields {
    pub primary_key: Option<FieldModel>,
    pub soft_delete: Option<FieldModel>,
    pub fields: Vec<FieldModel>,
}

// Scan
// one pending record in the breadth-first walk
struct Scan {
    shape: RecordShape,
    names: Vec<String>,
    path: Vec<usize>,
    lineage: Vec<&'static str>,
}

/// Breadth-first walk of a record shape into a flat, path-ordered column
/// list.
///
/// Flattened records splice their columns in under a dot-joined prefix,
/// embedded records splice them in without one, and every other composite
/// field becomes a single JSON column.
pub fn describe(shape: RecordShape) -> Result<DerivedFields, ModelError> {
    let record = shape.path;
    let mut derived = DerivedFields::default();
    let mut queue = VecDeque::from([Scan {
        lineage: vec![shape.path],
        shape,
        names: Vec::new(),
        path: Vec::new(),
    }]);

    while let Some(scan) = queue.pop_front() {
        for (index, raw) in scan.shape.fields.iter().enumerate() {
            let tag = Tag::parse(raw.ident, raw.tag);
            if tag.skip {
                continue;
            }
            if is_reserved(&tag.name) {
                return Err(ModelError::ReservedName {
                    record,
                    name: tag.name,
                });
            }

            let mut names = scan.names.clone();
            names.push(tag.name.clone());
            let mut path = scan.path.clone();
            path.push(index);
            let base = raw.kind.base();

            if tag.primary_key {
                if !matches!(base, FieldKind::Key) {
                    return Err(ModelError::InvalidPrimaryKey {
                        record,
                        field: raw.ident,
                    });
                }
                if derived.primary_key.is_some() {
                    return Err(ModelError::DuplicatePrimaryKey { record });
                }
                derived.primary_key = Some(FieldModel {
                    name: KEY_TAG.to_string(),
                    field_name: raw.ident,
                    path,
                    primary_key: true,
                    omit_empty: tag.omit_empty,
                    kind: raw.kind,
                    schema: None,
                });
                continue;
            }

            if matches!(base, FieldKind::SoftDelete) {
                if derived.soft_delete.is_some() {
                    return Err(ModelError::DuplicateSoftDelete { record });
                }
                derived.soft_delete = Some(FieldModel {
                    name: SOFT_DELETE_COLUMN.to_string(),
                    field_name: raw.ident,
                    path,
                    primary_key: false,
                    omit_empty: tag.omit_empty,
                    kind: raw.kind,
                    schema: FieldSchema::for_kind(&raw.kind, &tag),
                });
                continue;
            }

            let unsupported = |reason: &'static str| ModelError::UnsupportedFlatten {
                record,
                field: raw.ident,
                reason,
            };

            if tag.flatten || tag.embed {
                match (base, raw.kind.is_optional()) {
                    (FieldKind::List(elem), _) if tag.flatten => {
                        if !elem().is_leaf() {
                            return Err(unsupported("collections of records cannot be flattened"));
                        }
                    }
                    (FieldKind::Record(nested), false) => {
                        if scan.lineage.contains(&nested.path) {
                            return Err(unsupported("recursive records cannot be flattened"));
                        }
                        let mut lineage = scan.lineage.clone();
                        lineage.push(nested.path);
                        queue.push_back(Scan {
                            shape: (nested.shape)(),
                            names: if tag.embed { scan.names.clone() } else { names },
                            path,
                            lineage,
                        });
                        continue;
                    }
                    (FieldKind::Record(_), true) => {
                        return Err(unsupported("optional records cannot be flattened"));
                    }
                    _ => return Err(unsupported("only records can be flattened or embedded")),
                }
            }

            let schema = FieldSchema::for_kind(&raw.kind, &tag).unwrap_or_else(FieldSchema::composite);
            derived.fields.push(FieldModel {
                name: names.join("."),
                field_name: raw.ident,
                path,
                primary_key: false,
                omit_empty: tag.omit_empty,
                kind: raw.kind,
                schema: Some(schema),
            });
        }
    }

    derived.fields.sort_by(|a, b| a.path.cmp(&b.path));

    let mut seen = HashSet::new();
    for field in &derived.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ModelError::DuplicateColumn {
                record,
                name: field.name.clone(),
            });
        }
    }

    Ok(derived)
}

// is_reserved
// reserved column names are matched case-insensitively
fn is_reserved(name: &str) -> bool {
    let name = name.trim();
    RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

fn validate_name(record: &'static str, name: &'static str) -> Result<(), ModelError> {
    if name.is_empty() || name.contains(['`', ',', '/']) {
        return Err(ModelError::InvalidName { record, name });
    }

    Ok(())
}
