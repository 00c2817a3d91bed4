//! Storage metadata derived from record types.

mod cache;
mod entity;
mod field;
mod path;
mod tag;


pub use cache::ModelCache;
pub use entity::{DerivedFields, EntityModel, describe};
pub use field::*;
pub use path::{read_path, slot_at, slot_at_mut, write_path};
pub use tag::Tag;

use thiserror::Error as ThisError;

///
/// ModelError
///
/// Raised while deriving an entity model. Apart from `PathMismatch`, every
/// variant is a configuration error reported before any statement runs.
///

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("{record}: name '{name}' is reserved")]
    ReservedName { record: &'static str, name: String },

    #[error("{record}: field '{field}' is tagged as the key but is not a Key")]
    InvalidPrimaryKey {
        record: &'static str,
        field: &'static str,
    },

    #[error("{record}: more than one field is tagged as the key")]
    DuplicatePrimaryKey { record: &'static str },

    #[error("{record}: more than one soft-delete marker")]
    DuplicateSoftDelete { record: &'static str },

    #[error("{record}: column '{name}' is declared twice")]
    DuplicateColumn { record: &'static str, name: String },

    #[error("{record}: field '{field}': {reason}")]
    UnsupportedFlatten {
        record: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("{record}: '{name}' is not a valid kind name")]
    InvalidName {
        record: &'static str,
        name: &'static str,
    },

    #[error("record has no field at path {path}")]
    PathMismatch { path: String },
}
