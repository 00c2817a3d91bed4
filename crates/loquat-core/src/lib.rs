//! Core runtime for Loquat: record traits, the value and key codecs, the
//! filter/statement compiler, pagination and schema migration.

extern crate self as loquat;

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod key;
pub mod model;
pub mod obs;
pub mod traits;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Column holding `$Parent + "/" + $Key`, the point-lookup column.
pub const PRIMARY_KEY_COLUMN: &str = "$PrimaryKey";

/// Column holding the leaf segment of a key (name, or decimal id).
pub const KEY_COLUMN: &str = "$Key";

/// Column holding the canonical string of the parent chain.
pub const PARENT_COLUMN: &str = "$Parent";

/// Column written by the soft-delete marker.
pub const SOFT_DELETE_COLUMN: &str = "DeletedAt";

/// Tag name that marks the hierarchical key field of an entity.
pub const KEY_TAG: &str = "__key__";

/// Column names no record field may claim.
pub const RESERVED_COLUMNS: [&str; 4] = [
    PRIMARY_KEY_COLUMN,
    PARENT_COLUMN,
    KEY_COLUMN,
    SOFT_DELETE_COLUMN,
];

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, sessions or codecs are re-exported here.
///

pub mod prelude {
    pub use crate::{
        key::Key,
        traits::{Entity, FieldValue, Record, RecordHooks},
        types::{Blob, GeoPoint, SoftDelete},
        value::Value,
    };
}
