//! ## Crate layout
//! - `config`: session configuration, loadable from TOML.
//! - `db`: filter/statement compilation, pagination, migration and the session.
//! - `key`: hierarchical keys and their three-column relational encoding.
//! - `model`: storage metadata derived from record types.
//! - `obs`: metrics sink and the in-memory statement counters.
//! - `traits` / `types` / `value`: record description, storable leaves and
//!   the value codec.
//!
//! Derived code refers to this crate as `::loquat`, so depend on it under
//! that name.

pub use loquat_core::{
    KEY_COLUMN, KEY_TAG, PARENT_COLUMN, PRIMARY_KEY_COLUMN, RESERVED_COLUMNS, SOFT_DELETE_COLUMN,
    config, db, error, key, model, obs, traits, types, value,
};
pub use loquat_derive::{Entity, Record};

pub use config::Config;
pub use db::{Executor, Query, Session};
pub use error::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// Domain vocabulary plus the derives; using _ brings traits into scope
/// without name conflicts.
///

pub mod prelude {
    pub use crate::{
        db::{Filter, Operator, Page, PageRequest},
        key::Key,
        traits::{Entity as _, FieldValue as _, Record as _, RecordHooks},
        types::{Blob, GeoPoint, SoftDelete},
        value::Value,
    };
    pub use loquat_derive::{Entity, Record};
}
