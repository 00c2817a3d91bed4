use derive_more::{Deref, DerefMut, From};
use serde::{Deserialize, Serialize};

///
/// Blob
///
/// Opaque byte payload. Stored as standard base64 text in a `mediumblob`
/// column; `Vec<u8>` is not a storable field type on its own.
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, From, Hash, PartialEq, Serialize,
)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
