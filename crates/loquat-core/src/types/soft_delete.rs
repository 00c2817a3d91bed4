use chrono::{DateTime, Utc};

///
/// SoftDelete
///
/// Deletion marker. An entity holding one gets a nullable `DeletedAt`
/// column, and its queries skip rows where that column is set.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SoftDelete(Option<DateTime<Utc>>);

impl SoftDelete {
    #[must_use]
    pub const fn deleted_at(at: DateTime<Utc>) -> Self {
        Self(Some(at))
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.0.is_some()
    }

    #[must_use]
    pub const fn at(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn restore(&mut self) {
        self.0 = None;
    }
}

impl From<Option<DateTime<Utc>>> for SoftDelete {
    fn from(at: Option<DateTime<Utc>>) -> Self {
        Self(at)
    }
}
