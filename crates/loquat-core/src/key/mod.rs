//! Hierarchical keys and their flat relational encoding.
//!
//! A key is a chain of `(kind, id-or-name)` segments. Its canonical string
//! renders each segment as `kind,token` and joins them root-to-leaf with `/`.
//! Relationally a key spreads over three columns: `$Key` (leaf token),
//! `$Parent` (canonical parent chain, empty for a root) and `$PrimaryKey`
//! (`$Parent + "/" + $Key`).


use rand::Rng;
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

/// Lower bound (inclusive) of generated ids.
pub const MIN_GENERATED_ID: i64 = 100_000_000_000;

/// Upper bound (exclusive) of generated ids.
pub const MAX_GENERATED_ID: i64 = i64::MAX;

const SEGMENT_DELIMITER: char = ',';
const PATH_DELIMITER: char = '/';

///
/// KeyError
///

#[derive(Debug, ThisError)]
pub enum KeyError {
    #[error("malformed key '{text}'")]
    Malformed { text: String },

    #[error("key token '{token}' contains a reserved delimiter (',' or '/')")]
    Delimiter { token: String },

    #[error("key name '{name}' would decode as a numeric id")]
    NumericName { name: String },

    #[error("key segment has an empty kind")]
    EmptyKind,

    #[error("key '{key}' is incomplete")]
    Incomplete { key: String },
}

///
/// Key
///
/// One segment plus a shared reference to its parent chain. A segment
/// carries either a non-zero id or a non-empty name, never both.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Key {
    kind: String,
    id: i64,
    name: String,
    parent: Option<Arc<Key>>,
}

impl Key {
    #[must_use]
    pub fn id_key(kind: impl Into<String>, id: i64, parent: Option<Self>) -> Self {
        Self {
            kind: kind.into(),
            id,
            name: String::new(),
            parent: parent.map(Arc::new),
        }
    }

    #[must_use]
    pub fn name_key(kind: impl Into<String>, name: impl Into<String>, parent: Option<Self>) -> Self {
        Self {
            kind: kind.into(),
            id: 0,
            name: name.into(),
            parent: parent.map(Arc::new),
        }
    }

    /// A key with neither id nor name, to be completed by the store.
    #[must_use]
    pub fn incomplete(kind: impl Into<String>, parent: Option<Self>) -> Self {
        Self::id_key(kind, 0, parent)
    }

    /// A key under `parent` with a random id from
    /// `[MIN_GENERATED_ID, MAX_GENERATED_ID)`.
    ///
    /// Draws from the thread-local generator; no counter is shared, so two
    /// callers may (rarely) collide and the uniqueness constraint decides.
    #[must_use]
    pub fn generated(kind: impl Into<String>, parent: Option<Self>) -> Self {
        let id = rand::thread_rng().gen_range(MIN_GENERATED_ID..MAX_GENERATED_ID);

        Self::id_key(kind, id, parent)
    }

    /// Key for a record about to be written to `kind`.
    ///
    /// A complete parent of the same kind is adopted as the record's own key;
    /// any other parent becomes the ancestor of a freshly generated key.
    #[must_use]
    pub fn for_new_record(kind: &str, parent: Option<&Self>) -> Self {
        match parent {
            Some(parent) if parent.kind == kind && (parent.id > 0 || !parent.name.is_empty()) => {
                parent.clone()
            }
            _ => Self::generated(kind, parent.cloned()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        (!self.name.is_empty()).then_some(self.name.as_str())
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// No kind, no id, no name and no parent: the "unset" key.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.kind.is_empty() && self.id == 0 && self.name.is_empty() && self.parent.is_none()
    }

    /// The leaf segment carries an id or a name.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.id != 0 || !self.name.is_empty()
    }

    /// Value of the `$Key` column: the name if present, else the decimal id.
    #[must_use]
    pub fn leaf_token(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }

    /// Value of the `$Parent` column; empty for a root key.
    #[must_use]
    pub fn parent_string(&self) -> String {
        self.parent().map(ToString::to_string).unwrap_or_default()
    }

    /// Value of the `$PrimaryKey` column.
    #[must_use]
    pub fn primary_key_string(&self) -> String {
        format!("{}{PATH_DELIMITER}{}", self.parent_string(), self.leaf_token())
    }

    /// Segments ordered root first.
    #[must_use]
    pub fn chain(&self) -> Vec<&Self> {
        let mut chain = Vec::new();
        let mut cursor = Some(self);
        while let Some(key) = cursor {
            chain.push(key);
            cursor = key.parent();
        }
        chain.reverse();

        chain
    }

    /// Number of segments in the chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain().len()
    }

    /// True when `self` is a proper ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        let mut cursor = other.parent();
        while let Some(key) = cursor {
            if key == self {
                return true;
            }
            cursor = key.parent();
        }

        false
    }

    /// Check that every segment is complete and decodes back to itself.
    pub fn validate(&self) -> Result<(), KeyError> {
        for segment in self.chain() {
            if segment.kind.is_empty() {
                return Err(KeyError::EmptyKind);
            }
            check_token(&segment.kind)?;
            if !segment.is_complete() {
                return Err(KeyError::Incomplete {
                    key: self.to_string(),
                });
            }
            if !segment.name.is_empty() {
                check_token(&segment.name)?;
                if segment.name.parse::<i64>().is_ok() {
                    return Err(KeyError::NumericName {
                        name: segment.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse a canonical key string. Leading and trailing `/` are tolerated;
    /// whitespace is part of the tokens and is kept as is.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let trimmed = text.trim_matches(PATH_DELIMITER);
        if trimmed.is_empty() {
            return Err(malformed(text));
        }

        let mut key: Option<Self> = None;
        for piece in trimmed.split(PATH_DELIMITER) {
            let (kind, token) = piece
                .split_once(SEGMENT_DELIMITER)
                .filter(|(kind, token)| {
                    !kind.is_empty() && !token.is_empty() && !token.contains(SEGMENT_DELIMITER)
                })
                .ok_or_else(|| malformed(text))?;
            key = Some(segment(kind, token, key));
        }

        let key = key.ok_or_else(|| malformed(text))?;
        if !key.chain().iter().all(|segment| segment.is_complete()) {
            return Err(malformed(text));
        }

        Ok(key)
    }

    /// Rebuild a key from its `$Key` and `$Parent` columns.
    ///
    /// `kind` is the table the row was read from; the leaf token becomes an
    /// id when it parses as an integer, a name otherwise. Neither column is
    /// trimmed, so names with surrounding whitespace come back unchanged.
    pub fn from_columns(kind: &str, leaf: &str, parent: &str) -> Result<Self, KeyError> {
        if leaf.is_empty() {
            return Err(malformed(leaf));
        }

        let parent = if parent.trim_matches(PATH_DELIMITER).is_empty() {
            None
        } else {
            Some(Self::parse(parent)?)
        };

        let key = segment(kind, leaf, parent);
        if !key.is_complete() {
            return Err(malformed(leaf));
        }

        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.chain().into_iter().enumerate() {
            if i > 0 {
                write!(f, "{PATH_DELIMITER}")?;
            }
            write!(
                f,
                "{}{SEGMENT_DELIMITER}{}",
                segment.kind,
                segment.leaf_token()
            )?;
        }

        Ok(())
    }
}

impl std::str::FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// segment
// integer tokens become ids, everything else a name
fn segment(kind: &str, token: &str, parent: Option<Key>) -> Key {
    match token.parse::<i64>() {
        Ok(id) => Key::id_key(kind, id, parent),
        Err(_) => Key::name_key(kind, token, parent),
    }
}

fn check_token(token: &str) -> Result<(), KeyError> {
    if token.contains([SEGMENT_DELIMITER, PATH_DELIMITER]) {
        return Err(KeyError::Delimiter {
            token: token.to_string(),
        });
    }

    Ok(())
}

fn malformed(text: &str) -> KeyError {
    KeyError::Malformed {
        text: text.to_string(),
    }
}
