//! Opaque offset cursors for paginated reads.
//!
//! A cursor is the URL-safe base64 of a decimal row offset, padding
//! trimmed. It is a page offset, not a keyset position: rows inserted or
//! deleted ahead of it between calls shift the pages.


use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// CursorError
///

#[derive(Debug, ThisError)]
pub enum CursorError {
    #[error("cursor is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cursor does not hold a row offset")]
    InvalidOffset,
}

///
/// Cursor
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Cursor {
    offset: u64,
}

impl Cursor {
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Token handed to callers.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.offset.to_string())
    }

    /// Parse a token; the empty token is the first page.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let token = token.trim().trim_end_matches('=');
        if token.is_empty() {
            return Ok(Self::default());
        }

        let bytes = URL_SAFE_NO_PAD.decode(token)?;
        let offset = std::str::from_utf8(&bytes)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or(CursorError::InvalidOffset)?;

        Ok(Self { offset })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

///
/// PageRequest
///
/// Requested page size (zero means the configured default) and the cursor
/// returned by the previous page.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Cursor,
}

impl PageRequest {
    /// The first page.
    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self {
            limit,
            cursor: Cursor::new(0),
        }
    }

    /// The page at `token`, as returned by [`Page::next_token`].
    pub fn resume(limit: u32, token: &str) -> Result<Self, CursorError> {
        Ok(Self {
            limit,
            cursor: Cursor::decode(token)?,
        })
    }
}

///
/// Page
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,

    /// Cursor of the following page; `None` on the last page.
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with `LIMIT limit + 1`.
    #[must_use]
    pub fn from_overfetch(mut records: Vec<T>, offset: u64, limit: u32) -> Self {
        let limit_rows = usize::try_from(limit).unwrap_or(usize::MAX);
        if records.len() > limit_rows {
            records.truncate(limit_rows);
            return Self {
                records,
                next: Some(Cursor::new(offset.saturating_add(u64::from(limit)))),
            };
        }

        Self {
            records,
            next: None,
        }
    }

    /// Token of the following page; empty on the last page.
    #[must_use]
    pub fn next_token(&self) -> String {
        self.next.map(|c| c.encode()).unwrap_or_default()
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }
}
