//! Session configuration, loadable from TOML.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Rows returned by one page when the caller asks for none.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound on the rows of one page.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Upper bound on the records of one multi-row insert.
pub const MAX_BATCH_SIZE: usize = 500;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

///
/// Backend
///
/// Store the session compiles for. Operator availability depends on it.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Relational,
    Hierarchical,
}

///
/// Config
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database name used to qualify tables and to read the column catalog.
    pub schema: String,
    pub backend: Backend,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_batch_size: usize,

    /// Trace every compiled statement at debug level.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: String::new(),
            backend: Backend::Relational,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_batch_size: MAX_BATCH_SIZE,
            debug: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.contains('`') {
            return Err(ConfigError::Invalid(format!(
                "schema name '{}' contains a backtick",
                self.schema
            )));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::Invalid("page sizes must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid("max_batch_size must be positive".into()));
        }

        Ok(())
    }

    /// Clamp a requested page size: zero falls back to the default, anything
    /// above the maximum is capped.
    #[must_use]
    pub const fn page_size(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_page_size
        } else if requested > self.max_page_size {
            self.max_page_size
        } else {
            requested
        }
    }
}
