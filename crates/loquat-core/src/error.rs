use crate::{
    config::ConfigError,
    db::{cursor::CursorError, executor::ExecutorError, migrate::MigrationError, query::FilterError},
    key::KeyError,
    model::ModelError,
    value::CodecError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured error carrying a stable classification and the subsystem it
/// was raised in. Execution failures keep the collaborator's error as source.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Underlying error, when one exists (executor failures, parse errors).
    #[source]
    pub source: Option<ExecutorError>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            source: None,
        }
    }

    /// Construct a configuration error (bad schema, bad operator, bad tag).
    pub(crate) fn configuration(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, origin, message)
    }

    /// Construct an encoding error for stored text that does not decode.
    pub(crate) fn encoding(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Encoding, origin, message)
    }

    /// Wrap a failure reported by the execution collaborator, unchanged.
    pub(crate) fn execution(err: ExecutorError) -> Self {
        Self {
            class: ErrorClass::Execution,
            origin: ErrorOrigin::Executor,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Construct a scope-guard error for an unscoped bulk mutation.
    pub(crate) fn scope_guard(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ScopeGuard, ErrorOrigin::Statement, message)
    }

    pub(crate) fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, origin, message)
    }

    pub(crate) fn invalid_input(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidInput, origin, message)
    }

    /// Construct a standardized entity-not-found error.
    pub fn not_found(entity: &str, key: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Session,
            format!("entity not found: {entity} ({key})"),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn is_scope_guard(&self) -> bool {
        matches!(self.class, ErrorClass::ScopeGuard)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        let class = match err {
            ModelError::PathMismatch { .. } => ErrorClass::Encoding,
            _ => ErrorClass::Configuration,
        };

        Self::new(class, ErrorOrigin::Model, err.to_string())
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        let class = match err {
            CodecError::NonFiniteFloat | CodecError::Unencodable { .. } => {
                ErrorClass::InvalidInput
            }
            _ => ErrorClass::Encoding,
        };

        Self::new(class, ErrorOrigin::Codec, err.to_string())
    }
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        let class = match err {
            KeyError::Malformed { .. } => ErrorClass::Encoding,
            _ => ErrorClass::InvalidInput,
        };

        Self::new(class, ErrorOrigin::Key, err.to_string())
    }
}

impl From<FilterError> for Error {
    fn from(err: FilterError) -> Self {
        let class = match err {
            FilterError::UnknownOperator { .. } | FilterError::IncompatibleOperator { .. } => {
                ErrorClass::Configuration
            }
            _ => ErrorClass::InvalidInput,
        };

        Self::new(class, ErrorOrigin::Filter, err.to_string())
    }
}

impl From<CursorError> for Error {
    fn from(err: CursorError) -> Self {
        Self::new(ErrorClass::InvalidInput, ErrorOrigin::Cursor, err.to_string())
    }
}

impl From<MigrationError> for Error {
    fn from(err: MigrationError) -> Self {
        Self::new(ErrorClass::Encoding, ErrorOrigin::Migration, err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Reserved names, bad tags, incompatible operators. Never retried.
    Configuration,
    /// Stored text that does not decode back to its declared type.
    Encoding,
    /// Raised by the execution collaborator and passed through.
    Execution,
    /// Bulk update/delete without any WHERE fragment.
    ScopeGuard,
    NotFound,
    Unsupported,
    InvalidInput,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Encoding => "encoding",
            Self::Execution => "execution",
            Self::ScopeGuard => "scope_guard",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::InvalidInput => "invalid_input",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Subsystem an error was raised in.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Model,
    Codec,
    Key,
    Filter,
    Statement,
    Cursor,
    Migration,
    Executor,
    Session,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Model => "model",
            Self::Codec => "codec",
            Self::Key => "key",
            Self::Filter => "filter",
            Self::Statement => "statement",
            Self::Cursor => "cursor",
            Self::Migration => "migration",
            Self::Executor => "executor",
            Self::Session => "session",
        };
        write!(f, "{label}")
    }
}
