use crate::{config::Backend, db::query::FilterError};
use std::{fmt, str::FromStr};

///
/// Operator
///
/// Comparison operators a filter may use. Every operator belongs to a
/// compatibility class; the relational-only ones are rejected at build time
/// for a hierarchical session.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Like,
    NotLike,
    In,
    NotIn,
}

///
/// Compatibility
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compatibility {
    Both,
    RelationalOnly,
}

impl Operator {
    pub const ALL: [Self; 10] = [
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::GreaterEqual,
        Self::LessThan,
        Self::LessEqual,
        Self::Like,
        Self::NotLike,
        Self::In,
        Self::NotIn,
    ];

    /// Parse the symbol accepted by `Query::filter` (`=`, `>=`, `like`, ...).
    pub fn parse(symbol: &str) -> Result<Self, FilterError> {
        let normalized = symbol
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        let op = match normalized.as_str() {
            "=" | "==" => Self::Equal,
            "!=" | "<>" => Self::NotEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessEqual,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            _ => {
                return Err(FilterError::UnknownOperator {
                    operator: symbol.to_string(),
                });
            }
        };

        Ok(op)
    }

    /// Parse an operator name of a JSON filter document (`$eq`, `$nin`, ...).
    pub fn from_json_name(name: &str) -> Result<Self, FilterError> {
        Self::ALL
            .into_iter()
            .find(|op| op.json_name() == name)
            .ok_or_else(|| FilterError::UnknownOperator {
                operator: name.to_string(),
            })
    }

    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    #[must_use]
    pub const fn json_name(self) -> &'static str {
        match self {
            Self::Equal => "$eq",
            Self::NotEqual => "$ne",
            Self::GreaterThan => "$gt",
            Self::GreaterEqual => "$gte",
            Self::LessThan => "$lt",
            Self::LessEqual => "$lte",
            Self::Like => "$like",
            Self::NotLike => "$nlike",
            Self::In => "$in",
            Self::NotIn => "$nin",
        }
    }

    #[must_use]
    pub const fn compatibility(self) -> Compatibility {
        match self {
            Self::Equal
            | Self::GreaterThan
            | Self::GreaterEqual
            | Self::LessThan
            | Self::LessEqual
            | Self::In => Compatibility::Both,
            Self::NotEqual | Self::Like | Self::NotLike | Self::NotIn => {
                Compatibility::RelationalOnly
            }
        }
    }

    #[must_use]
    pub const fn supports(self, backend: Backend) -> bool {
        match self.compatibility() {
            Compatibility::Both => true,
            Compatibility::RelationalOnly => matches!(backend, Backend::Relational),
        }
    }

    /// Reject the operator when `backend` cannot evaluate it.
    pub fn check(self, backend: Backend) -> Result<Self, FilterError> {
        if self.supports(backend) {
            Ok(self)
        } else {
            Err(FilterError::IncompatibleOperator {
                operator: self.sql(),
                backend,
            })
        }
    }

    /// Takes a set of values rather than a single one.
    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
