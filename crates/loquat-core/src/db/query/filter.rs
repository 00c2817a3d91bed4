use crate::{
    KEY_COLUMN, KEY_TAG, PARENT_COLUMN,
    db::{
        quote_ident,
        query::{FilterError, Operator},
    },
    key::Key,
    value::{Value, quote, render_literal},
};
use std::fmt;

/// Renderer chosen when the filter is built.
pub type RenderFn = fn(&Filter) -> Result<String, FilterError>;

///
/// Filter
///
/// One predicate on a storage column. Immutable once built; the renderer
/// is bound at construction from the field and operator.
///

#[derive(Clone)]
pub struct Filter {
    field: String,
    operator: Operator,
    value: Value,
    render: RenderFn,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        let field = field.into();
        let render: RenderFn = if field == KEY_TAG {
            render_key
        } else {
            match operator {
                Operator::Equal | Operator::NotEqual => render_equality,
                Operator::In | Operator::NotIn => render_membership,
                _ => render_comparison,
            }
        };

        Self {
            field,
            operator,
            value: value.into(),
            render,
        }
    }

    /// Build the filters for one `filter(field, op, value)` call.
    ///
    /// A list value under a non-membership operator yields one filter per
    /// element, AND-ed together. Key filters keep their list and render a
    /// set membership test instead.
    pub fn expand(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Vec<Self> {
        let field = field.into();
        match value.into() {
            Value::List(items) if !operator.is_membership() && field != KEY_TAG => items
                .into_iter()
                .map(|item| Self::new(field.clone(), operator, item))
                .collect(),
            value => vec![Self::new(field, operator, value)],
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Render the WHERE fragment.
    pub fn to_sql(&self) -> Result<String, FilterError> {
        (self.render)(self)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("field", &self.field)
            .field("operator", &self.operator)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.operator == other.operator && self.value == other.value
    }
}

///
/// RENDERERS
///

// render_equality
// NULL becomes IS NULL / IS NOT NULL
fn render_equality(filter: &Filter) -> Result<String, FilterError> {
    let column = quote_ident(&filter.field);
    if filter.value.is_null() {
        let test = if filter.operator == Operator::Equal {
            "IS NULL"
        } else {
            "IS NOT NULL"
        };
        return Ok(format!("{column} {test}"));
    }

    Ok(format!(
        "{column} {} {}",
        filter.operator.sql(),
        render_literal(&filter.value)?
    ))
}

fn render_comparison(filter: &Filter) -> Result<String, FilterError> {
    if filter.value.is_null() {
        return Err(FilterError::NullComparison {
            field: filter.field.clone(),
            operator: filter.operator.sql(),
        });
    }

    Ok(format!(
        "{} {} {}",
        quote_ident(&filter.field),
        filter.operator.sql(),
        render_literal(&filter.value)?
    ))
}

// render_membership
// duplicates collapse, first occurrence wins; an empty set matches nothing
fn render_membership(filter: &Filter) -> Result<String, FilterError> {
    let items = match &filter.value {
        Value::List(items) => items.as_slice(),
        value => std::slice::from_ref(value),
    };

    let literals = dedup(items.iter().map(render_literal).collect::<Result<Vec<_>, _>>()?);

    Ok(format!(
        "{} {} ({})",
        quote_ident(&filter.field),
        filter.operator.sql(),
        set_list(&literals)
    ))
}

fn render_key(filter: &Filter) -> Result<String, FilterError> {
    match (filter.operator, &filter.value) {
        (
            Operator::Equal | Operator::NotEqual | Operator::In | Operator::NotIn,
            Value::List(items),
        ) => {
            let negated = matches!(filter.operator, Operator::NotEqual | Operator::NotIn);
            let literals = items
                .iter()
                .map(|item| {
                    let key = key_of(item)?;
                    key.validate()?;
                    Ok(quote(&key.primary_key_string()))
                })
                .collect::<Result<Vec<_>, FilterError>>()?;

            Ok(format!(
                "CONCAT({},'/',{}) {} ({})",
                quote_ident(PARENT_COLUMN),
                quote_ident(KEY_COLUMN),
                if negated { "NOT IN" } else { "IN" },
                set_list(&dedup(literals))
            ))
        }
        (Operator::Equal | Operator::In, value) => key_pair_sql(&key_of(value)?),
        (Operator::NotEqual | Operator::NotIn, value) => {
            Ok(format!("NOT {}", key_pair_sql(&key_of(value)?)?))
        }
        (op, _) => Err(FilterError::KeyOperator { operator: op.sql() }),
    }
}

/// `($Key = 'leaf' AND $Parent = 'parent')` for a complete key.
pub fn key_pair_sql(key: &Key) -> Result<String, FilterError> {
    key.validate()?;

    Ok(format!(
        "({} = {} AND {} = {})",
        quote_ident(KEY_COLUMN),
        quote(&key.leaf_token()),
        quote_ident(PARENT_COLUMN),
        quote(&key.parent_string())
    ))
}

/// Rows whose parent chain is `key` itself or starts with `key/`.
pub fn ancestor_sql(key: &Key) -> Result<String, FilterError> {
    if !key.is_complete() {
        return Err(FilterError::IncompleteKey {
            key: key.to_string(),
        });
    }
    key.validate()?;

    let exact = escape_like(&key.to_string());
    let parent = quote_ident(PARENT_COLUMN);

    Ok(format!(
        "({parent} LIKE {} OR {parent} LIKE {})",
        quote(&exact),
        quote(&format!("{exact}/%"))
    ))
}

fn key_of(value: &Value) -> Result<Key, FilterError> {
    match value {
        Value::Key(key) => Ok(key.clone()),
        Value::Text(text) => Ok(Key::parse(text)?),
        other => Err(FilterError::InvalidValue {
            field: KEY_TAG.to_string(),
            reason: format!("expected a key, found {}", other.label()),
        }),
    }
}

// escape_like
// LIKE wildcards in key tokens match literally
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }

    out
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }

    out
}

fn set_list(literals: &[String]) -> String {
    if literals.is_empty() {
        "NULL".to_string()
    } else {
        literals.join(",")
    }
}
