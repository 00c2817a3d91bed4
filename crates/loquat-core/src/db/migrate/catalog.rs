use crate::{
    db::{executor::Row, migrate::MigrationError},
    model::{ColumnDefault, FieldSchema},
};

const INTEGER_TYPES: [&str; 5] = ["tinyint", "smallint", "mediumint", "int", "bigint"];

///
/// CatalogColumn
///
/// One row of `INFORMATION_SCHEMA.COLUMNS`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CatalogColumn {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub unique: bool,
    pub position: u32,
}

impl CatalogColumn {
    pub fn from_row(row: &Row) -> Result<Self, MigrationError> {
        let required = |column: &'static str| {
            text(row, column)?.ok_or(MigrationError::MissingColumn { column })
        };

        let position = match text(row, "ORDINAL_POSITION")? {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MigrationError::InvalidText {
                    column: "ORDINAL_POSITION",
                    text: raw.to_string(),
                })?,
            None => 0,
        };

        Ok(Self {
            name: required("COLUMN_NAME")?.to_string(),
            column_type: required("COLUMN_TYPE")?.to_string(),
            nullable: text(row, "IS_NULLABLE")?.is_some_and(|v| v.eq_ignore_ascii_case("YES")),
            default: text(row, "COLUMN_DEFAULT")?.map(str::to_string),
            charset: text(row, "CHARACTER_SET_NAME")?.map(str::to_string),
            collation: text(row, "COLLATION_NAME")?.map(str::to_string),
            unique: text(row, "COLUMN_KEY")?.is_some_and(|v| v.eq_ignore_ascii_case("UNI")),
            position,
        })
    }

    /// The live column already has the definition `schema` would create.
    #[must_use]
    pub fn matches(&self, schema: &FieldSchema) -> bool {
        let live_type = self.column_type.to_ascii_lowercase();
        let live_unsigned = live_type.contains("unsigned");
        let live_base = live_type
            .replace("unsigned", "")
            .replace("zerofill", "")
            .trim()
            .to_string();

        normalize_type(&live_base) == normalize_type(&schema.data_type)
            && live_unsigned == schema.unsigned
            && self.nullable == schema.nullable
            && self.unique == schema.unique
            && self.default_matches(schema)
            && same_charset(self.charset.as_deref(), schema.charset.map(|c| c.encoding))
            && same_charset(self.collation.as_deref(), schema.charset.map(|c| c.collation))
    }

    // default_matches
    // defaults only apply to NOT NULL columns
    fn default_matches(&self, schema: &FieldSchema) -> bool {
        if schema.nullable {
            return true;
        }
        let live = self
            .default
            .as_deref()
            .map(unquote)
            .filter(|v| !v.eq_ignore_ascii_case("NULL"));

        match (&schema.default, live) {
            (None, None) => true,
            (None, Some(_)) | (Some(_), None) => false,
            (Some(ColumnDefault::Text(want)), Some(live)) => want == live,
            (Some(ColumnDefault::Bool(want)), Some(live)) => {
                let live = matches!(live.to_ascii_lowercase().as_str(), "1" | "true");
                *want == live
            }
            #[allow(clippy::cast_precision_loss)]
            (Some(ColumnDefault::Int(want)), Some(live)) => {
                live.parse::<f64>().is_ok_and(|v| v == *want as f64)
            }
            (Some(ColumnDefault::Float(want)), Some(live)) => {
                live.parse::<f64>().is_ok_and(|v| (v - want).abs() < f64::EPSILON)
            }
        }
    }
}

fn text<'r>(row: &'r Row, column: &'static str) -> Result<Option<&'r str>, MigrationError> {
    match row.get(column).flatten() {
        None => Ok(None),
        Some(bytes) => std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|_| MigrationError::InvalidText {
                column,
                text: String::from_utf8_lossy(bytes).into_owned(),
            }),
    }
}

// normalize_type
// integer display widths are cosmetic, except tinyint(1) which is boolean
fn normalize_type(data_type: &str) -> String {
    let lower = data_type.trim().to_ascii_lowercase();
    if matches!(lower.as_str(), "boolean" | "bool" | "tinyint(1)") {
        return "tinyint(1)".to_string();
    }

    let base = lower.split('(').next().unwrap_or_default().trim();
    if INTEGER_TYPES.contains(&base) {
        return base.to_string();
    }

    lower.replace(' ', "")
}

// unquote
// servers differ on whether text defaults come back quoted
fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

// same_charset
// utf8mb3 is reported for what was declared as utf8
fn same_charset(live: Option<&str>, want: Option<&str>) -> bool {
    let normalize = |v: &str| v.to_ascii_lowercase().replace("utf8mb3", "utf8");

    match (live, want) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(live), Some(want)) => normalize(live) == normalize(want),
    }
}
