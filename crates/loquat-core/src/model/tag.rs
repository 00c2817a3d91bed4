use crate::KEY_TAG;

///
/// Tag
///
/// Parsed `#[loquat("Name,option,...")]` field tag. An empty name falls
/// back to the field identifier; `-` skips the field; `__key__` marks the
/// hierarchical key. Unknown options are ignored.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tag {
    pub name: String,
    pub field_name: &'static str,
    pub primary_key: bool,
    pub skip: bool,
    pub omit_empty: bool,
    pub no_index: bool,
    pub flatten: bool,

    /// Splice a nested record's columns without prefixing its name.
    pub embed: bool,
    pub nullable: bool,
    pub unique: bool,
    pub unsigned: bool,
    pub long_text: bool,
}

impl Tag {
    #[must_use]
    pub fn parse(field_name: &'static str, raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).unwrap_or_default();
        let mut parts = raw.split(',');
        let head = parts.next().map(str::trim).unwrap_or_default();

        let mut tag = Self {
            name: if head.is_empty() {
                field_name.to_string()
            } else {
                head.to_string()
            },
            field_name,
            skip: head == "-",
            primary_key: head == KEY_TAG,
            ..Self::default()
        };

        for option in parts {
            match option.trim().to_ascii_lowercase().as_str() {
                "omitempty" => tag.omit_empty = true,
                "noindex" => tag.no_index = true,
                "flatten" => tag.flatten = true,
                "embed" => tag.embed = true,
                "nullable" => tag.nullable = true,
                "unique" => tag.unique = true,
                "unsigned" => tag.unsigned = true,
                "longtext" => tag.long_text = true,
                KEY_TAG => tag.primary_key = true,
                _ => {}
            }
        }

        tag
    }
}
