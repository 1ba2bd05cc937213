use crate::document::{Fields, field_at};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name the store stamps on create.
pub const CREATED_AT: &str = "createdAt";
/// Field name the store stamps on every write.
pub const UPDATED_AT: &str = "updatedAt";

/// Describes a collection's structure for validation, decoding and search.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub collection: &'static str,
    pub fields: Vec<FieldSpec>,
    pub order_by: OrderBy,
}

impl EntitySchema {
    /// A schema with the two system timestamps, ordered newest first.
    pub fn new(collection: &'static str) -> Self {
        Self {
            collection,
            fields: vec![FieldSpec::timestamp(CREATED_AT), FieldSpec::timestamp(UPDATED_AT)],
            order_by: OrderBy::desc(CREATED_AT),
        }
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Paths that must be present and non-blank on create.
    pub fn required_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.path)
    }

    /// Paths matched by free-text search.
    pub fn searchable_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.searchable).map(|f| f.path)
    }

    /// Paths holding timestamps that must be normalized on decode.
    pub fn timestamp_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Timestamp)
            .map(|f| f.path)
    }

    /// Checks that every required path holds a non-blank value.
    pub fn check_required(&self, fields: &Fields) -> Result<(), String> {
        let missing: Vec<&str> = self
            .required_paths()
            .filter(|path| is_blank(field_at(fields, path)))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required field(s): {}", missing.join(", ")))
        }
    }

    /// Checks that a patch does not clear a required path.
    ///
    /// A patch key replaces the whole value at that key, so a key that is a
    /// prefix of a required path (`location` for `location.city`) must
    /// carry an object that still holds the required value.
    pub fn check_patch_required(&self, fields: &Fields) -> Result<(), String> {
        for path in self.required_paths() {
            let cleared = match fields.get(path) {
                Some(value) => is_blank(Some(value)),
                None => path.match_indices('.').any(|(at, _)| {
                    fields.get(&path[..at]).is_some_and(|value| match value {
                        Value::Object(inner) => is_blank(field_at(inner, &path[at + 1..])),
                        _ => true,
                    })
                }),
            };
            if cleared {
                return Err(format!("required field `{path}` cannot be cleared"));
            }
        }
        Ok(())
    }

    /// Checks that every declared field present in `fields` has the declared
    /// JSON type. Nulls are accepted for optional fields.
    pub fn check_types(&self, fields: &Fields) -> Result<(), String> {
        for field in &self.fields {
            let Some(value) = lookup(fields, field.path) else {
                continue;
            };
            if value.is_null() && !field.required {
                continue;
            }
            if !field.kind.accepts(value) {
                return Err(format!(
                    "field `{}` must be {}, got {}",
                    field.path,
                    field.kind.describe(),
                    value
                ));
            }
        }
        Ok(())
    }

    /// Returns true if any searchable field contains `needle_lower`.
    ///
    /// `needle_lower` must already be lowercased.
    pub fn matches_search(&self, fields: &Fields, needle_lower: &str) -> bool {
        self.searchable_paths().any(|path| match field_at(fields, path) {
            Some(Value::String(s)) => s.to_lowercase().contains(needle_lower),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|s| s.to_lowercase().contains(needle_lower)),
            _ => false,
        })
    }
}

/// Looks a path up either as a literal dotted key (patch form) or nested.
fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    fields.get(path).or_else(|| field_at(fields, path))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dotted path (e.g., "location.city").
    pub path: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub searchable: bool,
}

impl FieldSpec {
    fn simple(path: &'static str, kind: FieldKind, searchable: bool) -> Self {
        Self {
            path,
            kind,
            required: false,
            searchable,
        }
    }

    /// Shorthand for a text field.
    pub fn text(path: &'static str, searchable: bool) -> Self {
        Self::simple(path, FieldKind::Text, searchable)
    }

    /// Shorthand for a string array field (always searchable).
    pub fn tags(path: &'static str) -> Self {
        Self::simple(path, FieldKind::Tags, true)
    }

    /// Shorthand for a timestamp field.
    pub fn timestamp(path: &'static str) -> Self {
        Self::simple(path, FieldKind::Timestamp, false)
    }

    /// Shorthand for a numeric field.
    pub fn number(path: &'static str) -> Self {
        Self::simple(path, FieldKind::Number, false)
    }

    /// Shorthand for a boolean field.
    pub fn bool(path: &'static str) -> Self {
        Self::simple(path, FieldKind::Bool, false)
    }

    /// Shorthand for a nested object field.
    pub fn object(path: &'static str) -> Self {
        Self::simple(path, FieldKind::Object, false)
    }

    /// Marks the field as required on create.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// The JSON type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Tags,
    Timestamp,
    Number,
    Bool,
    Object,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Tags => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            // Timestamps arrive in many shapes; the normalizer handles them.
            Self::Timestamp => true,
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Text => "a string",
            Self::Tags => "an array of strings",
            Self::Timestamp => "a timestamp",
            Self::Number => "a number",
            Self::Bool => "a boolean",
            Self::Object => "an object",
        }
    }
}

/// Ordering applied to collection queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}
