use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use venuehub_types::{DocumentId, RawTimestamp};

/// A JSON field map as stored by the remote store.
pub type Fields = Map<String, Value>;

/// A raw document read from the remote store.
///
/// Field names are the store's wire names (camelCase). Timestamp fields may
/// still hold pending placeholders; see [`RawTimestamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Looks up a field by dotted path (e.g., "location.city").
    pub fn get(&self, path: &str) -> Option<&Value> {
        field_at(&self.fields, path)
    }

    /// Extract a string value by dotted path.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Extract a boolean value by dotted path.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Extract a numeric value by dotted path.
    pub fn get_number(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// Classifies a timestamp field without normalizing it.
    pub fn raw_timestamp(&self, path: &str) -> RawTimestamp {
        self.get(path)
            .map_or(RawTimestamp::Missing, RawTimestamp::from_json)
    }
}

/// Looks up a value in a field map by dotted path.
pub fn field_at<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes a value at a dotted path, creating intermediate objects and
/// replacing non-object intermediates.
pub fn set_field_at(fields: &mut Fields, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                set_field_at(inner, rest, value);
            }
        }
    }
}
