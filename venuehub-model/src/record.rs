use crate::document::{Document, Fields, set_field_at};
use crate::schema::{CREATED_AT, EntitySchema, UPDATED_AT};
use crate::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use venuehub_types::{DocumentId, Timestamp};

/// A typed entity kind backed by one remote collection.
///
/// Implementors are plain data structs whose serde representation uses the
/// store's wire names, with `id` and canonical `createdAt` / `updatedAt`.
/// Everything else (validation, search, filtering) is generic over this
/// trait, so adding a kind means adding a struct and a schema.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// The kind's schema (collection, declared fields, default order).
    fn schema() -> &'static EntitySchema;

    fn id(&self) -> &DocumentId;

    fn created_at(&self) -> Timestamp;

    fn updated_at(&self) -> Timestamp;

    /// Whether the entity counts for "active" listings.
    fn is_active(&self) -> bool {
        true
    }

    /// The value category-filtered listings match against.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Kind-specific checks run after the schema checks, before any remote
    /// call. `is_create` distinguishes a full draft from a partial patch.
    fn validate(fields: &Fields, is_create: bool) -> Result<(), String> {
        let _ = (fields, is_create);
        Ok(())
    }

    /// Case-insensitive substring match over the schema's searchable fields.
    /// `needle_lower` must already be lowercased.
    fn matches_search(&self, needle_lower: &str) -> bool {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => Self::schema().matches_search(&fields, needle_lower),
            _ => false,
        }
    }
}

/// Decodes a raw document into its typed record.
///
/// Timestamp fields are normalized to canonical milliseconds first. The
/// system timestamps are always filled (a pending value takes its announced
/// commit time, a missing one becomes "now"); other declared timestamps are only normalized when present.
pub fn decode<R: Record>(doc: &Document) -> ModelResult<R> {
    let schema = R::schema();
    let mut fields = doc.fields.clone();
    for path in schema.timestamp_paths() {
        let system = path == CREATED_AT || path == UPDATED_AT;
        if !system && doc.get(path).is_none_or(Value::is_null) {
            continue;
        }
        let ts = Timestamp::normalize(&doc.raw_timestamp(path));
        set_field_at(&mut fields, path, Value::from(ts.as_millis()));
    }
    fields.insert("id".to_string(), Value::String(doc.id.to_string()));

    serde_json::from_value(Value::Object(fields)).map_err(|source| ModelError::Malformed {
        collection: schema.collection,
        id: doc.id.to_string(),
        source,
    })
}

/// Keys the store and the service manage; callers may not write them.
const RESERVED_KEYS: [&str; 3] = ["id", CREATED_AT, UPDATED_AT];

/// Validates a full draft before it is sent to the store.
pub fn validate_draft<R: Record>(fields: &Fields) -> ModelResult<()> {
    let schema = R::schema();
    reject_reserved(fields)
        .and_then(|()| schema.check_required(fields))
        .and_then(|()| schema.check_types(fields))
        .and_then(|()| R::validate(fields, true))
        .map_err(|reason| ModelError::Invalid {
            collection: schema.collection,
            reason,
        })
}

/// Validates a partial patch before it is sent to the store.
///
/// Required fields may be changed but not blanked, either directly or by
/// replacing the object that holds them.
pub fn validate_patch<R: Record>(fields: &Fields) -> ModelResult<()> {
    let schema = R::schema();
    let check = || -> Result<(), String> {
        if fields.is_empty() {
            return Err("patch is empty".to_string());
        }
        reject_reserved(fields)?;
        schema.check_patch_required(fields)?;
        schema.check_types(fields)?;
        R::validate(fields, false)
    };
    check().map_err(|reason| ModelError::Invalid {
        collection: schema.collection,
        reason,
    })
}

fn reject_reserved(fields: &Fields) -> Result<(), String> {
    match RESERVED_KEYS.iter().find(|key| fields.contains_key(**key)) {
        Some(key) => Err(format!("`{key}` is managed by the store")),
        None => Ok(()),
    }
}

/// Account / listing lifecycle status. Missing means active.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Active,
    Inactive,
    Pending,
    Suspended,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Suspended => "suspended",
            Self::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "pending" => Self::Pending,
            "suspended" => Self::Suspended,
            _ => Self::Other(value),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
