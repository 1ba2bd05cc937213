//! Hotels and banquet venues.

use crate::document::Fields;
use crate::record::{Record, Status};
use crate::schema::{EntitySchema, FieldSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use venuehub_types::{DocumentId, Timestamp};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("hotels")
        .with_field(FieldSpec::text("name", true).required())
        .with_field(FieldSpec::text("description", true))
        .with_field(FieldSpec::object("location"))
        .with_field(FieldSpec::text("location.address", true))
        .with_field(FieldSpec::text("location.city", true).required())
        .with_field(FieldSpec::text("location.state", true))
        .with_field(FieldSpec::text("location.pincode", false))
        .with_field(FieldSpec::text("category", false))
        .with_field(FieldSpec::tags("amenities"))
        .with_field(FieldSpec::number("pricePerNight"))
        .with_field(FieldSpec::number("capacity"))
        .with_field(FieldSpec::text("ownerId", false))
        .with_field(FieldSpec::text("status", false))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: Location,
    /// "hotel", "banquet", "resort", ...
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub price_per_night: Option<f64>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
}

fn default_category() -> String {
    "hotel".to_string()
}

impl Record for Hotel {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn validate(fields: &Fields, _is_create: bool) -> Result<(), String> {
        for key in ["pricePerNight", "capacity"] {
            if let Some(n) = fields.get(key).and_then(Value::as_f64)
                && n < 0.0
            {
                return Err(format!("`{key}` cannot be negative"));
            }
        }
        Ok(())
    }
}
