use crate::document::Fields;
use crate::record::{Record, Status};
use crate::schema::{EntitySchema, FieldSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use venuehub_types::{DocumentId, Timestamp};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("vendors")
        .with_field(FieldSpec::text("businessName", true).required())
        .with_field(FieldSpec::text("ownerName", true))
        .with_field(FieldSpec::text("email", false))
        .with_field(FieldSpec::text("phone", false))
        .with_field(FieldSpec::text("serviceType", true).required())
        .with_field(FieldSpec::text("city", true))
        .with_field(FieldSpec::text("description", false))
        .with_field(FieldSpec::number("rating"))
        .with_field(FieldSpec::text("authId", false))
        .with_field(FieldSpec::text("status", false))
});

/// A service vendor (caterer, decorator, photographer, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: DocumentId,
    pub business_name: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub service_type: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub auth_id: Option<DocumentId>,
    #[serde(default)]
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for Vendor {
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
        Some(&self.service_type)
    }

    fn validate(fields: &Fields, _is_create: bool) -> Result<(), String> {
        match fields.get("rating").and_then(Value::as_f64) {
            Some(r) if !(0.0..=5.0).contains(&r) => {
                Err(format!("`rating` must be between 0 and 5, got {r}"))
            }
            _ => Ok(()),
        }
    }
}
