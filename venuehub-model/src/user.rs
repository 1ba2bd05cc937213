use crate::account::Role;
use crate::document::Fields;
use crate::record::{Record, Status};
use crate::schema::{EntitySchema, FieldSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use venuehub_types::{DocumentId, Timestamp};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("users")
        .with_field(FieldSpec::text("name", true).required())
        .with_field(FieldSpec::text("email", true).required())
        .with_field(FieldSpec::text("phone", true))
        .with_field(FieldSpec::text("city", false))
        .with_field(FieldSpec::text("role", false))
        .with_field(FieldSpec::text("authId", false))
        .with_field(FieldSpec::text("status", false))
});

/// An end user (guest) profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DocumentId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub auth_id: Option<DocumentId>,
    #[serde(default)]
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn default_role() -> Role {
    Role::User
}

impl Record for User {
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
        Some(self.role.as_str())
    }

    fn validate(fields: &Fields, _is_create: bool) -> Result<(), String> {
        if let Some(email) = fields.get("email").and_then(Value::as_str)
            && !email.contains('@')
        {
            return Err(format!("`{email}` is not an email address"));
        }
        if let Some(role) = fields.get("role").and_then(Value::as_str) {
            role.parse::<Role>()?;
        }
        Ok(())
    }
}
