//! Authentication records and account roles.

use crate::document::Fields;
use crate::record::{Record, Status};
use crate::schema::{EntitySchema, FieldSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use venuehub_types::{DocumentId, Timestamp};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("auth")
        .with_field(FieldSpec::text("email", true).required())
        .with_field(FieldSpec::text("passwordHash", false).required())
        .with_field(FieldSpec::text("role", false).required())
        .with_field(FieldSpec::text("name", true))
        .with_field(FieldSpec::text("profileId", false))
        .with_field(FieldSpec::text("status", false))
});

/// The role an account signs up as. Each role owns a profile collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Vendor,
    Hotel,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Vendor => "vendor",
            Self::Hotel => "hotel",
            Self::Admin => "admin",
        }
    }

    /// The collection holding this role's profile records. Admins have none.
    pub fn profile_collection(&self) -> Option<&'static str> {
        match self {
            Self::User => Some("users"),
            Self::Vendor => Some("vendors"),
            Self::Hotel => Some("hotels"),
            Self::Admin => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "vendor" => Ok(Self::Vendor),
            "hotel" => Ok(Self::Hotel),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// A login record in the shared `auth` collection, cross-linked to the
/// role-specific profile through `profile_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccount {
    pub id: DocumentId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_id: Option<DocumentId>,
    #[serde(default)]
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for AuthAccount {
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
        if let Some(role) = fields.get("role").and_then(Value::as_str) {
            role.parse::<Role>()?;
        }
        Ok(())
    }
}
