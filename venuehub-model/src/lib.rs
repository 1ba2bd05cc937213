//! Entity model for VenueHub.
//!
//! Defines the types every cache and service layer depends on:
//! - [`Document`]: the raw wire container (id plus a JSON field map)
//! - [`EntitySchema`]: a collection's fields, required keys, searchable
//!   text and default ordering
//! - [`Record`]: a typed entity decoded from a document with canonical
//!   timestamps
//! - [`Hotel`], [`User`], [`Vendor`], [`AuthAccount`]: the concrete kinds

mod account;
mod document;
mod hotel;
mod record;
mod schema;
mod user;
mod vendor;

pub use account::{AuthAccount, Role};
pub use document::{Document, Fields, field_at, set_field_at};
pub use hotel::{Hotel, Location};
pub use record::{Record, Status, decode, validate_draft, validate_patch};
pub use schema::{CREATED_AT, Direction, EntitySchema, FieldKind, FieldSpec, OrderBy, UPDATED_AT};
pub use user::User;
pub use vendor::Vendor;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating or decoding entities.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A document could not be decoded into its typed record.
    #[error("malformed {collection} document {id}: {source}")]
    Malformed {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Caller-supplied fields failed validation.
    #[error("invalid {collection} fields: {reason}")]
    Invalid {
        collection: &'static str,
        reason: String,
    },
}
