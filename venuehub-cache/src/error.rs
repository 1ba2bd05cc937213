//! Error types for the entity services.

use thiserror::Error;
use venuehub_model::ModelError;
use venuehub_store::StoreError;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors a service call can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The id is absent from both the mirror and the store.
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A store call failed. The store's error is passed through as is.
    #[error("store call failed: {0}")]
    Transport(#[from] StoreError),

    /// Caller-supplied fields were rejected before reaching the store.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl ServiceError {
    pub(crate) fn not_found(collection: &str, id: impl ToString) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Invalid { collection, reason } => {
                Self::Validation(format!("{collection}: {reason}"))
            }
            // A stored document we cannot read is a transport failure.
            malformed @ ModelError::Malformed { .. } => {
                Self::Transport(StoreError::Malformed(malformed.to_string()))
            }
        }
    }
}
