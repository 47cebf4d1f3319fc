//! # Shop Error Types
//!
//! Typed error handling for shopfront.
//! Every component operation returns `Result<T, ShopError>`; the HTTP layer
//! turns each variant into a status code and JSON body.

use crate::store::StoreError;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Core error type for all shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Missing or malformed input, with per-field detail
    #[error("{message}")]
    Validation {
        message: String,
        errors: FieldErrors,
    },

    /// Lookup miss
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// No session matches the presented token
    #[error("Please try log in again.")]
    Unauthenticated,

    /// The session lookup itself failed
    #[error("Access token is missing or wrong.")]
    AccessCheckFailed,

    /// Image upload service failure
    #[error("Image service error: {0}")]
    ImageService(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors (bad env values, unusable client settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Validation failure with a single field error
    pub fn invalid_field(
        message: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), detail.into());
        ShopError::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ShopError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation { .. } => 400,
            ShopError::NotFound { .. } => 404,
            ShopError::Unauthenticated => 401,
            ShopError::AccessCheckFailed => 403,
            ShopError::ImageService(_) => 502,
            ShopError::Store(_) => 500,
            ShopError::Configuration(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
