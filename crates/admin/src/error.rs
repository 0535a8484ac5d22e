//! Unified error handling for the admin orchestrators.

use atelier_core::ValidationError;
use thiserror::Error;

use crate::api::ApiError;

/// Application-level error type for the admin orchestrators.
#[derive(Debug, Error)]
pub enum AppError {
    /// The form was rejected locally; no request was sent.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The change was saved but re-fetching the list afterwards failed.
    #[error("Saved, but the list could not be reloaded: {0}")]
    Reload(#[source] ApiError),

    /// Resource not found in the fetched list.
    #[error("Not found: {0}")]
    NotFound(String),

    /// `confirm_delete` was called with no deletion requested.
    #[error("No deletion pending confirmation")]
    NoPendingDeletion,

    /// An edit or submit arrived while no promo form is open.
    #[error("No promo form is open")]
    EditorClosed,
}

impl AppError {
    /// The message to show the operator.
    ///
    /// Validation errors and messages sent by the server are shown as is;
    /// transport failures and silent server errors fall back to `default`.
    #[must_use]
    pub fn user_message(&self, default: &str) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Api(err @ ApiError::MissingToken) => err.to_string(),
            Self::Api(err) | Self::Reload(err) => err
                .server_message()
                .map_or_else(|| default.to_string(), str::to_string),
            Self::NotFound(_) | Self::NoPendingDeletion | Self::EditorClosed => self.to_string(),
        }
    }

    /// Whether the server accepted the change despite the error.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Reload(_))
    }

    /// Field the error is attributed to, for validation errors.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(err) => Some(err.field()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_shown_verbatim() {
        let err = AppError::from(ApiError::Server {
            status: 409,
            message: Some("Ce code existe déjà".to_string()),
        });
        assert_eq!(err.user_message("Failed to create promo code"), "Ce code existe déjà");
    }

    #[test]
    fn test_default_message_without_server_message() {
        let err = AppError::from(ApiError::Server {
            status: 502,
            message: None,
        });
        assert_eq!(
            err.user_message("Failed to delete product"),
            "Failed to delete product"
        );
    }

    #[test]
    fn test_reload_failure_counts_as_saved() {
        let err = AppError::Reload(ApiError::Server {
            status: 503,
            message: None,
        });
        assert!(err.is_saved());
        assert_eq!(err.user_message("Failed to load products"), "Failed to load products");
        assert!(!AppError::from(ApiError::MissingToken).is_saved());
    }

    #[test]
    fn test_validation_message_and_field() {
        let err = AppError::from(ValidationError::EndBeforeStart);
        assert_eq!(err.user_message("ignored"), ValidationError::EndBeforeStart.to_string());
        assert_eq!(err.field(), Some(ValidationError::EndBeforeStart.field()));
        assert_eq!(AppError::EditorClosed.field(), None);
    }
}
