//! Promo code endpoints.

use atelier_core::PromoCodeId;
use atelier_core::promo::{PromoCode, PromoInput, PromoStats, VerifyOutcome};
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::{ApiClient, ApiError};

#[derive(Serialize)]
struct VerifyRequest<'a> {
    code: &'a str,
}

impl ApiClient {
    /// List all promo codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    #[instrument(skip(self))]
    pub async fn list_promos(&self) -> Result<Vec<PromoCode>, ApiError> {
        self.get("/api/promo").await
    }

    /// Get a single promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the code does not exist.
    #[instrument(skip(self), fields(promo_id = %id))]
    pub async fn get_promo(&self, id: PromoCodeId) -> Result<PromoCode, ApiError> {
        self.get(&format!("/api/promo/{id}")).await
    }

    /// Create a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the server rejects the code.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_promo(&self, input: &PromoInput) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/api/promo", input).await
    }

    /// Replace a promo code's editable fields.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the server rejects the update.
    #[instrument(skip(self, input), fields(promo_id = %id, code = %input.code))]
    pub async fn update_promo(&self, id: PromoCodeId, input: &PromoInput) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &format!("/api/promo/{id}"), input)
            .await
    }

    /// Delete a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the request fails.
    #[instrument(skip(self), fields(promo_id = %id))]
    pub async fn delete_promo(&self, id: PromoCodeId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/api/promo/{id}"))
            .await
    }

    /// Flip a promo code's `active` flag.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the request fails.
    #[instrument(skip(self), fields(promo_id = %id))]
    pub async fn toggle_promo(&self, id: PromoCodeId) -> Result<(), ApiError> {
        self.send_empty(Method::PATCH, &format!("/api/promo/{id}/toggle"))
            .await
    }

    /// Usage statistics for a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the code does not exist.
    #[instrument(skip(self), fields(promo_id = %id))]
    pub async fn promo_stats(&self, id: PromoCodeId) -> Result<PromoStats, ApiError> {
        self.get(&format!("/api/promo/{id}/stats")).await
    }

    /// Check whether a code can be applied right now.
    ///
    /// This is the storefront's endpoint and is called without a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. An unknown or unusable code is
    /// not an error; it yields `valid: false`.
    #[instrument(skip(self))]
    pub async fn verify_promo(&self, code: &str) -> Result<VerifyOutcome, ApiError> {
        self.post_public("/api/promo/verify", &VerifyRequest { code: code.trim() })
            .await
    }
}
