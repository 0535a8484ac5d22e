//! Admin form orchestrators.
//!
//! # Services
//!
//! - `promo_table` - Promo code list, editor context, two-phase deletion
//! - `product_form` - Product create/update form, image previews, submission
//! - `previews` - Preview handles for not-yet-uploaded images
//!
//! The orchestrators talk to the API through the [`PromoBackend`] and
//! [`CatalogBackend`] traits. [`ApiClient`] implements both; tests use
//! in-memory fakes.

pub mod previews;
pub mod product_form;
pub mod promo_table;

pub use previews::PreviewRegistry;
pub use product_form::{ProductComposer, delete_product};
pub use promo_table::{PromoEditor, PromoRow, PromoTable};

use std::future::Future;

use atelier_core::product::{Category, ProductPayload, ProductRecord};
use atelier_core::promo::{PromoCode, PromoInput, PromoStats, VerifyOutcome};
use atelier_core::{ProductId, PromoCodeId};
use url::Url;

use crate::api::{ApiClient, ApiError};

/// Promo code operations used by [`PromoTable`].
pub trait PromoBackend {
    fn list_promos(&self) -> impl Future<Output = Result<Vec<PromoCode>, ApiError>> + Send;

    fn create_promo(&self, input: &PromoInput) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn update_promo(
        &self,
        id: PromoCodeId,
        input: &PromoInput,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn delete_promo(&self, id: PromoCodeId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn toggle_promo(&self, id: PromoCodeId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn promo_stats(
        &self,
        id: PromoCodeId,
    ) -> impl Future<Output = Result<PromoStats, ApiError>> + Send;

    fn verify_promo(&self, code: &str)
    -> impl Future<Output = Result<VerifyOutcome, ApiError>> + Send;
}

/// Product and category operations used by [`ProductComposer`].
pub trait CatalogBackend {
    fn list_products(&self) -> impl Future<Output = Result<Vec<ProductRecord>, ApiError>> + Send;

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<ProductRecord, ApiError>> + Send;

    fn create_product(
        &self,
        payload: &ProductPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn update_product(
        &self,
        id: ProductId,
        payload: &ProductPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn delete_product(&self, id: ProductId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, ApiError>> + Send;

    /// Resolve a server-relative URL against the API origin.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the path cannot be joined.
    fn resolve_url(&self, path: &str) -> Result<Url, ApiError>;
}

impl PromoBackend for ApiClient {
    async fn list_promos(&self) -> Result<Vec<PromoCode>, ApiError> {
        Self::list_promos(self).await
    }

    async fn create_promo(&self, input: &PromoInput) -> Result<(), ApiError> {
        Self::create_promo(self, input).await
    }

    async fn update_promo(&self, id: PromoCodeId, input: &PromoInput) -> Result<(), ApiError> {
        Self::update_promo(self, id, input).await
    }

    async fn delete_promo(&self, id: PromoCodeId) -> Result<(), ApiError> {
        Self::delete_promo(self, id).await
    }

    async fn toggle_promo(&self, id: PromoCodeId) -> Result<(), ApiError> {
        Self::toggle_promo(self, id).await
    }

    async fn promo_stats(&self, id: PromoCodeId) -> Result<PromoStats, ApiError> {
        Self::promo_stats(self, id).await
    }

    async fn verify_promo(&self, code: &str) -> Result<VerifyOutcome, ApiError> {
        Self::verify_promo(self, code).await
    }
}

impl CatalogBackend for ApiClient {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ApiError> {
        Self::list_products(self).await
    }

    async fn get_product(&self, id: ProductId) -> Result<ProductRecord, ApiError> {
        Self::get_product(self, id).await
    }

    async fn create_product(&self, payload: &ProductPayload) -> Result<(), ApiError> {
        Self::create_product(self, payload).await
    }

    async fn update_product(&self, id: ProductId, payload: &ProductPayload) -> Result<(), ApiError> {
        Self::update_product(self, id, payload).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        Self::delete_product(self, id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Self::list_categories(self).await
    }

    fn resolve_url(&self, path: &str) -> Result<Url, ApiError> {
        Self::resolve_url(self, path)
    }
}
