//! Product and category endpoints.

use atelier_core::ProductId;
use atelier_core::product::{Category, ProductPayload, ProductRecord};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::instrument;

use super::{ApiClient, ApiError};

/// Name of the repeated binary part carrying uploaded images.
pub const IMAGE_PART: &str = "images";

impl ApiClient {
    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductRecord>, ApiError> {
        self.get("/api/products").await
    }

    /// Get a single product with its colors, stock and images.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductRecord, ApiError> {
        self.get(&format!("/api/products/{id}")).await
    }

    /// Create a product from a multipart payload.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured, the form cannot be built,
    /// or the server rejects the product.
    #[instrument(skip(self, payload), fields(title = %payload.title, images = payload.images.len()))]
    pub async fn create_product(&self, payload: &ProductPayload) -> Result<(), ApiError> {
        let form = build_form(payload)?;
        self.send_multipart(Method::POST, "/api/products", form)
            .await
    }

    /// Update a product from a multipart payload.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured, the form cannot be built,
    /// or the server rejects the update.
    #[instrument(skip(self, payload), fields(product_id = %id, images = payload.images.len()))]
    pub async fn update_product(
        &self,
        id: ProductId,
        payload: &ProductPayload,
    ) -> Result<(), ApiError> {
        let form = build_form(payload)?;
        self.send_multipart(Method::PUT, &format!("/api/products/{id}"), form)
            .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/api/products/{id}"))
            .await
    }

    /// List the categories offered by the category picker.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get("/api/categories").await
    }
}

/// Build the multipart body: text fields first, then one `images` part per
/// new upload, in payload order.
fn build_form(payload: &ProductPayload) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in payload.text_fields()? {
        form = form.text(name, value);
    }
    for upload in &payload.images {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        form = form.part(IMAGE_PART, part);
    }
    Ok(form)
}
