//! Product form orchestrator.
//!
//! [`ProductComposer`] owns one [`ProductDraft`] for the lifetime of a create
//! or edit session. It keeps a preview handle for every image picked but not
//! yet uploaded, turns the draft into a multipart payload on submit, and
//! re-fetches the product list once the server accepts it.

use atelier_core::ProductId;
use atelier_core::product::{
    Category, ExistingImage, FormMode, NewImage, ProductDraft, ProductEdit, ProductPayload,
    ProductRecord, UploadKey,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{CatalogBackend, PreviewRegistry};
use crate::error::AppError;

const SAVE_FAILED: &str = "Failed to save product";
const LOAD_FAILED: &str = "Failed to load products";
const DELETE_FAILED: &str = "Failed to delete product";

/// A product create or edit session.
#[derive(Debug)]
pub struct ProductComposer<B> {
    backend: B,
    draft: ProductDraft,
    categories: Vec<Category>,
    previews: PreviewRegistry,
    last_error: Option<String>,
}

impl<B: CatalogBackend> ProductComposer<B> {
    /// Open an empty create form.
    ///
    /// # Errors
    ///
    /// Returns the API error if the categories cannot be fetched.
    #[instrument(skip(backend))]
    pub async fn for_create(backend: B) -> Result<Self, AppError> {
        let categories = backend.list_categories().await?;
        Ok(Self::with_draft(backend, ProductDraft::new(), categories))
    }

    /// Open an edit form pre-filled from the stored product.
    ///
    /// # Errors
    ///
    /// Returns the API error if the product or the categories cannot be
    /// fetched.
    #[instrument(skip(backend), fields(product_id = %id))]
    pub async fn for_update(backend: B, id: ProductId) -> Result<Self, AppError> {
        let record = backend.get_product(id).await?;
        let categories = backend.list_categories().await?;
        debug!(
            colors = record.colors.len(),
            images = record.images.len(),
            stock_keys = record.stock.len(),
            "Product loaded for edit"
        );
        Ok(Self::with_draft(
            backend,
            ProductDraft::from_record(&record),
            categories,
        ))
    }

    fn with_draft(backend: B, draft: ProductDraft, categories: Vec<Category>) -> Self {
        Self {
            backend,
            draft,
            categories,
            previews: PreviewRegistry::new(),
            last_error: None,
        }
    }

    #[must_use]
    pub const fn draft(&self) -> &ProductDraft {
        &self.draft
    }

    #[must_use]
    pub const fn mode(&self) -> FormMode {
        self.draft.mode
    }

    /// Categories offered by the category picker.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Message from the last failed action, cleared by the next action.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one edit to the form.
    ///
    /// Added images get a preview handle; removed ones release theirs.
    ///
    /// # Errors
    ///
    /// Returns the reducer's validation error; the form is unchanged.
    pub fn apply(&mut self, edit: ProductEdit) -> Result<(), AppError> {
        self.last_error = None;
        let added: Vec<UploadKey> = match &edit {
            ProductEdit::AddImages(images) => images.iter().map(|img| img.key).collect(),
            _ => Vec::new(),
        };
        let removed = match &edit {
            ProductEdit::RemoveNewImage(key) => Some(*key),
            _ => None,
        };

        if let Err(err) = self.draft.apply(edit) {
            let err = AppError::from(err);
            self.last_error = Some(err.user_message(SAVE_FAILED));
            return Err(err);
        }

        for key in added {
            self.previews.create(key);
        }
        if let Some(key) = removed {
            self.previews.revoke(key);
        }
        Ok(())
    }

    /// Add a batch of picked images and return their keys.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TooManyImages` if the batch does not fit;
    /// none of the images is added.
    pub fn add_images(&mut self, images: Vec<NewImage>) -> Result<Vec<UploadKey>, AppError> {
        let keys = images.iter().map(|img| img.key).collect();
        self.apply(ProductEdit::AddImages(images))?;
        Ok(keys)
    }

    /// Preview URL of a picked image.
    #[must_use]
    pub fn preview_url(&self, key: UploadKey) -> Option<&str> {
        self.previews.get(key)
    }

    /// Number of preview handles currently held.
    #[must_use]
    pub fn live_previews(&self) -> usize {
        self.previews.len()
    }

    /// Absolute URL of a stored image.
    ///
    /// # Errors
    ///
    /// Returns the API error if the image URL cannot be resolved.
    pub fn image_url(&self, image: &ExistingImage) -> Result<Url, AppError> {
        Ok(self.backend.resolve_url(&image.url)?)
    }

    /// Validate, send, and re-fetch the list.
    ///
    /// On success every preview handle is released, the form goes back to
    /// an empty create form, and the fresh product list is returned. On
    /// failure nothing changes and the message is kept for display.
    ///
    /// # Errors
    ///
    /// Returns the first validation error (nothing is sent) or the API error.
    /// If the server accepted the product but the list could not be
    /// re-fetched, returns `AppError::Reload`; the form is reset as on
    /// success.
    #[instrument(skip(self), fields(mode = ?self.draft.mode))]
    pub async fn submit(&mut self) -> Result<Vec<ProductRecord>, AppError> {
        self.last_error = None;
        let payload = ProductPayload::from_draft(&self.draft)
            .map_err(|err| self.fail(err.into(), SAVE_FAILED))?;

        let sent = match self.draft.mode {
            FormMode::Create => self.backend.create_product(&payload).await,
            FormMode::Update(id) => self.backend.update_product(id, &payload).await,
        };
        sent.map_err(|err| self.fail(err.into(), SAVE_FAILED))?;

        match self.draft.mode {
            FormMode::Create => info!(
                title = %payload.title,
                images = payload.images.len(),
                "Product created"
            ),
            FormMode::Update(id) => info!(
                product_id = %id,
                images = payload.images.len(),
                "Product updated"
            ),
        }

        self.previews.revoke_all();
        self.draft = ProductDraft::new();
        let reloaded = self.backend.list_products().await;
        reloaded.map_err(|err| self.fail(AppError::Reload(err), LOAD_FAILED))
    }

    fn fail(&mut self, err: AppError, default: &str) -> AppError {
        let message = err.user_message(default);
        warn!(error = %err, "{message}");
        self.last_error = Some(message);
        err
    }
}

impl<B> Drop for ProductComposer<B> {
    fn drop(&mut self) {
        self.previews.revoke_all();
    }
}

/// Delete a product and return the re-fetched list.
///
/// # Errors
///
/// Returns the API error; the message to show is
/// `err.user_message("Failed to delete product")`. A failed re-fetch after
/// the deletion went through is `AppError::Reload`.
#[instrument(skip(backend), fields(product_id = %id))]
pub async fn delete_product<B: CatalogBackend>(
    backend: &B,
    id: ProductId,
) -> Result<Vec<ProductRecord>, AppError> {
    if let Err(err) = backend.delete_product(id).await {
        let err = AppError::from(err);
        warn!(error = %err, "{}", err.user_message(DELETE_FAILED));
        return Err(err);
    }
    info!(product_id = %id, "Product deleted");
    backend.list_products().await.map_err(|err| {
        let err = AppError::Reload(err);
        warn!(error = %err, "{}", err.user_message(LOAD_FAILED));
        err
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::{Arc, Mutex};

    use atelier_core::product::{Color, ColorRecord, ImageRecord};
    use atelier_core::stock::{StockSlot, WireStock};
    use atelier_core::{CategoryId, ColorId, ImageId, ProductStatus, Size, ValidationError};
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::ApiError;

    #[derive(Debug, Default)]
    struct State {
        products: Vec<ProductRecord>,
        sent: Vec<(Option<ProductId>, ProductPayload)>,
        deleted: Vec<ProductId>,
        list_calls: usize,
        fail_with: Option<String>,
        list_down: bool,
    }

    /// In-memory catalog API.
    #[derive(Debug, Clone, Default)]
    struct FakeCatalog {
        state: Arc<Mutex<State>>,
    }

    impl FakeCatalog {
        fn with_products(products: Vec<ProductRecord>) -> Self {
            let api = Self::default();
            api.state.lock().unwrap().products = products;
            api
        }

        fn fail_next(&self, message: &str) {
            self.state.lock().unwrap().fail_with = Some(message.to_string());
        }

        fn check(&self) -> Result<(), ApiError> {
            match self.state.lock().unwrap().fail_with.take() {
                Some(message) => Err(ApiError::Server {
                    status: 422,
                    message: Some(message),
                }),
                None => Ok(()),
            }
        }
    }

    impl CatalogBackend for FakeCatalog {
        async fn list_products(&self) -> Result<Vec<ProductRecord>, ApiError> {
            self.check()?;
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            if state.list_down {
                return Err(ApiError::Server {
                    status: 503,
                    message: Some("upstream down".to_string()),
                });
            }
            Ok(state.products.clone())
        }

        async fn get_product(&self, id: ProductId) -> Result<ProductRecord, ApiError> {
            self.check()?;
            let state = self.state.lock().unwrap();
            state
                .products
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(ApiError::Server {
                    status: 404,
                    message: Some("Produit introuvable".to_string()),
                })
        }

        async fn create_product(&self, payload: &ProductPayload) -> Result<(), ApiError> {
            self.check()?;
            self.state.lock().unwrap().sent.push((None, payload.clone()));
            Ok(())
        }

        async fn update_product(
            &self,
            id: ProductId,
            payload: &ProductPayload,
        ) -> Result<(), ApiError> {
            self.check()?;
            self.state
                .lock()
                .unwrap()
                .sent
                .push((Some(id), payload.clone()));
            Ok(())
        }

        async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
            self.check()?;
            let mut state = self.state.lock().unwrap();
            state.deleted.push(id);
            state.products.retain(|p| p.id != id);
            Ok(())
        }

        async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
            self.check()?;
            Ok(vec![Category {
                id: CategoryId::new(3),
                name: "Chemises".to_string(),
            }])
        }

        fn resolve_url(&self, path: &str) -> Result<Url, ApiError> {
            Ok(Url::parse("http://localhost:5000")?.join(path)?)
        }
    }

    fn image(name: &str) -> NewImage {
        NewImage::new(name, "image/jpeg", vec![0xFF, 0xD8])
    }

    fn stored_product() -> ProductRecord {
        let mut stock = WireStock::new();
        stock.insert("sand_s".to_string(), 4);
        stock.insert("olive_s".to_string(), 1);
        ProductRecord {
            id: ProductId::new(12),
            title: "Linen Shirt".to_string(),
            description: None,
            base_price: Decimal::new(4990, 2),
            promo_price: None,
            base_revenue: Decimal::ZERO,
            category_id: Some(CategoryId::new(3)),
            status: ProductStatus::Active,
            colors: vec![
                ColorRecord {
                    id: ColorId::new(1),
                    name: "Sand".to_string(),
                    color_code: "#e0d2b4".to_string(),
                },
                ColorRecord {
                    id: ColorId::new(2),
                    name: "Olive".to_string(),
                    color_code: "#708238".to_string(),
                },
            ],
            sizes: vec![Size::S],
            stock,
            images: vec![ImageRecord {
                id: ImageId::new(5),
                url: "/uploads/a.jpg".to_string(),
                assigned_color: Some("Sand".to_string()),
                is_primary: true,
            }],
        }
    }

    async fn filled_create(api: &FakeCatalog) -> ProductComposer<FakeCatalog> {
        let mut composer = ProductComposer::for_create(api.clone()).await.unwrap();
        for edit in [
            ProductEdit::SetTitle("Canvas Tote".to_string()),
            ProductEdit::SetCategory(Some(CategoryId::new(3))),
            ProductEdit::SetBasePrice(Some(Decimal::new(2500, 2))),
            ProductEdit::AddColor(Color::new("Ecru", "#f3efe0")),
        ] {
            composer.apply(edit).unwrap();
        }
        composer
    }

    #[tokio::test]
    async fn test_create_submits_and_refetches() {
        let api = FakeCatalog::with_products(vec![stored_product()]);
        let mut composer = filled_create(&api).await;
        assert_eq!(composer.categories().len(), 1);

        let ecru = composer.draft().colors[0].key;
        composer
            .apply(ProductEdit::SetStock {
                slot: StockSlot::sizeless(ecru),
                quantity: 6,
            })
            .unwrap();
        let keys = composer.add_images(vec![image("front.jpg"), image("back.jpg")]).unwrap();
        assert_eq!(composer.live_previews(), 2);
        assert!(composer.preview_url(keys[0]).unwrap().starts_with("blob:"));

        let products = composer.submit().await.unwrap();
        assert_eq!(products.len(), 1);

        let state = api.state.lock().unwrap();
        assert_eq!(state.list_calls, 1);
        let (id, payload) = &state.sent[0];
        assert_eq!(*id, None);
        assert_eq!(payload.images.len(), 2);
        assert_eq!(payload.stock.get("couleur_0"), Some(&6));
        drop(state);

        assert_eq!(composer.live_previews(), 0);
        assert_eq!(composer.draft(), &ProductDraft::new());
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_sent() {
        let api = FakeCatalog::default();
        let mut composer = filled_create(&api).await;

        let err = composer.submit().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::ImageRequired)));
        assert_eq!(
            composer.last_error(),
            Some(ValidationError::ImageRequired.to_string().as_str())
        );
        assert!(api.state.lock().unwrap().sent.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_keeps_form_and_previews() {
        let api = FakeCatalog::default();
        let mut composer = filled_create(&api).await;
        composer.add_images(vec![image("front.jpg")]).unwrap();
        let before = composer.draft().clone();

        api.fail_next("Le titre existe déjà");
        assert!(composer.submit().await.is_err());
        assert_eq!(composer.last_error(), Some("Le titre existe déjà"));
        assert_eq!(composer.draft(), &before);
        assert_eq!(composer.live_previews(), 1);
    }

    #[tokio::test]
    async fn test_failed_refetch_after_create_is_reported_as_saved() {
        let api = FakeCatalog::default();
        let mut composer = filled_create(&api).await;
        composer.add_images(vec![image("front.jpg")]).unwrap();
        api.state.lock().unwrap().list_down = true;

        let err = composer.submit().await.unwrap_err();
        assert!(err.is_saved());
        assert!(matches!(err, AppError::Reload(ApiError::Server { status: 503, .. })));
        assert_eq!(composer.last_error(), Some("upstream down"));

        assert_eq!(api.state.lock().unwrap().sent.len(), 1);
        assert_eq!(composer.draft(), &ProductDraft::new());
        assert_eq!(composer.live_previews(), 0);
    }

    #[tokio::test]
    async fn test_image_cap_leaves_previews_unchanged() {
        let api = FakeCatalog::default();
        let mut composer = filled_create(&api).await;
        composer
            .add_images((0..9).map(|i| image(&format!("{i}.jpg"))).collect())
            .unwrap();

        let err = composer
            .add_images(vec![image("a.jpg"), image("b.jpg")])
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::TooManyImages { attempted: 11 })
        ));
        assert_eq!(composer.draft().new_images.len(), 9);
        assert_eq!(composer.live_previews(), 9);
        assert!(composer.last_error().is_some());
    }

    #[tokio::test]
    async fn test_removing_new_image_releases_preview() {
        let api = FakeCatalog::default();
        let mut composer = filled_create(&api).await;
        let keys = composer.add_images(vec![image("a.jpg"), image("b.jpg")]).unwrap();

        composer.apply(ProductEdit::RemoveNewImage(keys[0])).unwrap();
        assert_eq!(composer.live_previews(), 1);
        assert_eq!(composer.preview_url(keys[0]), None);
        assert!(composer.preview_url(keys[1]).is_some());
    }

    #[tokio::test]
    async fn test_unedited_update_resends_loaded_state() {
        let api = FakeCatalog::with_products(vec![stored_product()]);
        let mut composer = ProductComposer::for_update(api.clone(), ProductId::new(12))
            .await
            .unwrap();
        assert_eq!(composer.mode(), FormMode::Update(ProductId::new(12)));

        let image = &composer.draft().existing_images[0];
        assert_eq!(
            composer.image_url(image).unwrap().as_str(),
            "http://localhost:5000/uploads/a.jpg"
        );

        composer.submit().await.unwrap();

        let state = api.state.lock().unwrap();
        let (id, payload) = &state.sent[0];
        assert_eq!(*id, Some(ProductId::new(12)));
        assert_eq!(payload.stock, stored_product().stock);
        let extras = payload.update.as_ref().unwrap();
        assert_eq!(extras.existing_images[0].id, ImageId::new(5));
        assert!(extras.images_to_delete.is_empty());
        assert!(extras.colors_to_delete.is_empty());
    }

    #[tokio::test]
    async fn test_update_sends_removed_colors_and_images() {
        let api = FakeCatalog::with_products(vec![stored_product()]);
        let mut composer = ProductComposer::for_update(api.clone(), ProductId::new(12))
            .await
            .unwrap();
        let olive = composer.draft().colors[1].key;
        composer.apply(ProductEdit::RemoveColor(olive)).unwrap();
        composer.add_images(vec![image("new.jpg")]).unwrap();
        composer
            .apply(ProductEdit::RemoveExistingImage(ImageId::new(5)))
            .unwrap();

        composer.submit().await.unwrap();

        let state = api.state.lock().unwrap();
        let payload = &state.sent[0].1;
        let extras = payload.update.as_ref().unwrap();
        assert_eq!(extras.colors_to_delete, vec![ColorId::new(2)]);
        assert_eq!(extras.images_to_delete, vec![ImageId::new(5)]);
        assert!(!payload.stock.contains_key("olive_s"));
        assert_eq!(payload.images.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_product_fails_to_open() {
        let api = FakeCatalog::default();
        let err = ProductComposer::for_update(api, ProductId::new(404))
            .await
            .unwrap_err();
        assert_eq!(err.user_message("Failed to load product"), "Produit introuvable");
    }

    #[tokio::test]
    async fn test_delete_refetches() {
        let api = FakeCatalog::with_products(vec![stored_product()]);
        let products = delete_product(&api, ProductId::new(12)).await.unwrap();
        assert!(products.is_empty());
        assert_eq!(api.state.lock().unwrap().deleted, vec![ProductId::new(12)]);

        api.fail_next("Produit introuvable");
        let err = delete_product(&api, ProductId::new(12)).await.unwrap_err();
        assert!(!err.is_saved());
    }

    #[tokio::test]
    async fn test_delete_with_failed_refetch_is_saved() {
        let api = FakeCatalog::with_products(vec![stored_product()]);
        api.state.lock().unwrap().list_down = true;

        let err = delete_product(&api, ProductId::new(12)).await.unwrap_err();
        assert!(err.is_saved());
        assert_eq!(api.state.lock().unwrap().deleted, vec![ProductId::new(12)]);
    }
}
