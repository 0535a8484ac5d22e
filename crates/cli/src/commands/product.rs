//! Product and category commands.
//!
//! # Usage
//!
//! ```bash
//! # List products
//! atelier product list
//!
//! # Show colors, stock grid and images of one product
//! atelier product show 12
//!
//! # Create or update a product from a YAML manifest
//! atelier product create --manifest shirt.yaml
//! atelier product update 12 --manifest restock.yaml
//!
//! # Delete (asks for --yes)
//! atelier product delete 12 --yes
//!
//! # List categories
//! atelier categories
//! ```

use std::path::Path;

use atelier_admin::services::{ProductComposer, delete_product};
use atelier_admin::{ApiClient, AppError};
use atelier_core::ProductId;
use atelier_core::format_amount;
use atelier_core::product::ProductRecord;
use tracing::{info, warn};

use super::CommandError;
use super::manifest::ProductManifest;

fn log_products(products: &[ProductRecord]) {
    if products.is_empty() {
        info!("No products");
    }
    for product in products {
        let price = product.promo_price.map_or_else(
            || format_amount(product.base_price),
            |promo| format!("{} (was {})", format_amount(promo), format_amount(product.base_price)),
        );
        info!(
            "{:<6} {:<32} {:>20}  {:<8} stock {}",
            format!("#{}", product.id),
            product.title,
            price,
            product.status.as_str(),
            product.total_stock()
        );
    }
}

/// List products.
///
/// # Errors
///
/// Returns an error if the list cannot be fetched.
pub async fn list(client: ApiClient) -> Result<(), CommandError> {
    let products = client
        .list_products()
        .await
        .map_err(AppError::from)
        .map_err(CommandError::action("Failed to load products"))?;
    log_products(&products);
    Ok(())
}

/// Show a product as the edit form sees it.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched.
pub async fn show(client: ApiClient, id: ProductId) -> Result<(), CommandError> {
    let composer = ProductComposer::for_update(client, id)
        .await
        .map_err(CommandError::action("Failed to load product"))?;
    let draft = composer.draft();

    info!("Title:       {}", draft.title);
    if !draft.description.is_empty() {
        info!("Description: {}", draft.description);
    }
    let category = draft
        .category_id
        .and_then(|id| composer.categories().iter().find(|c| c.id == id))
        .map_or_else(|| "-".to_string(), |c| c.name.clone());
    info!("Category:    {category}");
    if let Some(price) = draft.base_price {
        info!("Price:       {}", format_amount(price));
    }
    if let Some(promo) = draft.promo_price {
        info!("Promo price: {}", format_amount(promo));
    }
    info!("Revenue:     {}", format_amount(draft.base_revenue));
    info!("Status:      {}", draft.status);

    for color in &draft.colors {
        info!("Color:       {} {}", color.name, color.color_code);
    }
    let sizes: Vec<&str> = draft.sizes.iter().map(|s| s.label()).collect();
    info!("Sizes:       {}", if sizes.is_empty() { "-".to_string() } else { sizes.join(", ") });

    for cell in draft.stock.cells(&draft.color_refs(), &draft.sizes) {
        info!("  {:<16} {:>5}", cell.wire_key, cell.quantity);
    }

    for image in &draft.existing_images {
        let url = composer
            .image_url(image)
            .map_err(CommandError::action("Failed to load product"))?;
        info!(
            "Image #{}:   {}{}{}",
            image.id,
            url,
            image
                .assigned_color
                .as_deref()
                .map(|c| format!(" [{c}]"))
                .unwrap_or_default(),
            if image.is_primary { " (cover)" } else { "" }
        );
    }
    Ok(())
}

/// Create a product from a manifest.
///
/// # Errors
///
/// Returns an error if the manifest is invalid, the form does not validate,
/// or the server rejects the product.
pub async fn create(client: ApiClient, manifest_path: &Path) -> Result<(), CommandError> {
    let composer = ProductComposer::for_create(client)
        .await
        .map_err(CommandError::action("Failed to load categories"))?;
    submit_manifest(composer, manifest_path).await
}

/// Update a product from a manifest.
///
/// # Errors
///
/// Returns an error if the product cannot be loaded, the manifest is
/// invalid, the form does not validate, or the server rejects the update.
pub async fn update(client: ApiClient, id: ProductId, manifest_path: &Path) -> Result<(), CommandError> {
    let composer = ProductComposer::for_update(client, id)
        .await
        .map_err(CommandError::action("Failed to load product"))?;
    submit_manifest(composer, manifest_path).await
}

async fn submit_manifest(
    mut composer: ProductComposer<ApiClient>,
    manifest_path: &Path,
) -> Result<(), CommandError> {
    let manifest = ProductManifest::load(manifest_path).await?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let images = manifest.read_images(base_dir).await?;

    for edit in manifest.edits(composer.draft(), images)? {
        composer
            .apply(edit)
            .map_err(CommandError::action("Failed to save product"))?;
    }
    info!(previews = composer.live_previews(), "Submitting product");

    match composer.submit().await {
        Ok(products) => {
            info!("Product saved");
            log_products(&products);
        }
        Err(err) if err.is_saved() => {
            info!("Product saved");
            warn!(error = %err, "{}", err.user_message("Failed to load products"));
        }
        Err(err) => return Err(CommandError::action("Failed to save product")(err)),
    }
    Ok(())
}

/// Delete a product. Without `confirmed` nothing is sent.
///
/// # Errors
///
/// Returns an error if the deletion fails.
pub async fn delete(client: ApiClient, id: ProductId, confirmed: bool) -> Result<(), CommandError> {
    if !confirmed {
        warn!("Not deleted: pass --yes to confirm deleting product #{id}");
        return Ok(());
    }
    match delete_product(&client, id).await {
        Ok(products) => {
            info!("Product #{id} deleted");
            log_products(&products);
        }
        Err(err) if err.is_saved() => {
            info!("Product #{id} deleted");
            warn!(error = %err, "{}", err.user_message("Failed to load products"));
        }
        Err(err) => return Err(CommandError::action("Failed to delete product")(err)),
    }
    Ok(())
}

/// List categories.
///
/// # Errors
///
/// Returns an error if the list cannot be fetched.
pub async fn categories(client: ApiClient) -> Result<(), CommandError> {
    let categories = client
        .list_categories()
        .await
        .map_err(AppError::from)
        .map_err(CommandError::action("Failed to load categories"))?;
    if categories.is_empty() {
        info!("No categories");
    }
    for category in categories {
        info!("{:<6} {}", format!("#{}", category.id), category.name);
    }
    Ok(())
}
