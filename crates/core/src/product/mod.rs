//! Products as returned by the catalog API, and the product form.
//!
//! Field names on the wire follow the API's vocabulary (`titre`, `prix`,
//! `couleurs`, ...); the Rust side uses English names.

pub mod draft;
pub mod payload;

pub use draft::{Color, ExistingImage, FormMode, NewImage, ProductDraft, ProductEdit, UploadKey};
pub use payload::{ColorPayload, ExistingImagePayload, ProductPayload, UpdateExtras, UploadFile};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stock::WireStock;
use crate::types::{CategoryId, ColorId, ImageId, ProductId, ProductStatus, Size};

/// A product category (`GET /api/categories`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "nom")]
    pub name: String,
}

/// A color variant as stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRecord {
    pub id: ColorId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "code", default)]
    pub color_code: String,
}

/// A stored product image. `url` is relative to the API origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub url: String,
    #[serde(rename = "couleur", default)]
    pub assigned_color: Option<String>,
    #[serde(rename = "principale", default)]
    pub is_primary: bool,
}

/// A product (`GET /api/products/:id`, and list entries of `GET /api/products`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "prix")]
    pub base_price: Decimal,
    #[serde(rename = "promo", default)]
    pub promo_price: Option<Decimal>,
    #[serde(rename = "revenu", default)]
    pub base_revenue: Decimal,
    #[serde(rename = "categorie_id", default)]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "statut", default)]
    pub status: ProductStatus,
    #[serde(rename = "couleurs", default)]
    pub colors: Vec<ColorRecord>,
    #[serde(rename = "tailles", default)]
    pub sizes: Vec<Size>,
    #[serde(default)]
    pub stock: WireStock,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl ProductRecord {
    /// The image flagged as cover by the server, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ImageRecord> {
        self.images.iter().find(|img| img.is_primary)
    }

    /// Sum of all stock quantities.
    #[must_use]
    pub fn total_stock(&self) -> i64 {
        self.stock.values().sum()
    }
}
