//! Product form state and its reducer.
//!
//! [`ProductDraft`] is the whole form as one serializable value. Every change
//! goes through [`ProductDraft::apply`], which either applies an edit
//! completely or rejects it and leaves the draft untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ImageRecord, ProductRecord};
use crate::stock::{StockSlot, StockTable, coerce_quantity};
use crate::types::{
    CategoryId, ColorId, ColorKey, ImageId, ProductId, ProductStatus, Size, has_valid_scale,
};
use crate::validation::{MAX_PRODUCT_IMAGES, ValidationError};

/// Whether the form creates a product or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormMode {
    Create,
    Update(ProductId),
}

/// A color variant in the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub key: ColorKey,
    /// Present iff the color already exists server-side.
    pub id: Option<ColorId>,
    pub name: String,
    pub color_code: String,
}

impl Color {
    /// A color that does not exist server-side yet.
    #[must_use]
    pub fn new(name: impl Into<String>, color_code: impl Into<String>) -> Self {
        Self {
            key: ColorKey::generate(),
            id: None,
            name: name.into(),
            color_code: color_code.into(),
        }
    }
}

/// Session-local identity of a not-yet-uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadKey(Uuid);

impl UploadKey {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for UploadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An image already stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingImage {
    pub id: ImageId,
    pub url: String,
    pub assigned_color: Option<String>,
    /// Server-assigned; displayed, never set by the form.
    pub is_primary: bool,
}

impl From<&ImageRecord> for ExistingImage {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id,
            url: record.url.clone(),
            assigned_color: record.assigned_color.clone(),
            is_primary: record.is_primary,
        }
    }
}

/// An image picked for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub key: UploadKey,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// `None` means "general", not tied to a color.
    pub assigned_color: Option<String>,
}

impl NewImage {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key: UploadKey::generate(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
            assigned_color: None,
        }
    }
}

/// A single change to a [`ProductDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEdit {
    SetTitle(String),
    SetDescription(String),
    SetCategory(Option<CategoryId>),
    SetBasePrice(Option<Decimal>),
    SetPromoPrice(Option<Decimal>),
    SetBaseRevenue(Decimal),
    SetStatus(ProductStatus),

    AddColor(Color),
    /// Image assignments using the old name follow the rename.
    RenameColor { key: ColorKey, name: String },
    SetColorCode { key: ColorKey, color_code: String },
    /// Drops the color's stock and clears image assignments to it. A color
    /// that exists server-side is queued for deletion.
    RemoveColor(ColorKey),
    MoveColor { key: ColorKey, to: usize },

    SetSizes(Vec<Size>),
    ToggleSize(Size),

    SetStock { slot: StockSlot, quantity: i64 },
    /// Raw input; empty or non-numeric becomes 0.
    SetStockInput { slot: StockSlot, input: String },

    /// Refused whole if the total would exceed the image cap.
    AddImages(Vec<NewImage>),
    RemoveNewImage(UploadKey),
    /// Queues the image for server-side deletion.
    RemoveExistingImage(ImageId),
    /// Names that match no current color are stored as `None`.
    AssignNewImageColor { key: UploadKey, color: Option<String> },
    AssignExistingImageColor { id: ImageId, color: Option<String> },
}

/// The product form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub mode: FormMode,
    pub title: String,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub base_price: Option<Decimal>,
    pub promo_price: Option<Decimal>,
    pub base_revenue: Decimal,
    pub status: ProductStatus,
    pub colors: Vec<Color>,
    /// Kept sorted in display order, without duplicates.
    pub sizes: Vec<Size>,
    pub stock: StockTable,
    pub existing_images: Vec<ExistingImage>,
    pub new_images: Vec<NewImage>,
    pub images_to_delete: Vec<ImageId>,
    pub colors_to_delete: Vec<ColorId>,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductDraft {
    /// An empty create form.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            description: String::new(),
            category_id: None,
            base_price: None,
            promo_price: None,
            base_revenue: Decimal::ZERO,
            status: ProductStatus::Active,
            colors: Vec::new(),
            sizes: Vec::new(),
            stock: StockTable::default(),
            existing_images: Vec::new(),
            new_images: Vec::new(),
            images_to_delete: Vec::new(),
            colors_to_delete: Vec::new(),
        }
    }

    /// An update form pre-filled from a loaded product.
    #[must_use]
    pub fn from_record(record: &ProductRecord) -> Self {
        let colors: Vec<Color> = record
            .colors
            .iter()
            .map(|c| Color {
                key: ColorKey::generate(),
                id: Some(c.id),
                name: c.name.clone(),
                color_code: c.color_code.clone(),
            })
            .collect();

        let mut sizes = record.sizes.clone();
        sizes.sort_unstable();
        sizes.dedup();

        let stock = StockTable::decode(&record.stock, &color_refs(&colors));

        Self {
            mode: FormMode::Update(record.id),
            title: record.title.clone(),
            description: record.description.clone().unwrap_or_default(),
            category_id: record.category_id,
            base_price: Some(record.base_price),
            promo_price: record.promo_price,
            base_revenue: record.base_revenue,
            status: record.status,
            colors,
            sizes,
            stock,
            existing_images: record.images.iter().map(ExistingImage::from).collect(),
            new_images: Vec::new(),
            images_to_delete: Vec::new(),
            colors_to_delete: Vec::new(),
        }
    }

    /// Colors with a non-empty trimmed name, in form order.
    pub fn named_colors(&self) -> impl Iterator<Item = &Color> {
        self.colors.iter().filter(|c| !c.name.trim().is_empty())
    }

    /// Names offered when assigning an image to a color.
    #[must_use]
    pub fn color_options(&self) -> Vec<String> {
        self.named_colors().map(|c| c.name.trim().to_string()).collect()
    }

    /// `(key, name)` pairs for stock encoding, in form order.
    #[must_use]
    pub fn color_refs(&self) -> Vec<(ColorKey, &str)> {
        color_refs(&self.colors)
    }

    /// Total images, existing and new.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.existing_images.len() + self.new_images.len()
    }

    /// On create, the first new image becomes the cover by position.
    #[must_use]
    pub fn primary_candidate(&self) -> Option<&NewImage> {
        match self.mode {
            FormMode::Create => self.new_images.first(),
            FormMode::Update(_) => None,
        }
    }

    /// Apply one edit.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooManyImages`] when an image batch would
    /// exceed the cap. The draft is unchanged on error.
    pub fn apply(&mut self, edit: ProductEdit) -> Result<(), ValidationError> {
        match edit {
            ProductEdit::SetTitle(title) => self.title = title,
            ProductEdit::SetDescription(description) => self.description = description,
            ProductEdit::SetCategory(category_id) => self.category_id = category_id,
            ProductEdit::SetBasePrice(price) => self.base_price = price,
            ProductEdit::SetPromoPrice(price) => self.promo_price = price,
            ProductEdit::SetBaseRevenue(revenue) => self.base_revenue = revenue,
            ProductEdit::SetStatus(status) => self.status = status,

            ProductEdit::AddColor(color) => self.colors.push(color),
            ProductEdit::RenameColor { key, name } => self.rename_color(key, name),
            ProductEdit::SetColorCode { key, color_code } => {
                if let Some(color) = self.colors.iter_mut().find(|c| c.key == key) {
                    color.color_code = color_code;
                }
            }
            ProductEdit::RemoveColor(key) => self.remove_color(key),
            ProductEdit::MoveColor { key, to } => {
                if let Some(from) = self.colors.iter().position(|c| c.key == key) {
                    let color = self.colors.remove(from);
                    let to = to.min(self.colors.len());
                    self.colors.insert(to, color);
                }
            }

            ProductEdit::SetSizes(mut sizes) => {
                sizes.sort_unstable();
                sizes.dedup();
                self.sizes = sizes;
            }
            ProductEdit::ToggleSize(size) => {
                if let Some(pos) = self.sizes.iter().position(|s| *s == size) {
                    self.sizes.remove(pos);
                } else {
                    self.sizes.push(size);
                    self.sizes.sort_unstable();
                }
            }

            ProductEdit::SetStock { slot, quantity } => self.stock.set(slot, quantity),
            ProductEdit::SetStockInput { slot, input } => {
                self.stock.set(slot, coerce_quantity(&input));
            }

            ProductEdit::AddImages(images) => {
                let attempted = self.image_count() + images.len();
                if attempted > MAX_PRODUCT_IMAGES {
                    return Err(ValidationError::TooManyImages { attempted });
                }
                let options = self.color_options();
                self.new_images.extend(images.into_iter().map(|mut img| {
                    img.assigned_color = known_color(&options, img.assigned_color);
                    img
                }));
            }
            ProductEdit::RemoveNewImage(key) => self.new_images.retain(|img| img.key != key),
            ProductEdit::RemoveExistingImage(id) => {
                if let Some(pos) = self.existing_images.iter().position(|img| img.id == id) {
                    self.existing_images.remove(pos);
                    self.images_to_delete.push(id);
                }
            }
            ProductEdit::AssignNewImageColor { key, color } => {
                let color = known_color(&self.color_options(), color);
                if let Some(img) = self.new_images.iter_mut().find(|img| img.key == key) {
                    img.assigned_color = color;
                }
            }
            ProductEdit::AssignExistingImageColor { id, color } => {
                let color = known_color(&self.color_options(), color);
                if let Some(img) = self.existing_images.iter_mut().find(|img| img.id == id) {
                    img.assigned_color = color;
                }
            }
        }
        Ok(())
    }

    fn rename_color(&mut self, key: ColorKey, name: String) {
        let Some(color) = self.colors.iter_mut().find(|c| c.key == key) else {
            return;
        };
        let old = color.name.trim().to_string();
        let new = name.trim().to_string();
        color.name = name;

        let follow = |assigned: &mut Option<String>| {
            if assigned.as_deref() == Some(old.as_str()) {
                *assigned = (!new.is_empty()).then(|| new.clone());
            }
        };
        self.new_images
            .iter_mut()
            .for_each(|img| follow(&mut img.assigned_color));
        self.existing_images
            .iter_mut()
            .for_each(|img| follow(&mut img.assigned_color));
    }

    fn remove_color(&mut self, key: ColorKey) {
        let Some(pos) = self.colors.iter().position(|c| c.key == key) else {
            return;
        };
        let color = self.colors.remove(pos);
        self.stock.remove_color(key);

        if let Some(id) = color.id {
            self.colors_to_delete.push(id);
        }

        let name = color.name.trim();
        let still_named = self.colors.iter().any(|c| c.name.trim() == name);
        if !still_named {
            let clear = |assigned: &mut Option<String>| {
                if assigned.as_deref() == Some(name) {
                    *assigned = None;
                }
            };
            self.new_images
                .iter_mut()
                .for_each(|img| clear(&mut img.assigned_color));
            self.existing_images
                .iter_mut()
                .for_each(|img| clear(&mut img.assigned_color));
        }
    }

    /// Check the form before submission.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule: title, category, base price, revenue,
    /// colors, images, then promo price. Amounts with more than two decimal
    /// places are refused rather than rounded.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if self.category_id.is_none() {
            return Err(ValidationError::CategoryRequired);
        }
        let Some(base_price) = self.base_price.filter(|price| *price > Decimal::ZERO) else {
            return Err(ValidationError::BasePriceNotPositive);
        };
        if !has_valid_scale(base_price) {
            return Err(ValidationError::TooManyDecimals("base_price"));
        }
        if self.base_revenue < Decimal::ZERO {
            return Err(ValidationError::BaseRevenueNegative);
        }
        if !has_valid_scale(self.base_revenue) {
            return Err(ValidationError::TooManyDecimals("base_revenue"));
        }
        if self.named_colors().next().is_none() {
            return Err(ValidationError::ColorRequired);
        }
        if self.image_count() == 0 {
            return Err(ValidationError::ImageRequired);
        }
        if let Some(promo_price) = self.promo_price {
            if promo_price <= Decimal::ZERO {
                return Err(ValidationError::PromoPriceNotPositive);
            }
            if !has_valid_scale(promo_price) {
                return Err(ValidationError::TooManyDecimals("promo_price"));
            }
        }
        Ok(())
    }
}

fn color_refs(colors: &[Color]) -> Vec<(ColorKey, &str)> {
    colors.iter().map(|c| (c.key, c.name.as_str())).collect()
}

fn known_color(options: &[String], color: Option<String>) -> Option<String> {
    let name = color?.trim().to_string();
    options.contains(&name).then_some(name)
}
