//! Product manifests.
//!
//! A manifest is a YAML description of a product form. On create it fills an
//! empty form; on update only the fields it names are changed.
//!
//! ## YAML Format
//!
//! ```yaml
//! title: Linen Shirt
//! description: Breathable summer shirt
//! category_id: 3
//! price: "49.90"
//! promo_price: "39.90"
//! revenue: "20"
//! status: active
//! sizes: [S, M]
//! colors:
//!   - name: Sand
//!     code: "#e0d2b4"
//!     stock: { S: 4, M: 2 }
//!   - name: Olive
//!     code: "#708238"
//!     stock: { S: 1 }
//! images:
//!   - path: images/front.jpg
//!     color: Sand
//!   - path: images/detail.jpg
//! # update only
//! remove_colors: [Olive]
//! remove_images: [6]
//! ```
//!
//! Without sizes, a color's stock is a single number. Image paths are
//! relative to the manifest file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use atelier_core::product::{Color, NewImage, ProductDraft, ProductEdit};
use atelier_core::stock::StockSlot;
use atelier_core::{CategoryId, ImageId, ProductStatus, Size};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::CommandError;

const DEFAULT_COLOR_CODE: &str = "#000000";

/// A product form described in YAML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductManifest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Option<Decimal>,
    pub promo_price: Option<Decimal>,
    /// Drop the promo price on update.
    #[serde(default)]
    pub clear_promo_price: bool,
    pub revenue: Option<Decimal>,
    pub status: Option<ProductStatus>,
    pub sizes: Option<Vec<Size>>,
    #[serde(default)]
    pub colors: Vec<ColorManifest>,
    #[serde(default)]
    pub images: Vec<ImageManifest>,
    #[serde(default)]
    pub remove_colors: Vec<String>,
    #[serde(default)]
    pub remove_images: Vec<ImageId>,
}

/// A color, matched by name against the colors already in the form.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorManifest {
    pub name: String,
    pub code: Option<String>,
    pub stock: Option<ColorStock>,
}

/// Stock of one color: a single quantity, or one per size.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ColorStock {
    Sizeless(i64),
    Sized(BTreeMap<Size, i64>),
}

/// An image file to upload.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageManifest {
    pub path: PathBuf,
    pub color: Option<String>,
}

impl ProductManifest {
    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid manifest.
    #[instrument(fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, CommandError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CommandError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        serde_yaml::from_str(&content).map_err(|source| CommandError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the listed images, resolving paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if an image cannot be read.
    pub async fn read_images(&self, base_dir: &Path) -> Result<Vec<NewImage>, CommandError> {
        let mut images = Vec::with_capacity(self.images.len());
        for entry in &self.images {
            let path = base_dir.join(&entry.path);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| CommandError::Io {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), size = bytes.len(), "Image read");

            let file_name = path
                .file_name()
                .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
            let mut image = NewImage::new(file_name, content_type(&path), bytes);
            image.assigned_color.clone_from(&entry.color);
            images.push(image);
        }
        Ok(images)
    }

    /// The form edits this manifest stands for, in application order.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::UnknownColor` if `remove_colors` names a color
    /// the form does not have.
    pub fn edits(
        &self,
        draft: &ProductDraft,
        images: Vec<NewImage>,
    ) -> Result<Vec<ProductEdit>, CommandError> {
        let mut edits = Vec::new();

        if let Some(title) = &self.title {
            edits.push(ProductEdit::SetTitle(title.clone()));
        }
        if let Some(description) = &self.description {
            edits.push(ProductEdit::SetDescription(description.clone()));
        }
        if let Some(category_id) = self.category_id {
            edits.push(ProductEdit::SetCategory(Some(category_id)));
        }
        if let Some(price) = self.price {
            edits.push(ProductEdit::SetBasePrice(Some(price)));
        }
        if self.clear_promo_price {
            edits.push(ProductEdit::SetPromoPrice(None));
        } else if let Some(price) = self.promo_price {
            edits.push(ProductEdit::SetPromoPrice(Some(price)));
        }
        if let Some(revenue) = self.revenue {
            edits.push(ProductEdit::SetBaseRevenue(revenue));
        }
        if let Some(status) = self.status {
            edits.push(ProductEdit::SetStatus(status));
        }
        if let Some(sizes) = &self.sizes {
            edits.push(ProductEdit::SetSizes(sizes.clone()));
        }

        for name in &self.remove_colors {
            let color = find_color(draft, name)
                .ok_or_else(|| CommandError::UnknownColor(name.clone()))?;
            edits.push(ProductEdit::RemoveColor(color.key));
        }
        for id in &self.remove_images {
            edits.push(ProductEdit::RemoveExistingImage(*id));
        }

        for entry in &self.colors {
            let key = match find_color(draft, &entry.name) {
                Some(existing) => {
                    if let Some(code) = &entry.code {
                        edits.push(ProductEdit::SetColorCode {
                            key: existing.key,
                            color_code: code.clone(),
                        });
                    }
                    existing.key
                }
                None => {
                    let color = Color::new(
                        entry.name.trim(),
                        entry.code.as_deref().unwrap_or(DEFAULT_COLOR_CODE),
                    );
                    let key = color.key;
                    edits.push(ProductEdit::AddColor(color));
                    key
                }
            };

            match &entry.stock {
                None => {}
                Some(ColorStock::Sizeless(quantity)) => edits.push(ProductEdit::SetStock {
                    slot: StockSlot::sizeless(key),
                    quantity: *quantity,
                }),
                Some(ColorStock::Sized(per_size)) => {
                    edits.extend(per_size.iter().map(|(size, quantity)| ProductEdit::SetStock {
                        slot: StockSlot::sized(key, *size),
                        quantity: *quantity,
                    }));
                }
            }
        }

        if !images.is_empty() {
            edits.push(ProductEdit::AddImages(images));
        }
        Ok(edits)
    }
}

fn find_color<'a>(draft: &'a ProductDraft, name: &str) -> Option<&'a Color> {
    let name = name.trim();
    draft
        .colors
        .iter()
        .find(|c| c.name.trim().eq_ignore_ascii_case(name))
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use atelier_core::product::ProductPayload;

    use super::*;

    const MANIFEST: &str = r##"
title: Linen Shirt
category_id: 3
price: "49.90"
revenue: 20
sizes: [S, M]
colors:
  - name: Sand
    code: "#e0d2b4"
    stock: { S: 4, M: 2 }
  - name: Olive
    stock: { S: 1 }
images:
  - path: front.jpg
    color: Sand
"##;

    fn picked(color: Option<&str>) -> NewImage {
        let mut image = NewImage::new("front.jpg", "image/jpeg", vec![1, 2, 3]);
        image.assigned_color = color.map(String::from);
        image
    }

    #[test]
    fn test_parse_manifest() {
        let manifest: ProductManifest = serde_yaml::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.title.as_deref(), Some("Linen Shirt"));
        assert_eq!(manifest.price, Some(Decimal::new(4990, 2)));
        assert_eq!(manifest.revenue, Some(Decimal::new(20, 0)));
        assert_eq!(manifest.sizes, Some(vec![Size::S, Size::M]));
        assert_eq!(manifest.colors.len(), 2);
        assert!(matches!(manifest.colors[0].stock, Some(ColorStock::Sized(ref m)) if m.len() == 2));
        assert_eq!(manifest.images[0].color.as_deref(), Some("Sand"));
    }

    #[test]
    fn test_sizeless_stock_parses_as_number() {
        let manifest: ProductManifest = serde_yaml::from_str(
            "colors:\n  - name: Red\n    stock: 7\n",
        )
        .unwrap();
        assert!(matches!(manifest.colors[0].stock, Some(ColorStock::Sizeless(7))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ProductManifest, _> = serde_yaml::from_str("titel: Typo\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_create_edits_build_payload() {
        let manifest: ProductManifest = serde_yaml::from_str(MANIFEST).unwrap();
        let mut draft = ProductDraft::new();
        for edit in manifest.edits(&draft.clone(), vec![picked(Some("Sand"))]).unwrap() {
            draft.apply(edit).unwrap();
        }

        let payload = ProductPayload::from_draft(&draft).unwrap();
        assert_eq!(payload.stock.get("sand_s"), Some(&4));
        assert_eq!(payload.stock.get("sand_m"), Some(&2));
        assert_eq!(payload.stock.get("olive_s"), Some(&1));
        assert_eq!(payload.colors[1].color_code, DEFAULT_COLOR_CODE);
        assert_eq!(payload.image_colors, vec!["Sand".to_string()]);
    }

    #[test]
    fn test_update_matches_existing_colors_by_name() {
        let mut draft = ProductDraft::new();
        draft.apply(ProductEdit::AddColor(Color::new("Sand", "#ffffff"))).unwrap();
        let sand = draft.colors[0].key;

        let manifest: ProductManifest =
            serde_yaml::from_str("colors:\n  - name: sand\n    code: \"#e0d2b4\"\n    stock: 5\n")
                .unwrap();
        for edit in manifest.edits(&draft.clone(), Vec::new()).unwrap() {
            draft.apply(edit).unwrap();
        }

        assert_eq!(draft.colors.len(), 1);
        assert_eq!(draft.colors[0].color_code, "#e0d2b4");
        assert_eq!(draft.stock.get(StockSlot::sizeless(sand)), 5);
    }

    #[test]
    fn test_removing_unknown_color_fails() {
        let manifest = ProductManifest {
            remove_colors: vec!["Teal".to_string()],
            ..ProductManifest::default()
        };
        let err = manifest.edits(&ProductDraft::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, CommandError::UnknownColor(name) if name == "Teal"));
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type(Path::new("a/front.JPG")), "image/jpeg");
        assert_eq!(content_type(Path::new("b.webp")), "image/webp");
        assert_eq!(content_type(Path::new("notes")), "application/octet-stream");
    }
}
