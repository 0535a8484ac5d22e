//! Multipart request content for product create and update.
//!
//! [`ProductPayload`] is built from a validated [`ProductDraft`] and carries
//! everything the API's multipart form expects. Turning it into an actual
//! HTTP body is the client's job; [`ProductPayload::text_fields`] gives the
//! ordered text parts, and [`ProductPayload::images`] the binary ones.

use rust_decimal::Decimal;
use serde::Serialize;

use super::draft::{FormMode, ProductDraft};
use crate::stock::WireStock;
use crate::types::{CategoryId, ColorId, ImageId, ProductId, ProductStatus, Size, format_amount};
use crate::validation::ValidationError;

/// A color entry of the `couleurs` field. New colors carry no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ColorId>,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "code")]
    pub color_code: String,
}

/// An entry of the `existingImages` field: a kept image and its color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingImagePayload {
    pub id: ImageId,
    #[serde(rename = "couleur")]
    pub assigned_color: Option<String>,
}

/// One binary `images` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fields only sent on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateExtras {
    pub product_id: ProductId,
    pub existing_images: Vec<ExistingImagePayload>,
    pub images_to_delete: Vec<ImageId>,
    pub colors_to_delete: Vec<ColorId>,
}

/// Everything sent by `POST /api/products` or `PUT /api/products/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPayload {
    pub title: String,
    pub description: String,
    pub base_revenue: Decimal,
    pub base_price: Decimal,
    pub promo_price: Option<Decimal>,
    pub category_id: CategoryId,
    pub status: ProductStatus,
    pub colors: Vec<ColorPayload>,
    pub sizes: Vec<Size>,
    pub stock: WireStock,
    pub images: Vec<UploadFile>,
    /// One entry per `images` part, same order; empty string means "general".
    pub image_colors: Vec<String>,
    pub update: Option<UpdateExtras>,
}

impl ProductPayload {
    /// Validate `draft` and build its payload.
    ///
    /// # Errors
    ///
    /// Returns the draft's first [`ValidationError`].
    pub fn from_draft(draft: &ProductDraft) -> Result<Self, ValidationError> {
        draft.validate()?;

        let (Some(category_id), Some(base_price)) = (draft.category_id, draft.base_price) else {
            // validate() guarantees both
            return Err(ValidationError::CategoryRequired);
        };

        let colors = draft
            .named_colors()
            .map(|c| ColorPayload {
                id: c.id,
                name: c.name.trim().to_string(),
                color_code: c.color_code.clone(),
            })
            .collect();

        let images = draft
            .new_images
            .iter()
            .map(|img| UploadFile {
                file_name: img.file_name.clone(),
                content_type: img.content_type.clone(),
                bytes: img.bytes.clone(),
            })
            .collect();
        let image_colors = draft
            .new_images
            .iter()
            .map(|img| img.assigned_color.clone().unwrap_or_default())
            .collect();

        let update = match draft.mode {
            FormMode::Create => None,
            FormMode::Update(product_id) => Some(UpdateExtras {
                product_id,
                existing_images: draft
                    .existing_images
                    .iter()
                    .map(|img| ExistingImagePayload {
                        id: img.id,
                        assigned_color: img.assigned_color.clone(),
                    })
                    .collect(),
                images_to_delete: draft.images_to_delete.clone(),
                colors_to_delete: draft.colors_to_delete.clone(),
            }),
        };

        Ok(Self {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            base_revenue: draft.base_revenue,
            base_price,
            promo_price: draft.promo_price,
            category_id,
            status: draft.status,
            colors,
            sizes: draft.sizes.clone(),
            stock: draft.stock.encode(&draft.color_refs()),
            images,
            image_colors,
            update,
        })
    }

    /// Text parts of the multipart form, in the order the API documents them.
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON-encoded field fails to serialize.
    pub fn text_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut fields = vec![
            ("titre", self.title.clone()),
            ("description", self.description.clone()),
            ("revenu", format_amount(self.base_revenue)),
            ("prix", format_amount(self.base_price)),
            (
                "promo",
                self.promo_price.map(format_amount).unwrap_or_default(),
            ),
            ("categorie_id", self.category_id.to_string()),
            ("statut", self.status.as_str().to_string()),
            ("couleurs", serde_json::to_string(&self.colors)?),
            ("tailles", serde_json::to_string(&self.sizes)?),
            ("stock", serde_json::to_string(&self.stock)?),
            ("imageColors", serde_json::to_string(&self.image_colors)?),
        ];

        if let Some(extras) = &self.update {
            fields.push((
                "existingImages",
                serde_json::to_string(&extras.existing_images)?,
            ));
            fields.push((
                "imagesToDelete",
                serde_json::to_string(&extras.images_to_delete)?,
            ));
            fields.push((
                "couleursToDelete",
                serde_json::to_string(&extras.colors_to_delete)?,
            ));
        }
        Ok(fields)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::product::draft::tests::{image, loaded_record, valid_draft};
    use crate::product::{Color, ProductEdit};
    use crate::stock::StockSlot;

    fn field<'a>(fields: &'a [(&'static str, String)], name: &str) -> &'a str {
        fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn test_create_payload_fields() {
        let mut draft = valid_draft();
        let sand = draft.colors[0].key;
        draft
            .apply(ProductEdit::SetStock {
                slot: StockSlot::sizeless(sand),
                quantity: 12,
            })
            .unwrap();
        let key = draft.new_images[0].key;
        draft
            .apply(ProductEdit::AssignNewImageColor {
                key,
                color: Some("Sand".to_string()),
            })
            .unwrap();
        draft.apply(ProductEdit::AddImages(vec![image("back.jpg")])).unwrap();

        let payload = ProductPayload::from_draft(&draft).unwrap();
        assert!(payload.update.is_none());
        assert_eq!(payload.images.len(), 2);

        let fields = payload.text_fields().unwrap();
        let names: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec![
                "titre",
                "description",
                "revenu",
                "prix",
                "promo",
                "categorie_id",
                "statut",
                "couleurs",
                "tailles",
                "stock",
                "imageColors"
            ]
        );
        assert_eq!(field(&fields, "prix"), "49.90");
        assert_eq!(field(&fields, "promo"), "");
        assert_eq!(field(&fields, "statut"), "active");
        assert_eq!(
            field(&fields, "couleurs"),
            r##"[{"nom":"Sand","code":"#e0d2b4"}]"##
        );
        assert_eq!(field(&fields, "tailles"), "[]");
        assert_eq!(field(&fields, "stock"), r#"{"couleur_0":12}"#);
        assert_eq!(field(&fields, "imageColors"), r#"["Sand",""]"#);
    }

    #[test]
    fn test_amounts_are_never_rounded_into_the_form() {
        let mut draft = valid_draft();
        draft.apply(ProductEdit::SetBasePrice(Some(Decimal::new(5, 3)))).unwrap();
        assert_eq!(
            ProductPayload::from_draft(&draft).unwrap_err(),
            ValidationError::TooManyDecimals("base_price")
        );

        draft.apply(ProductEdit::SetBasePrice(Some(Decimal::new(19999, 3)))).unwrap();
        assert!(ProductPayload::from_draft(&draft).is_err());

        draft.apply(ProductEdit::SetBasePrice(Some(Decimal::new(1999, 2)))).unwrap();
        draft.apply(ProductEdit::SetPromoPrice(Some(Decimal::new(15, 0)))).unwrap();
        let fields = ProductPayload::from_draft(&draft).unwrap().text_fields().unwrap();
        assert_eq!(field(&fields, "prix"), "19.99");
        assert_eq!(field(&fields, "promo"), "15.00");
    }

    #[test]
    fn test_blank_colors_are_not_sent() {
        let mut draft = valid_draft();
        draft.apply(ProductEdit::AddColor(Color::new("  ", "#ffffff"))).unwrap();
        let payload = ProductPayload::from_draft(&draft).unwrap();
        assert_eq!(payload.colors.len(), 1);
    }

    #[test]
    fn test_unedited_update_round_trips() {
        let record = loaded_record();
        let draft = ProductDraft::from_record(&record);
        let payload = ProductPayload::from_draft(&draft).unwrap();

        let color_ids: Vec<Option<ColorId>> = payload.colors.iter().map(|c| c.id).collect();
        let loaded_ids: Vec<Option<ColorId>> = record.colors.iter().map(|c| Some(c.id)).collect();
        assert_eq!(color_ids, loaded_ids);

        let extras = payload.update.as_ref().unwrap();
        assert_eq!(extras.product_id, record.id);
        let image_ids: Vec<ImageId> = extras.existing_images.iter().map(|i| i.id).collect();
        assert_eq!(image_ids, vec![ImageId::new(5), ImageId::new(6)]);
        assert!(extras.images_to_delete.is_empty());
        assert!(extras.colors_to_delete.is_empty());

        assert_eq!(payload.stock, record.stock);
        assert!(payload.images.is_empty());
    }

    #[test]
    fn test_update_fields_include_deletions() {
        let mut draft = ProductDraft::from_record(&loaded_record());
        let olive = draft.colors[1].key;
        draft.apply(ProductEdit::RemoveColor(olive)).unwrap();
        draft.apply(ProductEdit::RemoveExistingImage(ImageId::new(6))).unwrap();

        let fields = ProductPayload::from_draft(&draft)
            .unwrap()
            .text_fields()
            .unwrap();
        assert_eq!(field(&fields, "imagesToDelete"), "[6]");
        assert_eq!(field(&fields, "couleursToDelete"), "[2]");
        assert_eq!(
            field(&fields, "existingImages"),
            r#"[{"id":5,"couleur":"Sand"}]"#
        );
        assert_eq!(
            field(&fields, "stock"),
            r#"{"couleur_0":9,"sand_m":2,"sand_s":4}"#
        );
    }

    #[test]
    fn test_invalid_draft_has_no_payload() {
        let mut draft = valid_draft();
        draft.apply(ProductEdit::SetTitle(String::new())).unwrap();
        assert_eq!(
            ProductPayload::from_draft(&draft),
            Err(ValidationError::TitleRequired)
        );
    }
}
