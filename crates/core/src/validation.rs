//! Local, pre-submission validation failures.
//!
//! A [`ValidationError`] blocks a request entirely: nothing is sent to the
//! server. Each variant is attributed to the form field that caused it so the
//! caller can highlight it.

use thiserror::Error;

/// Maximum length of a promo code.
pub const MAX_CODE_LENGTH: usize = 50;

/// Maximum number of images (existing + new) a product may carry.
pub const MAX_PRODUCT_IMAGES: usize = 10;

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // Promo codes
    #[error("Promo code is required")]
    CodeRequired,

    #[error("Promo code must be at most {} characters", MAX_CODE_LENGTH)]
    CodeTooLong,

    #[error("Percentage must be between 1 and 100")]
    PercentageOutOfRange,

    #[error("Fixed amount must be greater than 0")]
    FixedAmountNotPositive,

    #[error("Discount value is required")]
    DiscountValueRequired,

    #[error("{0} accepts at most 2 decimal places")]
    TooManyDecimals(&'static str),

    #[error("Start date is required")]
    ValidFromRequired,

    #[error("End date is required")]
    ValidUntilRequired,

    #[error("End date must be on or after the start date")]
    EndBeforeStart,

    #[error("Maximum uses must be a positive number")]
    MaxUsesNotPositive,

    // Products
    #[error("Title is required")]
    TitleRequired,

    #[error("Category is required")]
    CategoryRequired,

    #[error("Price must be greater than 0")]
    BasePriceNotPositive,

    #[error("Revenue must be 0 or more")]
    BaseRevenueNegative,

    #[error("At least one color is required")]
    ColorRequired,

    #[error("At least one image is required")]
    ImageRequired,

    #[error("Promo price must be greater than 0")]
    PromoPriceNotPositive,

    #[error("A product can have at most {} images ({attempted} requested)", MAX_PRODUCT_IMAGES)]
    TooManyImages { attempted: usize },
}

impl ValidationError {
    /// The form field this error is attributed to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::CodeRequired | Self::CodeTooLong => "code",
            Self::PercentageOutOfRange | Self::FixedAmountNotPositive | Self::DiscountValueRequired => {
                "value"
            }
            Self::TooManyDecimals(field) => *field,
            Self::ValidFromRequired => "valid_from",
            Self::ValidUntilRequired | Self::EndBeforeStart => "valid_until",
            Self::MaxUsesNotPositive => "max_uses",
            Self::TitleRequired => "title",
            Self::CategoryRequired => "category",
            Self::BasePriceNotPositive => "base_price",
            Self::BaseRevenueNegative => "base_revenue",
            Self::ColorRequired => "colors",
            Self::ImageRequired | Self::TooManyImages { .. } => "images",
            Self::PromoPriceNotPositive => "promo_price",
        }
    }
}
