//! Promo code form state.
//!
//! The form is a plain serializable value. It only changes through
//! [`PromoDraft::apply`], and only becomes a request body through
//! [`PromoDraft::validate`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DiscountKind, PromoCode};
use crate::types::has_valid_scale;
use crate::validation::{MAX_CODE_LENGTH, ValidationError};

/// Editable promo code fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoDraft {
    pub code: String,
    pub discount_kind: DiscountKind,
    /// Value for the selected kind; the other kind's value is never kept.
    pub value: Option<Decimal>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    /// Signed so that a mistyped `0` or `-1` reaches validation.
    pub max_uses: Option<i64>,
    pub active: bool,
}

impl Default for PromoDraft {
    fn default() -> Self {
        Self {
            code: String::new(),
            discount_kind: DiscountKind::Percentage,
            value: None,
            valid_from: None,
            valid_until: None,
            max_uses: None,
            active: true,
        }
    }
}

/// A single change to a [`PromoDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromoEdit {
    SetCode(String),
    /// Switching kind clears the value: a percentage is not an amount.
    SetDiscountKind(DiscountKind),
    SetValue(Option<Decimal>),
    SetValidFrom(Option<NaiveDate>),
    SetValidUntil(Option<NaiveDate>),
    SetMaxUses(Option<i64>),
    SetActive(bool),
    Reset,
}

/// Validated request body for `POST /api/promo` and `PUT /api/promo/:id`.
///
/// Exactly one of the two value fields is `Some`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoInput {
    pub code: String,
    pub discount_kind: DiscountKind,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub percentage_value: Option<Decimal>,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub fixed_amount_value: Option<Decimal>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub max_uses: Option<u32>,
    pub active: bool,
}

impl PromoDraft {
    /// Pre-fill the form from an existing code.
    #[must_use]
    pub fn from_code(promo: &PromoCode) -> Self {
        let value = match promo.discount_kind {
            DiscountKind::Percentage => promo.percentage_value,
            DiscountKind::FixedAmount => promo.fixed_amount_value,
        };
        Self {
            code: promo.code.clone(),
            discount_kind: promo.discount_kind,
            value,
            valid_from: Some(promo.valid_from),
            valid_until: Some(promo.valid_until),
            max_uses: promo.max_uses.map(i64::from),
            active: promo.active,
        }
    }

    /// Apply one edit and return the new state.
    #[must_use]
    pub fn apply(self, edit: PromoEdit) -> Self {
        match edit {
            PromoEdit::SetCode(code) => Self { code, ..self },
            PromoEdit::SetDiscountKind(kind) if kind == self.discount_kind => self,
            PromoEdit::SetDiscountKind(discount_kind) => Self {
                discount_kind,
                value: None,
                ..self
            },
            PromoEdit::SetValue(value) => Self { value, ..self },
            PromoEdit::SetValidFrom(valid_from) => Self { valid_from, ..self },
            PromoEdit::SetValidUntil(valid_until) => Self {
                valid_until,
                ..self
            },
            PromoEdit::SetMaxUses(max_uses) => Self { max_uses, ..self },
            PromoEdit::SetActive(active) => Self { active, ..self },
            PromoEdit::Reset => Self::default(),
        }
    }

    /// Check the form and build the request body.
    ///
    /// The code is trimmed and uppercased.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`], in field order.
    pub fn validate(&self) -> Result<PromoInput, ValidationError> {
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ValidationError::CodeRequired);
        }
        if code.chars().count() > MAX_CODE_LENGTH {
            return Err(ValidationError::CodeTooLong);
        }

        let value = self.value.ok_or(ValidationError::DiscountValueRequired)?;
        let (percentage_value, fixed_amount_value) = match self.discount_kind {
            DiscountKind::Percentage => {
                if value < Decimal::ONE || value > Decimal::ONE_HUNDRED {
                    return Err(ValidationError::PercentageOutOfRange);
                }
                (Some(value), None)
            }
            DiscountKind::FixedAmount => {
                if value <= Decimal::ZERO {
                    return Err(ValidationError::FixedAmountNotPositive);
                }
                (None, Some(value))
            }
        };
        if !has_valid_scale(value) {
            return Err(ValidationError::TooManyDecimals("value"));
        }

        let valid_from = self.valid_from.ok_or(ValidationError::ValidFromRequired)?;
        let valid_until = self.valid_until.ok_or(ValidationError::ValidUntilRequired)?;
        if valid_until < valid_from {
            return Err(ValidationError::EndBeforeStart);
        }

        let max_uses = match self.max_uses {
            None => None,
            Some(n) => Some(
                u32::try_from(n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ValidationError::MaxUsesNotPositive)?,
            ),
        };

        Ok(PromoInput {
            code,
            discount_kind: self.discount_kind,
            percentage_value,
            fixed_amount_value,
            valid_from,
            valid_until,
            max_uses,
            active: self.active,
        })
    }
}
