//! Promotional discount codes.
//!
//! - [`PromoCode`] is the record returned by the API.
//! - [`status`] derives the display status from validity window, usage
//!   counters and the active flag.
//! - [`draft`] holds the create/edit form state and its reducer.

pub mod draft;
pub mod status;

pub use draft::{PromoDraft, PromoEdit, PromoInput};
pub use status::{PromoStatus, derive_status};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{PromoCodeId, format_amount};

/// How a promo code discounts an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage off (1-100).
    #[default]
    Percentage,
    /// Fixed amount off.
    FixedAmount,
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentage => write!(f, "Percentage"),
            Self::FixedAmount => write!(f, "Fixed Amount"),
        }
    }
}

/// The effective discount carried by a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountValue {
    Percentage(Decimal),
    FixedAmount(Decimal),
}

impl std::fmt::Display for DiscountValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentage(pct) => write!(f, "{}%", pct.normalize()),
            Self::FixedAmount(amount) => f.write_str(&format_amount(*amount)),
        }
    }
}

/// A promo code as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    pub code: String,
    pub discount_kind: DiscountKind,
    #[serde(default)]
    pub percentage_value: Option<Decimal>,
    #[serde(default)]
    pub fixed_amount_value: Option<Decimal>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    /// `None` means unlimited.
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// Server-maintained; never written by the client.
    #[serde(default)]
    pub current_uses: u32,
    pub active: bool,
    /// Status as computed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PromoStatus>,
}

impl PromoCode {
    /// The discount this code grants, if the matching value field is set.
    #[must_use]
    pub fn discount(&self) -> Option<DiscountValue> {
        match self.discount_kind {
            DiscountKind::Percentage => self.percentage_value.map(DiscountValue::Percentage),
            DiscountKind::FixedAmount => self.fixed_amount_value.map(DiscountValue::FixedAmount),
        }
    }

    /// Status to display: the server's when present, otherwise derived locally.
    #[must_use]
    pub fn display_status(&self, today: NaiveDate) -> PromoStatus {
        self.status.unwrap_or_else(|| derive_status(self, today))
    }

    /// Usage rendered as `"3/10 uses"` or `"3 uses"` when unlimited.
    #[must_use]
    pub fn usage_label(&self) -> String {
        self.max_uses.map_or_else(
            || format!("{} uses", self.current_uses),
            |max| format!("{}/{} uses", self.current_uses, max),
        )
    }

    /// Copy of this code with only the `active` flag flipped.
    ///
    /// The server-reported status is dropped since it no longer applies.
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            active: !self.active,
            status: None,
            ..self.clone()
        }
    }
}

/// Case-insensitive substring search on `code` over an already-fetched list.
///
/// An empty or blank query matches everything.
#[must_use]
pub fn filter_by_code<'a>(codes: &'a [PromoCode], query: &str) -> Vec<&'a PromoCode> {
    let needle = query.trim().to_lowercase();
    codes
        .iter()
        .filter(|promo| needle.is_empty() || promo.code.to_lowercase().contains(&needle))
        .collect()
}

/// Usage statistics for a single code (`GET /api/promo/:id/stats`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoStats {
    #[serde(default)]
    pub current_uses: u32,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub remaining_uses: Option<u32>,
    #[serde(default)]
    pub status: Option<PromoStatus>,
}

/// Result of the public code check (`POST /api/promo/verify`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub promo: Option<PromoCode>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A percentage code valid over `[from, until]`, unlimited, active.
    pub fn promo(code: &str, from: NaiveDate, until: NaiveDate) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(1),
            code: code.to_string(),
            discount_kind: DiscountKind::Percentage,
            percentage_value: Some(Decimal::new(10, 0)),
            fixed_amount_value: None,
            valid_from: from,
            valid_until: until,
            max_uses: None,
            current_uses: 0,
            active: true,
            status: None,
        }
    }
}
