//! Derived promo code status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PromoCode;

/// Display classification of a promo code.
///
/// Computed from stored fields, never stored itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoStatus {
    /// Usable right now.
    Active,
    /// Switched off by an administrator.
    Inactive,
    /// Past its end date.
    Expired,
    /// Before its start date.
    Upcoming,
    /// Usage cap reached.
    Exhausted,
}

impl std::fmt::Display for PromoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
            Self::Expired => write!(f, "Expired"),
            Self::Upcoming => write!(f, "Upcoming"),
            Self::Exhausted => write!(f, "Exhausted"),
        }
    }
}

/// Derive the status of `promo` on `today`.
///
/// Checks run in a fixed order and the first match wins:
/// exhausted, expired, upcoming, inactive, active. A code that is both
/// exhausted and expired is `Exhausted`; an inactive code outside its window
/// reports the window state.
#[must_use]
pub fn derive_status(promo: &PromoCode, today: NaiveDate) -> PromoStatus {
    if promo
        .max_uses
        .is_some_and(|max| promo.current_uses >= max)
    {
        PromoStatus::Exhausted
    } else if today > promo.valid_until {
        PromoStatus::Expired
    } else if today < promo.valid_from {
        PromoStatus::Upcoming
    } else if !promo.active {
        PromoStatus::Inactive
    } else {
        PromoStatus::Active
    }
}
