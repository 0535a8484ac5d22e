//! Decimal amounts as entered in admin forms.
//!
//! Prices, revenues and discount values are carried as [`Decimal`] so that the
//! two-decimal precision rule can be checked exactly. Currency formatting is
//! left to whatever renders the value.

use rust_decimal::Decimal;

/// Maximum number of fractional digits accepted for any amount.
pub const MAX_AMOUNT_SCALE: u32 = 2;

/// Returns `true` if `amount` has no more than two significant decimal places.
///
/// Trailing zeros do not count: `10.500` is accepted.
#[must_use]
pub fn has_valid_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MAX_AMOUNT_SCALE
}

/// Parse a user-entered amount.
///
/// Accepts a comma as decimal separator. Returns `None` for empty or
/// non-numeric input so callers can decide whether that means "absent".
#[must_use]
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<Decimal>().ok()
}

/// Render an amount the way the API expects it in form fields (`"19.90"`).
///
/// Only pads to two decimals. Amounts are expected to have passed
/// [`has_valid_scale`]; the form validators refuse anything finer.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let mut padded = amount.normalize();
    padded.rescale(MAX_AMOUNT_SCALE);
    padded.to_string()
}
