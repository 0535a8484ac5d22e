//! Promo code commands.
//!
//! # Usage
//!
//! ```bash
//! # List codes, optionally filtered by a code substring
//! atelier promo list --search summer
//!
//! # Create a 10% code valid for June
//! atelier promo create --code SUMMER10 --kind percentage --value 10 \
//!     --from 2026-06-01 --until 2026-06-30
//!
//! # Cap an existing code at 100 uses
//! atelier promo update 4 --max-uses 100
//!
//! # Delete (asks for --yes)
//! atelier promo delete 4 --yes
//! ```

use atelier_admin::{ApiClient, AppError};
use atelier_admin::services::{PromoRow, PromoTable};
use atelier_core::PromoCodeId;
use atelier_core::parse_amount;
use atelier_core::promo::{DiscountKind, PromoEdit};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use super::CommandError;

/// Discount kind as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Percentage,
    Fixed,
}

impl From<KindArg> for DiscountKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Percentage => Self::Percentage,
            KindArg::Fixed => Self::FixedAmount,
        }
    }
}

/// Promo code fields. On update, only the given fields change.
#[derive(Debug, Default, Args)]
pub struct PromoFields {
    /// Code customers type at checkout (stored uppercase)
    #[arg(long)]
    pub code: Option<String>,

    /// Discount kind
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    /// Percentage (1-100) or fixed amount, e.g. `10` or `5,50`
    #[arg(long)]
    pub value: Option<String>,

    /// First valid day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last valid day (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Maximum number of uses
    #[arg(long, conflicts_with = "unlimited")]
    pub max_uses: Option<i64>,

    /// Remove the usage limit
    #[arg(long)]
    pub unlimited: bool,

    /// Whether the code can be used (`true` or `false`)
    #[arg(long)]
    pub active: Option<bool>,
}

impl PromoFields {
    /// Form edits for the given fields. The kind comes first so that a kind
    /// change does not wipe the new value.
    fn edits(&self) -> Result<Vec<PromoEdit>, CommandError> {
        let mut edits = Vec::new();
        if let Some(kind) = self.kind {
            edits.push(PromoEdit::SetDiscountKind(kind.into()));
        }
        if let Some(code) = &self.code {
            edits.push(PromoEdit::SetCode(code.clone()));
        }
        if let Some(raw) = &self.value {
            let value =
                parse_amount(raw).ok_or_else(|| CommandError::InvalidAmount(raw.clone()))?;
            edits.push(PromoEdit::SetValue(Some(value)));
        }
        if let Some(from) = self.from {
            edits.push(PromoEdit::SetValidFrom(Some(from)));
        }
        if let Some(until) = self.until {
            edits.push(PromoEdit::SetValidUntil(Some(until)));
        }
        if self.unlimited {
            edits.push(PromoEdit::SetMaxUses(None));
        } else if let Some(max_uses) = self.max_uses {
            edits.push(PromoEdit::SetMaxUses(Some(max_uses)));
        }
        if let Some(active) = self.active {
            edits.push(PromoEdit::SetActive(active));
        }
        Ok(edits)
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn log_row(row: &PromoRow) {
    info!(
        "{:<6} {:<20} {:>8}  {} .. {}  {:<14} {}",
        format!("#{}", row.id),
        row.code,
        row.discount,
        row.valid_from,
        row.valid_until,
        row.usage,
        row.status
    );
}

async fn loaded(client: ApiClient) -> Result<PromoTable<ApiClient>, CommandError> {
    let mut table = PromoTable::new(client);
    table
        .load()
        .await
        .map_err(CommandError::action("Failed to load promo codes"))?;
    Ok(table)
}

fn log_table(table: &PromoTable<ApiClient>) {
    let rows = table.rows(today());
    if rows.is_empty() {
        info!("No promo codes");
    }
    rows.iter().for_each(log_row);
}

/// List promo codes.
///
/// # Errors
///
/// Returns an error if the list cannot be fetched.
pub async fn list(client: ApiClient, search: Option<String>) -> Result<(), CommandError> {
    let mut table = loaded(client).await?;
    if let Some(query) = search {
        table.set_search(query);
    }
    log_table(&table);
    Ok(())
}

/// Show one promo code.
///
/// # Errors
///
/// Returns an error if the list cannot be fetched or the code is unknown.
pub async fn show(client: ApiClient, id: PromoCodeId) -> Result<(), CommandError> {
    let promo = client
        .get_promo(id)
        .await
        .map_err(AppError::from)
        .map_err(CommandError::action("Failed to load promo code"))?;

    info!("Code:     {}", promo.code);
    info!("Kind:     {}", promo.discount_kind);
    if let Some(discount) = promo.discount() {
        info!("Discount: {discount}");
    }
    info!("Valid:    {} .. {}", promo.valid_from, promo.valid_until);
    info!("Usage:    {}", promo.usage_label());
    info!("Active:   {}", promo.active);
    info!("Status:   {}", promo.display_status(today()));
    Ok(())
}

/// Create a promo code.
///
/// # Errors
///
/// Returns an error if the fields are invalid or the server rejects them.
pub async fn create(client: ApiClient, fields: &PromoFields) -> Result<(), CommandError> {
    let mut table = loaded(client).await?;
    table.open_create();
    submit(&mut table, fields, "Failed to create promo code").await?;
    info!("Promo code created");
    log_table(&table);
    Ok(())
}

/// Update a promo code.
///
/// # Errors
///
/// Returns an error if the code is unknown, the fields are invalid, or the
/// server rejects them.
pub async fn update(
    client: ApiClient,
    id: PromoCodeId,
    fields: &PromoFields,
) -> Result<(), CommandError> {
    let mut table = loaded(client).await?;
    table
        .open_edit(id)
        .map_err(CommandError::action("Failed to update promo code"))?;
    submit(&mut table, fields, "Failed to update promo code").await?;
    info!("Promo code updated");
    log_table(&table);
    Ok(())
}

async fn submit(
    table: &mut PromoTable<ApiClient>,
    fields: &PromoFields,
    default: &'static str,
) -> Result<(), CommandError> {
    for edit in fields.edits()? {
        table.edit(edit).map_err(CommandError::action(default))?;
    }
    table.submit().await.map_err(CommandError::action(default))
}

/// Delete a promo code. Without `confirmed` nothing is sent.
///
/// # Errors
///
/// Returns an error if the code is unknown or the deletion fails.
pub async fn delete(client: ApiClient, id: PromoCodeId, confirmed: bool) -> Result<(), CommandError> {
    let mut table = loaded(client).await?;
    table
        .request_delete(id)
        .map_err(CommandError::action("Failed to delete promo code"))?;

    if !confirmed {
        table.cancel_delete();
        warn!("Not deleted: pass --yes to confirm deleting promo code #{id}");
        return Ok(());
    }

    table
        .confirm_delete()
        .await
        .map_err(CommandError::action("Failed to delete promo code"))?;
    info!("Promo code #{id} deleted");
    Ok(())
}

/// Flip a promo code's `active` flag.
///
/// # Errors
///
/// Returns an error if the toggle fails.
pub async fn toggle(client: ApiClient, id: PromoCodeId) -> Result<(), CommandError> {
    let mut table = loaded(client).await?;
    table
        .toggle_active(id)
        .await
        .map_err(CommandError::action("Failed to change promo code status"))?;

    if let Some(promo) = table.find(id) {
        info!(
            "Promo code {} is now {}",
            promo.code,
            if promo.active { "active" } else { "inactive" }
        );
    }
    Ok(())
}

/// Show usage statistics for a promo code.
///
/// # Errors
///
/// Returns an error if the statistics cannot be fetched.
pub async fn stats(client: ApiClient, id: PromoCodeId) -> Result<(), CommandError> {
    let mut table = PromoTable::new(client);
    let stats = table
        .stats(id)
        .await
        .map_err(CommandError::action("Failed to load promo code statistics"))?;

    info!("Uses:      {}", stats.current_uses);
    match (stats.max_uses, stats.remaining_uses) {
        (Some(max), Some(remaining)) => info!("Limit:     {max} ({remaining} remaining)"),
        (Some(max), None) => info!("Limit:     {max}"),
        (None, _) => info!("Limit:     unlimited"),
    }
    if let Some(status) = stats.status {
        info!("Status:    {status}");
    }
    Ok(())
}

/// Check a code the way checkout does.
///
/// # Errors
///
/// Returns an error if the check cannot be performed.
pub async fn verify(client: ApiClient, code: &str) -> Result<(), CommandError> {
    let mut table = PromoTable::new(client);
    let outcome = table
        .verify(code)
        .await
        .map_err(CommandError::action("Failed to verify promo code"))?;

    let code = code.trim().to_uppercase();
    let detail = outcome
        .message
        .map(|m| format!(": {m}"))
        .unwrap_or_default();
    if outcome.valid {
        info!("{code} is valid{detail}");
        if let Some(discount) = outcome.promo.as_ref().and_then(|p| p.discount()) {
            info!("Discount: {discount}");
        }
    } else {
        warn!("{code} is not valid{detail}");
    }
    Ok(())
}
