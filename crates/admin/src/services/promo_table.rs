//! Promo code table orchestrator.
//!
//! Holds the fetched list, the search query, the editor context and the
//! pending deletion. Every mutation goes to the server and is followed by a
//! re-fetch; the list is never patched locally.
//!
//! A failed call records a message for the operator (the server's message
//! when it sent one, otherwise a per-operation default) and leaves the table
//! and the editor as they were.

use atelier_core::PromoCodeId;
use atelier_core::promo::{
    PromoCode, PromoDraft, PromoEdit, PromoStats, PromoStatus, VerifyOutcome, filter_by_code,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::PromoBackend;
use crate::error::AppError;

const LOAD_FAILED: &str = "Failed to load promo codes";
const CREATE_FAILED: &str = "Failed to create promo code";
const UPDATE_FAILED: &str = "Failed to update promo code";
const DELETE_FAILED: &str = "Failed to delete promo code";
const TOGGLE_FAILED: &str = "Failed to change promo code status";
const STATS_FAILED: &str = "Failed to load promo code statistics";
const VERIFY_FAILED: &str = "Failed to verify promo code";

/// Which form, if any, is open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromoEditor {
    #[default]
    Closed,
    Creating(PromoDraft),
    Editing { id: PromoCodeId, draft: PromoDraft },
}

impl PromoEditor {
    /// The open form's state.
    #[must_use]
    pub const fn draft(&self) -> Option<&PromoDraft> {
        match self {
            Self::Closed => None,
            Self::Creating(draft) | Self::Editing { draft, .. } => Some(draft),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// One rendered table line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoRow {
    pub id: PromoCodeId,
    pub code: String,
    /// `"10%"`, `"5.00"`, or `"-"` when the record carries no value.
    pub discount: String,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub usage: String,
    pub status: PromoStatus,
    pub active: bool,
}

impl PromoRow {
    fn new(promo: &PromoCode, today: NaiveDate) -> Self {
        Self {
            id: promo.id,
            code: promo.code.clone(),
            discount: promo
                .discount()
                .map_or_else(|| "-".to_string(), |d| d.to_string()),
            valid_from: promo.valid_from,
            valid_until: promo.valid_until,
            usage: promo.usage_label(),
            status: promo.display_status(today),
            active: promo.active,
        }
    }
}

/// Promo code table state and actions.
#[derive(Debug)]
pub struct PromoTable<B> {
    backend: B,
    codes: Vec<PromoCode>,
    search: String,
    editor: PromoEditor,
    pending_delete: Option<PromoCodeId>,
    last_error: Option<String>,
}

impl<B: PromoBackend> PromoTable<B> {
    /// An empty table; call [`PromoTable::load`] to fetch.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            codes: Vec::new(),
            search: String::new(),
            editor: PromoEditor::Closed,
            pending_delete: None,
            last_error: None,
        }
    }

    /// Fetch the list, replacing what was shown.
    ///
    /// # Errors
    ///
    /// Returns the API error; the previous list is kept.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), AppError> {
        self.last_error = None;
        self.refresh().await
    }

    async fn refresh(&mut self) -> Result<(), AppError> {
        match self.backend.list_promos().await {
            Ok(codes) => {
                info!(count = codes.len(), "Promo codes loaded");
                self.codes = codes;
                Ok(())
            }
            Err(err) => Err(self.fail(err.into(), LOAD_FAILED)),
        }
    }

    /// Everything fetched, unfiltered.
    #[must_use]
    pub fn codes(&self) -> &[PromoCode] {
        &self.codes
    }

    #[must_use]
    pub fn find(&self, id: PromoCodeId) -> Option<&PromoCode> {
        self.codes.iter().find(|promo| promo.id == id)
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Codes matching the search query, in fetch order.
    #[must_use]
    pub fn visible(&self) -> Vec<&PromoCode> {
        filter_by_code(&self.codes, &self.search)
    }

    /// Rows for the visible codes.
    #[must_use]
    pub fn rows(&self, today: NaiveDate) -> Vec<PromoRow> {
        self.visible()
            .into_iter()
            .map(|promo| PromoRow::new(promo, today))
            .collect()
    }

    #[must_use]
    pub const fn editor(&self) -> &PromoEditor {
        &self.editor
    }

    /// Message from the last failed action, cleared by the next action.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Open an empty create form.
    pub fn open_create(&mut self) {
        self.editor = PromoEditor::Creating(PromoDraft::default());
    }

    /// Open the edit form pre-filled from a listed code.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the code is not in the fetched list.
    pub fn open_edit(&mut self, id: PromoCodeId) -> Result<(), AppError> {
        let promo = self
            .find(id)
            .ok_or_else(|| AppError::NotFound(format!("promo code {id}")))?;
        self.editor = PromoEditor::Editing {
            id,
            draft: PromoDraft::from_code(promo),
        };
        Ok(())
    }

    /// Close the form, discarding its state.
    pub fn close_editor(&mut self) {
        self.editor = PromoEditor::Closed;
    }

    /// Apply one edit to the open form.
    ///
    /// # Errors
    ///
    /// Returns `AppError::EditorClosed` if no form is open.
    pub fn edit(&mut self, edit: PromoEdit) -> Result<(), AppError> {
        self.editor = match std::mem::take(&mut self.editor) {
            PromoEditor::Closed => return Err(AppError::EditorClosed),
            PromoEditor::Creating(draft) => PromoEditor::Creating(draft.apply(edit)),
            PromoEditor::Editing { id, draft } => PromoEditor::Editing {
                id,
                draft: draft.apply(edit),
            },
        };
        Ok(())
    }

    /// Submit the open form as a create or an update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::EditorClosed` if no form is open, otherwise the
    /// error of [`PromoTable::create`] or [`PromoTable::update`].
    pub async fn submit(&mut self) -> Result<(), AppError> {
        match self.editor.clone() {
            PromoEditor::Closed => Err(AppError::EditorClosed),
            PromoEditor::Creating(draft) => self.create(&draft).await,
            PromoEditor::Editing { id, draft } => self.update(id, &draft).await,
        }
    }

    /// Validate and create a code. On success the create form is closed and
    /// cleared and the list re-fetched.
    ///
    /// # Errors
    ///
    /// Returns a validation error (nothing is sent) or the API error.
    #[instrument(skip(self, draft), fields(code = %draft.code))]
    pub async fn create(&mut self, draft: &PromoDraft) -> Result<(), AppError> {
        self.last_error = None;
        let input = draft
            .validate()
            .map_err(|err| self.fail(err.into(), CREATE_FAILED))?;

        self.backend
            .create_promo(&input)
            .await
            .map_err(|err| self.fail(err.into(), CREATE_FAILED))?;
        info!(code = %input.code, "Promo code created");

        if matches!(self.editor, PromoEditor::Creating(_)) {
            self.editor = PromoEditor::Closed;
        }
        self.refresh().await
    }

    /// Validate and update a code. On success the edit form for that code
    /// is closed and the list re-fetched.
    ///
    /// # Errors
    ///
    /// Returns a validation error (nothing is sent) or the API error.
    #[instrument(skip(self, draft), fields(promo_id = %id))]
    pub async fn update(&mut self, id: PromoCodeId, draft: &PromoDraft) -> Result<(), AppError> {
        self.last_error = None;
        let input = draft
            .validate()
            .map_err(|err| self.fail(err.into(), UPDATE_FAILED))?;

        self.backend
            .update_promo(id, &input)
            .await
            .map_err(|err| self.fail(err.into(), UPDATE_FAILED))?;
        info!(promo_id = %id, code = %input.code, "Promo code updated");

        if matches!(self.editor, PromoEditor::Editing { id: open, .. } if open == id) {
            self.editor = PromoEditor::Closed;
        }
        self.refresh().await
    }

    /// First phase of deletion: remember which code to delete.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the code is not in the fetched list.
    pub fn request_delete(&mut self, id: PromoCodeId) -> Result<(), AppError> {
        if self.find(id).is_none() {
            return Err(AppError::NotFound(format!("promo code {id}")));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    #[must_use]
    pub const fn pending_delete(&self) -> Option<PromoCodeId> {
        self.pending_delete
    }

    /// Second phase of deletion. On failure the request stays pending.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoPendingDeletion` if nothing was requested, or
    /// the API error.
    #[instrument(skip(self))]
    pub async fn confirm_delete(&mut self) -> Result<(), AppError> {
        self.last_error = None;
        let id = self.pending_delete.ok_or(AppError::NoPendingDeletion)?;

        self.backend
            .delete_promo(id)
            .await
            .map_err(|err| self.fail(err.into(), DELETE_FAILED))?;
        info!(promo_id = %id, "Promo code deleted");

        self.pending_delete = None;
        if matches!(self.editor, PromoEditor::Editing { id: open, .. } if open == id) {
            self.editor = PromoEditor::Closed;
        }
        self.refresh().await
    }

    /// Flip a code's `active` flag server-side, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self), fields(promo_id = %id))]
    pub async fn toggle_active(&mut self, id: PromoCodeId) -> Result<(), AppError> {
        self.last_error = None;
        self.backend
            .toggle_promo(id)
            .await
            .map_err(|err| self.fail(err.into(), TOGGLE_FAILED))?;
        info!(promo_id = %id, "Promo code toggled");
        self.refresh().await
    }

    /// Usage statistics for one code.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn stats(&mut self, id: PromoCodeId) -> Result<PromoStats, AppError> {
        self.last_error = None;
        let result = self.backend.promo_stats(id).await;
        result.map_err(|err| self.fail(err.into(), STATS_FAILED))
    }

    /// Check a code the way the storefront does.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn verify(&mut self, code: &str) -> Result<VerifyOutcome, AppError> {
        self.last_error = None;
        let result = self.backend.verify_promo(code).await;
        result.map_err(|err| self.fail(err.into(), VERIFY_FAILED))
    }

    fn fail(&mut self, err: AppError, default: &str) -> AppError {
        let message = err.user_message(default);
        warn!(error = %err, "{message}");
        self.last_error = Some(message);
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::{Arc, Mutex};

    use atelier_core::ValidationError;
    use atelier_core::promo::{DiscountKind, PromoInput};
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::ApiError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn promo(id: i64, code: &str) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(id),
            code: code.to_string(),
            discount_kind: DiscountKind::Percentage,
            percentage_value: Some(Decimal::new(10, 0)),
            fixed_amount_value: None,
            valid_from: date(2026, 10, 1),
            valid_until: date(2026, 10, 31),
            max_uses: None,
            current_uses: 0,
            active: true,
            status: None,
        }
    }

    #[derive(Default)]
    struct State {
        codes: Vec<PromoCode>,
        next_id: i64,
        calls: Vec<String>,
        fail_with: Option<String>,
    }

    /// In-memory promo API.
    #[derive(Clone, Default)]
    struct FakePromoApi {
        state: Arc<Mutex<State>>,
    }

    impl FakePromoApi {
        fn with_codes(codes: Vec<PromoCode>) -> Self {
            let api = Self::default();
            {
                let mut state = api.state.lock().unwrap();
                state.next_id = 100;
                state.codes = codes;
            }
            api
        }

        fn fail_next(&self, message: &str) {
            self.state.lock().unwrap().fail_with = Some(message.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }

        fn call(&self, name: String) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(name);
            match state.fail_with.take() {
                Some(message) => Err(ApiError::Server {
                    status: 400,
                    message: Some(message),
                }),
                None => Ok(state),
            }
        }
    }

    fn record(input: &PromoInput, id: PromoCodeId) -> PromoCode {
        PromoCode {
            id,
            code: input.code.clone(),
            discount_kind: input.discount_kind,
            percentage_value: input.percentage_value,
            fixed_amount_value: input.fixed_amount_value,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            max_uses: input.max_uses,
            current_uses: 0,
            active: input.active,
            status: None,
        }
    }

    impl PromoBackend for FakePromoApi {
        async fn list_promos(&self) -> Result<Vec<PromoCode>, ApiError> {
            Ok(self.call("list".to_string())?.codes.clone())
        }

        async fn create_promo(&self, input: &PromoInput) -> Result<(), ApiError> {
            let mut state = self.call(format!("create {}", input.code))?;
            state.next_id += 1;
            let id = PromoCodeId::new(state.next_id);
            state.codes.push(record(input, id));
            Ok(())
        }

        async fn update_promo(&self, id: PromoCodeId, input: &PromoInput) -> Result<(), ApiError> {
            let mut state = self.call(format!("update {id}"))?;
            if let Some(promo) = state.codes.iter_mut().find(|p| p.id == id) {
                let current_uses = promo.current_uses;
                *promo = PromoCode {
                    current_uses,
                    ..record(input, id)
                };
            }
            Ok(())
        }

        async fn delete_promo(&self, id: PromoCodeId) -> Result<(), ApiError> {
            let mut state = self.call(format!("delete {id}"))?;
            state.codes.retain(|p| p.id != id);
            Ok(())
        }

        async fn toggle_promo(&self, id: PromoCodeId) -> Result<(), ApiError> {
            let mut state = self.call(format!("toggle {id}"))?;
            if let Some(promo) = state.codes.iter_mut().find(|p| p.id == id) {
                *promo = promo.toggled();
            }
            Ok(())
        }

        async fn promo_stats(&self, id: PromoCodeId) -> Result<PromoStats, ApiError> {
            let state = self.call(format!("stats {id}"))?;
            let promo = state.codes.iter().find(|p| p.id == id).ok_or(ApiError::Server {
                status: 404,
                message: Some("Promo code not found".to_string()),
            })?;
            Ok(PromoStats {
                current_uses: promo.current_uses,
                max_uses: promo.max_uses,
                remaining_uses: promo.max_uses.map(|max| max.saturating_sub(promo.current_uses)),
                status: promo.status,
            })
        }

        async fn verify_promo(&self, code: &str) -> Result<VerifyOutcome, ApiError> {
            let state = self.call(format!("verify {code}"))?;
            let promo = state.codes.iter().find(|p| p.code == code).cloned();
            Ok(VerifyOutcome {
                valid: promo.as_ref().is_some_and(|p| p.active),
                message: None,
                promo,
            })
        }
    }

    async fn loaded(codes: Vec<PromoCode>) -> (PromoTable<FakePromoApi>, FakePromoApi) {
        let api = FakePromoApi::with_codes(codes);
        let mut table = PromoTable::new(api.clone());
        table.load().await.unwrap();
        (table, api)
    }

    fn fill(table: &mut PromoTable<FakePromoApi>, code: &str) {
        for edit in [
            PromoEdit::SetCode(code.to_string()),
            PromoEdit::SetValue(Some(Decimal::new(15, 0))),
            PromoEdit::SetValidFrom(Some(date(2026, 11, 1))),
            PromoEdit::SetValidUntil(Some(date(2026, 11, 30))),
        ] {
            table.edit(edit).unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_closes_editor_and_refetches() {
        let (mut table, api) = loaded(vec![promo(1, "SUMMER10")]).await;
        table.open_create();
        fill(&mut table, "autumn15");

        table.submit().await.unwrap();

        assert_eq!(table.editor(), &PromoEditor::Closed);
        assert_eq!(table.codes().len(), 2);
        assert_eq!(table.codes()[1].code, "AUTUMN15");
        assert_eq!(api.calls(), vec!["list", "create AUTUMN15", "list"]);
        assert_eq!(table.last_error(), None);
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let (mut table, api) = loaded(vec![]).await;
        table.open_create();
        table.edit(PromoEdit::SetCode("   ".to_string())).unwrap();

        let err = table.submit().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::CodeRequired)));
        assert!(table.editor().is_open());
        assert_eq!(
            table.last_error(),
            Some(ValidationError::CodeRequired.to_string().as_str())
        );
        assert_eq!(api.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_server_rejection_keeps_form_and_shows_message() {
        let (mut table, api) = loaded(vec![]).await;
        table.open_create();
        fill(&mut table, "DUP");
        api.fail_next("Code already exists");

        let err = table.submit().await.unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
        assert_eq!(table.last_error(), Some("Code already exists"));
        assert_eq!(table.editor().draft().unwrap().code, "DUP");
        assert!(table.codes().is_empty());
    }

    #[tokio::test]
    async fn test_update_leaves_editing_context() {
        let (mut table, api) = loaded(vec![promo(1, "SUMMER10")]).await;
        table.open_edit(PromoCodeId::new(1)).unwrap();
        table.edit(PromoEdit::SetMaxUses(Some(20))).unwrap();

        table.submit().await.unwrap();

        assert_eq!(table.editor(), &PromoEditor::Closed);
        assert_eq!(table.codes()[0].max_uses, Some(20));
        assert_eq!(api.calls(), vec!["list", "update 1", "list"]);
    }

    #[tokio::test]
    async fn test_edit_requires_open_form() {
        let (mut table, _api) = loaded(vec![]).await;
        assert!(matches!(
            table.edit(PromoEdit::SetActive(false)),
            Err(AppError::EditorClosed)
        ));
        assert!(matches!(table.submit().await, Err(AppError::EditorClosed)));
        assert!(matches!(
            table.open_edit(PromoCodeId::new(9)),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_two_phase() {
        let (mut table, api) = loaded(vec![promo(1, "SUMMER10"), promo(2, "WINTER20")]).await;

        assert!(matches!(
            table.confirm_delete().await,
            Err(AppError::NoPendingDeletion)
        ));

        table.request_delete(PromoCodeId::new(1)).unwrap();
        table.cancel_delete();
        assert_eq!(table.pending_delete(), None);
        assert!(matches!(
            table.confirm_delete().await,
            Err(AppError::NoPendingDeletion)
        ));

        table.request_delete(PromoCodeId::new(2)).unwrap();
        table.confirm_delete().await.unwrap();
        assert_eq!(table.pending_delete(), None);
        assert_eq!(table.codes().len(), 1);
        assert_eq!(api.calls(), vec!["list", "delete 2", "list"]);
    }

    #[tokio::test]
    async fn test_failed_delete_stays_pending() {
        let (mut table, api) = loaded(vec![promo(1, "SUMMER10")]).await;
        table.request_delete(PromoCodeId::new(1)).unwrap();
        api.fail_next("Promo code in use");

        assert!(table.confirm_delete().await.is_err());
        assert_eq!(table.pending_delete(), Some(PromoCodeId::new(1)));
        assert_eq!(table.codes().len(), 1);
        assert_eq!(table.last_error(), Some("Promo code in use"));
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_active() {
        let (mut table, _api) = loaded(vec![promo(1, "SUMMER10")]).await;
        let before = table.codes()[0].clone();

        table.toggle_active(PromoCodeId::new(1)).await.unwrap();
        assert!(!table.codes()[0].active);
        assert_eq!(
            table.rows(date(2026, 10, 15))[0].status,
            PromoStatus::Inactive
        );

        table.toggle_active(PromoCodeId::new(1)).await.unwrap();
        assert_eq!(table.codes()[0], before);
    }

    #[tokio::test]
    async fn test_search_filters_rows() {
        let (mut table, _api) =
            loaded(vec![promo(1, "SUMMER10"), promo(2, "WINTER20"), promo(3, "SUMMIT")]).await;
        table.set_search("SuM");
        let rows = table.rows(date(2026, 10, 15));
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["SUMMER10", "SUMMIT"]);
        assert_eq!(rows[0].discount, "10%");
        assert_eq!(rows[0].usage, "0 uses");
        assert_eq!(rows[0].status, PromoStatus::Active);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_list() {
        let (mut table, api) = loaded(vec![promo(1, "SUMMER10")]).await;
        api.fail_next("Service unavailable");
        assert!(table.load().await.is_err());
        assert_eq!(table.codes().len(), 1);
        assert_eq!(table.last_error(), Some("Service unavailable"));
    }

    #[tokio::test]
    async fn test_stats_and_verify() {
        let mut limited = promo(1, "SUMMER10");
        limited.max_uses = Some(10);
        limited.current_uses = 4;
        let (mut table, _api) = loaded(vec![limited]).await;

        let stats = table.stats(PromoCodeId::new(1)).await.unwrap();
        assert_eq!(stats.remaining_uses, Some(6));

        let outcome = table.verify("SUMMER10").await.unwrap();
        assert!(outcome.valid);
        let outcome = table.verify("NOPE").await.unwrap();
        assert!(!outcome.valid);

        assert!(table.stats(PromoCodeId::new(7)).await.is_err());
        assert_eq!(table.last_error(), Some("Promo code not found"));
    }
}
