//! Integration tests for Atelier.
//!
//! The tests drive the real [`atelier_admin::ApiClient`] and the form
//! orchestrators against [`MockApi`], an in-process axum server that mimics
//! the catalog API and records every request it receives.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `promo_api` - Promo code list, editor, deletion, toggle, verification
//! - `product_api` - Product multipart create/update, deletion, categories

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use atelier_admin::{ApiClient, ApiConfig};
use atelier_core::product::{Category, ColorRecord, ImageRecord, ProductRecord};
use atelier_core::promo::{DiscountKind, PromoCode, PromoStats, VerifyOutcome};
use atelier_core::stock::WireStock;
use atelier_core::{CategoryId, ColorId, ImageId, ProductId, ProductStatus, PromoCodeId, Size};
use axum::body::Body;
use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Bearer token the mock API accepts.
pub const TEST_TOKEN: &str = "atelier-test-7f3a9c2e41d8b605";

/// A request as seen by the mock API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

/// One file part of a multipart body.
#[derive(Debug, Clone)]
pub struct RecordedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

/// A decoded multipart body, in received order.
#[derive(Debug, Clone, Default)]
pub struct RecordedForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<RecordedFile>,
}

impl RecordedForm {
    /// Names of the text fields, in received order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Value of a text field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// A text field decoded as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or is not valid JSON.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn json_field(&self, name: &str) -> Value {
        let raw = self.field(name).expect("field present");
        serde_json::from_str(raw).expect("field is JSON")
    }
}

#[derive(Debug, Default)]
struct MockState {
    promos: Vec<PromoCode>,
    products: Vec<ProductRecord>,
    categories: Vec<Category>,
    requests: Vec<RecordedRequest>,
    promo_bodies: Vec<Value>,
    forms: Vec<RecordedForm>,
    fail_next: Option<(StatusCode, String)>,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

type Shared = Arc<Mutex<MockState>>;

#[allow(clippy::expect_used)]
fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().expect("mock state poisoned")
}

/// In-process stand-in for the catalog API.
///
/// Stops when dropped.
pub struct MockApi {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockApi {
    /// Start the server on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = Shared::default();
        lock(&state).next_id = 100;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock API");
        let addr = listener.local_addr().expect("mock API address");

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// API origin, e.g. `http://127.0.0.1:49152/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// A client carrying [`TEST_TOKEN`].
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self) -> ApiClient {
        let config = ApiConfig::new(&self.base_url())
            .expect("mock URL is valid")
            .with_token(TEST_TOKEN);
        ApiClient::new(&config).expect("client builds")
    }

    /// A client with no token configured.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn anonymous_client(&self) -> ApiClient {
        let config = ApiConfig::new(&self.base_url()).expect("mock URL is valid");
        ApiClient::new(&config).expect("client builds")
    }

    pub fn seed_promo(&self, promo: PromoCode) {
        lock(&self.state).promos.push(promo);
    }

    pub fn seed_product(&self, product: ProductRecord) {
        lock(&self.state).products.push(product);
    }

    pub fn seed_category(&self, id: i64, name: &str) {
        lock(&self.state).categories.push(Category {
            id: CategoryId::new(id),
            name: name.to_string(),
        });
    }

    /// Answer the next request with `status` and a JSON body `{"message": ...}`.
    pub fn fail_next(&self, status: StatusCode, message: &str) {
        lock(&self.state).fail_next = Some((status, message.to_string()));
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests matching `method` and `path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method && r.path == path)
            .collect()
    }

    /// JSON bodies of promo create and update requests.
    #[must_use]
    pub fn promo_bodies(&self) -> Vec<Value> {
        lock(&self.state).promo_bodies.clone()
    }

    /// Multipart bodies of product create and update requests.
    #[must_use]
    pub fn forms(&self) -> Vec<RecordedForm> {
        lock(&self.state).forms.clone()
    }

    #[must_use]
    pub fn promos(&self) -> Vec<PromoCode> {
        lock(&self.state).promos.clone()
    }

    #[must_use]
    pub fn products(&self) -> Vec<ProductRecord> {
        lock(&self.state).products.clone()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/promo", get(list_promos).post(create_promo))
        .route("/api/promo/verify", post(verify_promo))
        .route(
            "/api/promo/{id}",
            get(get_promo).put(update_promo).delete(delete_promo),
        )
        .route("/api/promo/{id}/toggle", patch(toggle_promo))
        .route("/api/promo/{id}/stats", get(promo_stats))
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/categories", get(list_categories))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_guard))
        .with_state(state)
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// Record the request, apply an injected failure, and require the token on
/// every mutating route except verification.
async fn record_and_guard(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let token = bearer(request.headers());

    let injected = {
        let mut state = lock(&state);
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            bearer: token.clone(),
        });
        state.fail_next.take()
    };
    if let Some((status, text)) = injected {
        return message(status, &text);
    }

    let public = method == Method::GET || path == "/api/promo/verify";
    if !public && token.as_deref() != Some(TEST_TOKEN) {
        return message(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    next.run(request).await
}

// ============================================================================
// Promo codes
// ============================================================================

#[derive(Debug, Deserialize)]
struct PromoBody {
    code: String,
    discount_kind: DiscountKind,
    percentage_value: Option<Decimal>,
    fixed_amount_value: Option<Decimal>,
    valid_from: NaiveDate,
    valid_until: NaiveDate,
    max_uses: Option<u32>,
    active: bool,
}

impl PromoBody {
    fn into_code(self, id: PromoCodeId, current_uses: u32) -> PromoCode {
        PromoCode {
            id,
            code: self.code,
            discount_kind: self.discount_kind,
            percentage_value: self.percentage_value,
            fixed_amount_value: self.fixed_amount_value,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            max_uses: self.max_uses,
            current_uses,
            active: self.active,
            status: None,
        }
    }
}

fn parse_promo(state: &Shared, body: Value) -> Result<PromoBody, Response> {
    lock(state).promo_bodies.push(body.clone());
    serde_json::from_value(body).map_err(|e| message(StatusCode::BAD_REQUEST, &e.to_string()))
}

fn promo_not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Promo code not found")
}

async fn list_promos(State(state): State<Shared>) -> Json<Vec<PromoCode>> {
    Json(lock(&state).promos.clone())
}

async fn get_promo(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let id = PromoCodeId::new(id);
    lock(&state)
        .promos
        .iter()
        .find(|p| p.id == id)
        .map_or_else(promo_not_found, |p| Json(p.clone()).into_response())
}

async fn create_promo(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let body = match parse_promo(&state, body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let mut state = lock(&state);
    if state.promos.iter().any(|p| p.code == body.code) {
        return message(StatusCode::CONFLICT, "Ce code promo existe déjà");
    }
    let id = PromoCodeId::new(state.next_id());
    state.promos.push(body.into_code(id, 0));
    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn update_promo(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let body = match parse_promo(&state, body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let id = PromoCodeId::new(id);
    let mut state = lock(&state);
    let Some(slot) = state.promos.iter_mut().find(|p| p.id == id) else {
        return promo_not_found();
    };
    *slot = body.into_code(id, slot.current_uses);
    Json(json!({ "id": id })).into_response()
}

async fn delete_promo(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let id = PromoCodeId::new(id);
    let mut state = lock(&state);
    let before = state.promos.len();
    state.promos.retain(|p| p.id != id);
    if state.promos.len() == before {
        return promo_not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn toggle_promo(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let id = PromoCodeId::new(id);
    let mut state = lock(&state);
    let Some(promo) = state.promos.iter_mut().find(|p| p.id == id) else {
        return promo_not_found();
    };
    promo.active = !promo.active;
    promo.status = None;
    Json(json!({ "active": promo.active })).into_response()
}

async fn promo_stats(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let id = PromoCodeId::new(id);
    let state = lock(&state);
    let Some(promo) = state.promos.iter().find(|p| p.id == id) else {
        return promo_not_found();
    };
    Json(PromoStats {
        current_uses: promo.current_uses,
        max_uses: promo.max_uses,
        remaining_uses: promo
            .max_uses
            .map(|max| max.saturating_sub(promo.current_uses)),
        status: promo.status,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
    code: String,
}

async fn verify_promo(State(state): State<Shared>, Json(body): Json<VerifyBody>) -> Json<VerifyOutcome> {
    let state = lock(&state);
    let wanted = body.code.to_uppercase();
    let outcome = match state.promos.iter().find(|p| p.code == wanted) {
        Some(promo) if promo.active => VerifyOutcome {
            valid: true,
            message: None,
            promo: Some(promo.clone()),
        },
        Some(_) => VerifyOutcome {
            valid: false,
            message: Some("Code promo inactif".to_string()),
            promo: None,
        },
        None => VerifyOutcome {
            valid: false,
            message: Some("Code promo invalide".to_string()),
            promo: None,
        },
    };
    Json(outcome)
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Deserialize)]
struct ColorField {
    id: Option<ColorId>,
    nom: String,
    code: String,
}

async fn read_form(mut multipart: Multipart) -> Result<RecordedForm, Response> {
    let mut form = RecordedForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(message(StatusCode::BAD_REQUEST, &format!("Multipart error: {e}"))),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| message(StatusCode::BAD_REQUEST, &format!("Read error: {e}")))?;

        if file_name.is_some() {
            form.files.push(RecordedFile {
                field: name,
                file_name,
                content_type,
                size: bytes.len(),
            });
        } else {
            form.fields
                .push((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }
    Ok(form)
}

fn json_or_default<T: serde::de::DeserializeOwned + Default>(form: &RecordedForm, name: &str) -> T {
    form.field(name)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

/// Apply a submitted form onto `product`, as the API does on create and update.
fn apply_form(state: &mut MockState, product: &mut ProductRecord, form: &RecordedForm) -> Result<(), Response> {
    let title = form.field("titre").unwrap_or_default().trim();
    if title.is_empty() {
        return Err(message(StatusCode::UNPROCESSABLE_ENTITY, "Le titre est requis"));
    }
    let price = form
        .field("prix")
        .and_then(|raw| raw.parse::<Decimal>().ok())
        .ok_or_else(|| message(StatusCode::UNPROCESSABLE_ENTITY, "Prix invalide"))?;

    product.title = title.to_string();
    product.description = form.field("description").filter(|d| !d.is_empty()).map(String::from);
    product.base_price = price;
    product.promo_price = form.field("promo").and_then(|raw| raw.parse().ok());
    product.base_revenue = form
        .field("revenu")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    product.category_id = form.field("categorie_id").and_then(|raw| raw.parse().ok());
    product.status = form
        .field("statut")
        .and_then(|raw| raw.parse::<ProductStatus>().ok())
        .unwrap_or_default();
    product.sizes = json_or_default::<Vec<Size>>(form, "tailles");
    product.stock = json_or_default::<WireStock>(form, "stock");

    let colors: Vec<ColorField> = json_or_default(form, "couleurs");
    let deleted_colors: Vec<ColorId> = json_or_default(form, "couleursToDelete");
    product.colors = colors
        .into_iter()
        .filter(|c| c.id.is_none_or(|id| !deleted_colors.contains(&id)))
        .map(|c| ColorRecord {
            id: c.id.unwrap_or_else(|| ColorId::new(state.next_id())),
            name: c.nom,
            color_code: c.code,
        })
        .collect();

    let deleted_images: Vec<ImageId> = json_or_default(form, "imagesToDelete");
    let kept: BTreeMap<ImageId, Option<String>> = json_or_default::<Vec<Value>>(form, "existingImages")
        .into_iter()
        .filter_map(|v| {
            let id = serde_json::from_value::<ImageId>(v.get("id")?.clone()).ok()?;
            let color = v.get("couleur").and_then(Value::as_str).map(String::from);
            Some((id, color))
        })
        .collect();
    product.images.retain(|img| !deleted_images.contains(&img.id));
    for image in &mut product.images {
        if let Some(color) = kept.get(&image.id) {
            image.assigned_color.clone_from(color);
        }
    }

    let image_colors: Vec<String> = json_or_default(form, "imageColors");
    for (index, file) in form.files.iter().filter(|f| f.field == "images").enumerate() {
        let id = ImageId::new(state.next_id());
        product.images.push(ImageRecord {
            id,
            url: format!(
                "/uploads/{id}-{}",
                file.file_name.as_deref().unwrap_or("image")
            ),
            assigned_color: image_colors
                .get(index)
                .filter(|c| !c.is_empty())
                .cloned(),
            is_primary: false,
        });
    }
    if !product.images.iter().any(|img| img.is_primary) {
        if let Some(first) = product.images.first_mut() {
            first.is_primary = true;
        }
    }
    Ok(())
}

fn product_not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Produit introuvable")
}

async fn list_products(State(state): State<Shared>) -> Json<Vec<ProductRecord>> {
    Json(lock(&state).products.clone())
}

async fn get_product(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let id = ProductId::new(id);
    lock(&state)
        .products
        .iter()
        .find(|p| p.id == id)
        .map_or_else(product_not_found, |p| Json(p.clone()).into_response())
}

async fn create_product(State(state): State<Shared>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let mut state = lock(&state);
    state.forms.push(form.clone());

    let id = ProductId::new(state.next_id());
    let mut product = ProductRecord {
        id,
        title: String::new(),
        description: None,
        base_price: Decimal::ZERO,
        promo_price: None,
        base_revenue: Decimal::ZERO,
        category_id: None,
        status: ProductStatus::Active,
        colors: Vec::new(),
        sizes: Vec::new(),
        stock: WireStock::new(),
        images: Vec::new(),
    };
    if let Err(response) = apply_form(&mut state, &mut product, &form) {
        return response;
    }
    state.products.push(product);
    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn update_product(State(state): State<Shared>, Path(id): Path<i64>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let id = ProductId::new(id);
    let mut state = lock(&state);
    state.forms.push(form.clone());

    let Some(index) = state.products.iter().position(|p| p.id == id) else {
        return product_not_found();
    };
    let mut product = state.products.remove(index);
    let result = apply_form(&mut state, &mut product, &form);
    state.products.insert(index, product);
    match result {
        Ok(()) => Json(json!({ "id": id })).into_response(),
        Err(response) => response,
    }
}

async fn delete_product(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let id = ProductId::new(id);
    let mut state = lock(&state);
    let before = state.products.len();
    state.products.retain(|p| p.id != id);
    if state.products.len() == before {
        return product_not_found();
    }
    (StatusCode::OK, Body::empty()).into_response()
}

async fn list_categories(State(state): State<Shared>) -> Json<Vec<Category>> {
    Json(lock(&state).categories.clone())
}

// ============================================================================
// Fixtures
// ============================================================================

/// A 10% code valid over 2026, unlimited and active.
#[must_use]
#[allow(clippy::expect_used)]
pub fn promo_fixture(id: i64, code: &str) -> PromoCode {
    PromoCode {
        id: PromoCodeId::new(id),
        code: code.to_string(),
        discount_kind: DiscountKind::Percentage,
        percentage_value: Some(Decimal::new(10, 0)),
        fixed_amount_value: None,
        valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
        valid_until: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid date"),
        max_uses: None,
        current_uses: 0,
        active: true,
        status: None,
    }
}

/// A sized product with two colors and two stored images.
#[must_use]
pub fn product_fixture(id: i64) -> ProductRecord {
    let mut stock = WireStock::new();
    stock.insert("sand_s".to_string(), 4);
    stock.insert("sand_m".to_string(), 2);
    stock.insert("olive_s".to_string(), 1);
    ProductRecord {
        id: ProductId::new(id),
        title: "Linen Shirt".to_string(),
        description: Some("Breathable".to_string()),
        base_price: Decimal::new(4990, 2),
        promo_price: None,
        base_revenue: Decimal::new(20, 0),
        category_id: Some(CategoryId::new(3)),
        status: ProductStatus::Active,
        colors: vec![
            ColorRecord {
                id: ColorId::new(1),
                name: "Sand".to_string(),
                color_code: "#e0d2b4".to_string(),
            },
            ColorRecord {
                id: ColorId::new(2),
                name: "Olive".to_string(),
                color_code: "#708238".to_string(),
            },
        ],
        sizes: vec![Size::S, Size::M],
        stock,
        images: vec![
            ImageRecord {
                id: ImageId::new(5),
                url: "/uploads/a.jpg".to_string(),
                assigned_color: Some("Sand".to_string()),
                is_primary: true,
            },
            ImageRecord {
                id: ImageId::new(6),
                url: "/uploads/b.jpg".to_string(),
                assigned_color: Some("Olive".to_string()),
                is_primary: false,
            },
        ],
    }
}
