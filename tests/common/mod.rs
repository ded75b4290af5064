#![allow(dead_code)]

//! In-process stand-in for the remote cart service: the real REST
//! contract served over a loopback listener, with an in-memory cart,
//! a request counter, and one-shot fault/delay injection.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FREE_SHIPPING_THRESHOLD: i64 = 500_000;
const SHIPPING_FEE: i64 = 30_000;

pub struct CatalogProduct {
    pub name: &'static str,
    pub unit_price: i64,
    pub stock: u32,
}

#[derive(Clone)]
struct MockLine {
    id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    name: String,
    quantity: u32,
    unit_price: i64,
    stock: u32,
}

pub struct MockState {
    next_line_id: i64,
    lines: Vec<MockLine>,
    discount_code: Option<String>,
    note: Option<String>,
    shipping_address_id: Option<i64>,
    catalog: HashMap<i64, CatalogProduct>,
    requests: u64,
    fail_next: Option<(u16, Option<String>)>,
    delay_next: Option<Duration>,
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub base_url: String,
    state: Shared,
}

impl MockServer {
    pub fn requests(&self) -> u64 {
        self.lock().requests
    }

    /// The next request (whatever it is) answers with this status; a
    /// `None` message produces a body without a `message` field.
    pub fn fail_next(&self, status: u16, message: Option<&str>) {
        self.lock().fail_next = Some((status, message.map(str::to_owned)));
    }

    /// The next request stalls this long before answering.
    pub fn delay_next(&self, ms: u64) {
        self.lock().delay_next = Some(Duration::from_millis(ms));
    }

    /// Removes a line server-side without the client knowing, as if a
    /// concurrent session had deleted it.
    pub fn drop_line(&self, line_id: i64) {
        self.lock().lines.retain(|l| l.id != line_id);
    }

    pub fn line_count(&self) -> usize {
        self.lock().lines.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn default_catalog() -> HashMap<i64, CatalogProduct> {
    HashMap::from([
        (
            7,
            CatalogProduct {
                name: "Ceramic Mug",
                unit_price: 120_000,
                stock: 5,
            },
        ),
        (
            8,
            CatalogProduct {
                name: "Logo T-Shirt",
                unit_price: 250_000,
                stock: 10,
            },
        ),
        (
            9,
            CatalogProduct {
                name: "Sticker Pack",
                unit_price: 30_000,
                stock: 100,
            },
        ),
    ])
}

pub async fn spawn() -> MockServer {
    spawn_with_catalog(default_catalog()).await
}

pub async fn spawn_with_catalog(catalog: HashMap<i64, CatalogProduct>) -> MockServer {
    let state: Shared = Arc::new(Mutex::new(MockState {
        next_line_id: 1,
        lines: Vec::new(),
        discount_code: None,
        note: None,
        shipping_address_id: None,
        catalog,
        requests: 0,
        fail_next: None,
        delay_next: None,
    }));

    let app = Router::new()
        .route("/api/cart", get(fetch_cart).post(add_line))
        .route("/api/cart/clear", delete(clear_cart))
        .route("/api/cart/apply-discount", post(apply_discount))
        .route("/api/cart/remove-discount", delete(remove_discount))
        .route("/api/cart/shipping", put(update_shipping))
        .route("/api/cart/:id", put(update_line).delete(remove_line))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock listener");
    let addr = listener.local_addr().expect("Failed to read mock address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock server stopped");
    });

    MockServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

//handlers
async fn fetch_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let state = lock(&shared);
    (StatusCode::OK, Json(cart_json(&state))).into_response()
}

async fn add_line(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    let product_id = payload["product_id"].as_i64().unwrap_or(0);
    let variant_id = payload.get("variant_id").and_then(Value::as_i64);
    let quantity = payload["quantity"].as_u64().unwrap_or(0) as u32;

    if quantity == 0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Quantity should be greater than 0".to_owned(),
        );
    }
    let Some(product) = state.catalog.get(&product_id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("No product with {product_id} id was found"),
        );
    };
    let (name, unit_price, stock) = (product.name.to_owned(), product.unit_price, product.stock);

    let line_id = match state
        .lines
        .iter()
        .position(|l| l.product_id == product_id && l.variant_id == variant_id)
    {
        Some(idx) => {
            let line = &mut state.lines[idx];
            line.quantity = (line.quantity + quantity).clamp(1, stock);
            line.id
        }
        None => {
            let id = state.next_line_id;
            state.next_line_id += 1;
            state.lines.push(MockLine {
                id,
                product_id,
                variant_id,
                name,
                quantity: quantity.clamp(1, stock),
                unit_price,
                stock,
            });
            id
        }
    };

    let item = state
        .lines
        .iter()
        .find(|l| l.id == line_id)
        .map(line_json)
        .unwrap_or(Value::Null);
    (
        StatusCode::CREATED,
        Json(json!({
            "cart_id": 1,
            "item": item,
            "cart_total": totals_json(&state),
        })),
    )
        .into_response()
}

async fn update_line(
    State(shared): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    let quantity = payload["quantity"].as_u64().unwrap_or(0) as u32;

    let Some(line) = state.lines.iter_mut().find(|l| l.id == id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No cart item with {id} id was found"),
        );
    };
    line.quantity = quantity.clamp(1, line.stock);

    let item = state
        .lines
        .iter()
        .find(|l| l.id == id)
        .map(line_json)
        .unwrap_or(Value::Null);
    let mut body = totals_json(&state);
    body["item"] = item;
    (StatusCode::OK, Json(body)).into_response()
}

async fn remove_line(
    State(shared): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    if !state.lines.iter().any(|l| l.id == id) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No cart item with {id} id was found"),
        );
    }
    state.lines.retain(|l| l.id != id);

    (StatusCode::OK, Json(totals_json(&state))).into_response()
}

async fn clear_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    state.lines.clear();
    state.discount_code = None;
    state.note = None;
    state.shipping_address_id = None;

    (StatusCode::OK, Json(cart_json(&state))).into_response()
}

async fn apply_discount(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    let code = payload["discount_code"].as_str().unwrap_or_default();
    if discount_percent(code) == 0 {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid discount code".to_owned(),
        );
    }
    state.discount_code = Some(code.to_owned());

    (StatusCode::OK, Json(cart_json(&state))).into_response()
}

async fn remove_discount(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    state.discount_code = None;

    (StatusCode::OK, Json(cart_json(&state))).into_response()
}

async fn update_shipping(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let delay = match gate(&shared, &headers) {
        Ok(delay) => delay,
        Err(resp) => return resp,
    };
    pause(delay).await;

    let mut state = lock(&shared);
    if let Some(address_id) = payload.get("shipping_address_id").and_then(Value::as_i64) {
        state.shipping_address_id = Some(address_id);
    }
    if let Some(note) = payload.get("note").and_then(Value::as_str) {
        state.note = Some(note.to_owned());
    }

    (StatusCode::OK, Json(cart_json(&state))).into_response()
}

//utils
fn gate(shared: &Shared, headers: &HeaderMap) -> Result<Option<Duration>, Response> {
    let (delay, fault, authed) = {
        let mut state = lock(shared);
        state.requests += 1;
        let delay = state.delay_next.take();
        let fault = state.fail_next.take();
        let authed = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .map(|h| h.starts_with("Bearer ") && h.len() > "Bearer ".len())
            .unwrap_or(false);
        (delay, fault, authed)
    };

    if !authed {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Authentication required".to_owned(),
        ));
    }
    if let Some((status, message)) = fault {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match message {
            Some(message) => json!({ "message": message }),
            None => json!({ "ok": false }),
        };
        return Err((status, Json(body)).into_response());
    }
    Ok(delay)
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn discount_percent(code: &str) -> i64 {
    match code {
        "SAVE10" => 10,
        "SAVE20" => 20,
        _ => 0,
    }
}

fn totals(state: &MockState) -> (i64, i64, i64, i64) {
    let subtotal: i64 = state
        .lines
        .iter()
        .map(|l| l.unit_price * i64::from(l.quantity))
        .sum();
    let percent = state
        .discount_code
        .as_deref()
        .map(discount_percent)
        .unwrap_or(0);
    let discount = subtotal * percent / 100;
    let shipping = if state.lines.is_empty() || subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FEE
    };
    (subtotal, discount, shipping, subtotal - discount + shipping)
}

fn totals_json(state: &MockState) -> Value {
    let (subtotal, discount, shipping, total) = totals(state);
    json!({
        "subtotal": subtotal,
        "discount_amount": discount,
        "shipping_fee": shipping,
        "total_amount": total,
    })
}

fn cart_json(state: &MockState) -> Value {
    let (subtotal, discount, shipping, total) = totals(state);
    json!({
        "id": 1,
        "items": state.lines.iter().map(line_json).collect::<Vec<_>>(),
        "subtotal": subtotal,
        "discount_amount": discount,
        "shipping_fee": shipping,
        "total_amount": total,
        "discount_code": state.discount_code,
        "note": state.note,
        "shipping_address_id": state.shipping_address_id,
    })
}

fn line_json(line: &MockLine) -> Value {
    json!({
        "id": line.id,
        "product_id": line.product_id,
        "variant_id": line.variant_id,
        "name": line.name,
        "image_url": null,
        "quantity": line.quantity,
        "unit_price": line.unit_price,
        "total_price": line.unit_price * i64::from(line.quantity),
        "discount_amount": 0,
        "stock_quantity": line.stock,
    })
}
