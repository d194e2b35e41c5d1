//! Integration test support for the Rocket Shoes cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocket-shoes-integration-tests
//! ```
//!
//! Tests run against [`MockApi`], a local `axum` server that serves
//! `GET /products/{id}` and `GET /stock/{id}` from in-memory tables, so no
//! external services are needed.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Shared tables and counters behind the mock server.
#[derive(Default)]
struct MockState {
    products: Mutex<HashMap<i32, Value>>,
    stock: Mutex<HashMap<i32, u32>>,
    forced_status: Mutex<Option<StatusCode>>,
    last_authorization: Mutex<Option<String>>,
    product_hits: AtomicUsize,
    stock_hits: AtomicUsize,
}

impl MockState {
    fn record_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        *self.last_authorization.lock().expect("lock poisoned") = auth;
    }

    fn forced(&self) -> Option<Response> {
        self.forced_status
            .lock()
            .expect("lock poisoned")
            .map(|status| (status, "forced failure").into_response())
    }
}

/// A running mock catalog/stock API.
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    /// Start the server on an ephemeral local port.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/products/{id}", get(product))
            .route("/stock/{id}", get(stock))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API");
        let addr = listener.local_addr().expect("Mock API has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock API crashed");
        });

        Self { addr, state }
    }

    /// Base URL to point an `ApiClient` at.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register a product with its available stock.
    pub fn add_product(&self, id: i32, title: &str, price: f64, image: &str, stock: u32) {
        self.state.products.lock().expect("lock poisoned").insert(
            id,
            json!({ "id": id, "title": title, "price": price, "image": image }),
        );
        self.set_stock(id, stock);
    }

    /// Change a product's available stock.
    pub fn set_stock(&self, id: i32, amount: u32) {
        self.state
            .stock
            .lock()
            .expect("lock poisoned")
            .insert(id, amount);
    }

    /// Make every request fail with `status` (or behave normally again with `None`).
    pub fn force_status(&self, status: Option<u16>) {
        *self.state.forced_status.lock().expect("lock poisoned") =
            status.map(|s| StatusCode::from_u16(s).expect("invalid status"));
    }

    /// Number of `GET /products/{id}` requests served.
    #[must_use]
    pub fn product_hits(&self) -> usize {
        self.state.product_hits.load(Ordering::SeqCst)
    }

    /// Number of `GET /stock/{id}` requests served.
    #[must_use]
    pub fn stock_hits(&self) -> usize {
        self.state.stock_hits.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.state
            .last_authorization
            .lock()
            .expect("lock poisoned")
            .clone()
    }
}

async fn product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    state.product_hits.fetch_add(1, Ordering::SeqCst);
    state.record_auth(&headers);
    if let Some(response) = state.forced() {
        return response;
    }

    let found = state
        .products
        .lock()
        .expect("lock poisoned")
        .get(&id)
        .cloned();
    found.map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |product| Json(product).into_response(),
    )
}

async fn stock(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    state.stock_hits.fetch_add(1, Ordering::SeqCst);
    state.record_auth(&headers);
    if let Some(response) = state.forced() {
        return response;
    }

    let found = state.stock.lock().expect("lock poisoned").get(&id).copied();
    found.map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |amount| Json(json!({ "id": id, "amount": amount })).into_response(),
    )
}

/// A unique storage file path under the system temp directory.
#[must_use]
pub fn temp_storage_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("rocket_shoes_it_{}", uuid::Uuid::new_v4()))
        .join("storage.json")
}
