//! In-process mock of the recipe service, bound to an ephemeral local port.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use recipebox::identity::MemoryStorage;
use recipebox::{AuthenticatedGateway, RecipeApi, SessionStore};

pub const PASSWORD: &str = "secret";

#[derive(Clone, Default)]
pub struct MockState {
    /// Every request that reached the server, login included.
    pub hits: Arc<AtomicUsize>,
    pub login_hits: Arc<AtomicUsize>,
    /// Tokens the server still accepts.
    pub issued: Arc<Mutex<HashSet<String>>>,
    pub last_body: Arc<Mutex<Option<Value>>>,
    pub last_content_type: Arc<Mutex<Option<String>>>,
}

impl MockState {
    pub fn hits(&self) -> usize { self.hits.load(Ordering::SeqCst) }
    pub fn login_hits(&self) -> usize { self.login_hits.load(Ordering::SeqCst) }
    pub fn revoke_all(&self) { self.issued.lock().unwrap().clear(); }
    pub fn last_body(&self) -> Option<Value> { self.last_body.lock().unwrap().clone() }
}

pub fn forge_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Claims the mock issues per username.
fn claims_for(username: &str) -> Value {
    match username {
        "reviewer" => json!({"sub": username, "roles": ["ROLE_USER", "ROLE_REVIEWER"]}),
        "scoped" => json!({"sub": username, "scope": "ROLE_USER ROLE_EDITOR"}),
        _ => json!({"sub": username, "iat": 1_700_000_000, "exp": 1_700_003_600}),
    }
}

#[derive(Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

async fn login(State(state): State<MockState>, Json(p): Json<LoginPayload>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.login_hits.fetch_add(1, Ordering::SeqCst);
    match p.password.as_str() {
        PASSWORD => {
            let token = forge_token(&claims_for(&p.username));
            state.issued.lock().unwrap().insert(token.clone());
            Json(json!({ "token": token })).into_response()
        }
        "crash" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
        "tokenless" => Json(json!({ "jwt": "x" })).into_response(),
        "unsendable" => Json(json!({ "token": "h\u{e9}llo.w\u{f6}rld.sig" })).into_response(),
        _ => (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response(),
    }
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if let Some(ct) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        *state.last_content_type.lock().unwrap() = Some(ct.to_string());
    }
    let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) else { return false };
    let Some(token) = auth.strip_prefix("Bearer ") else { return false };
    state.issued.lock().unwrap().contains(token)
}

fn recipe(id: &str, title: &str, category: &str, owner: &str) -> Value {
    json!({
        "id": id, "title": title, "ingredients": ["water"], "instructions": "stir",
        "cookingTime": 10, "category": category, "createdBy": owner
    })
}

fn all_recipes() -> Value {
    json!([
        recipe("a1", "Porridge", "breakfast", "alice"),
        recipe("b2", "Soup", "main", "bob"),
        recipe("c3", "Cake", "dessert", "alice"),
        recipe("d4", "Salad", "main", "carol"),
        recipe("e5", "Stew", "main", "bob"),
        recipe("f6", "Pie", "dessert", "alice"),
    ])
}

macro_rules! guard {
    ($state:expr, $headers:expr) => {
        if !authorized(&$state, &$headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };
}

async fn list(State(state): State<MockState>, headers: HeaderMap) -> Response {
    guard!(state, headers);
    Json(all_recipes()).into_response()
}

async fn mine(State(state): State<MockState>, headers: HeaderMap) -> Response {
    guard!(state, headers);
    Json(json!([recipe("a1", "Porridge", "breakfast", "alice")])).into_response()
}

async fn categories(State(state): State<MockState>, headers: HeaderMap) -> Response {
    guard!(state, headers);
    Json(json!(["breakfast", "dessert", "main"])).into_response()
}

async fn create(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    guard!(state, headers);
    *state.last_body.lock().unwrap() = Some(body.clone());
    let mut created = body;
    created["id"] = json!("n1");
    created["createdBy"] = json!("alice");
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_one(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    guard!(state, headers);
    match id.as_str() {
        "7" => Json(json!({"id": "7"})).into_response(),
        "empty" => StatusCode::OK.into_response(),
        "garbled" => (StatusCode::OK, "{not json").into_response(),
        "gone" => (StatusCode::NOT_FOUND, "Recipe not found with id: gone").into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "reject" => StatusCode::UNAUTHORIZED.into_response(),
        other => Json(recipe(other, "Soup", "main", "bob")).into_response(),
    }
}

async fn update(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    guard!(state, headers);
    *state.last_body.lock().unwrap() = Some(body.clone());
    let mut updated = body;
    updated["id"] = json!(id);
    updated["createdBy"] = json!("bob");
    Json(updated).into_response()
}

async fn delete(State(state): State<MockState>, headers: HeaderMap, Path(_id): Path<String>) -> Response {
    guard!(state, headers);
    StatusCode::OK.into_response()
}

async fn search(State(state): State<MockState>, headers: HeaderMap, RawQuery(q): RawQuery) -> Response {
    guard!(state, headers);
    // echo the raw query back as the title so callers can inspect the encoding
    Json(json!([recipe("s1", &q.unwrap_or_default(), "main", "bob")])).into_response()
}

pub struct MockServer {
    pub base_url: String,
    pub state: MockState,
}

pub async fn spawn() -> MockServer {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/recipes", get(list).post(create))
        .route("/api/recipes/my-recipes", get(mine))
        .route("/api/recipes/categories", get(categories))
        .route("/api/recipes/search/advanced", get(search))
        .route("/api/recipes/{id}", get(get_one).put(update).delete(delete))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    MockServer { base_url: format!("http://{}", addr), state }
}

pub fn memory_store(base_url: &str) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(reqwest::Client::new(), base_url, Arc::new(MemoryStorage::new())))
}

pub fn api_for(store: &Arc<SessionStore>, base_url: &str) -> RecipeApi {
    RecipeApi::new(AuthenticatedGateway::new(store.clone(), reqwest::Client::new(), base_url))
}

/// A base URL nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}
