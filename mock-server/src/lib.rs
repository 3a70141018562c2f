//! In-memory stand-in for the Entrolytics API.
//!
//! Accepts the same two credentials as the real service (a cloud API key or a
//! self-hosted share token) and answers with its error shapes, which is
//! enough to exercise the client over real HTTP.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-entrolytics-api-key";
pub const SHARE_TOKEN_HEADER: &str = "x-entrolytics-share-token";
pub const DEFAULT_API_KEY: &str = "test-api-key";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub created_by: String,
}

#[derive(Deserialize)]
pub struct CreateWebsite {
    pub name: String,
    pub domain: String,
}

#[derive(Deserialize)]
pub struct UpdateWebsite {
    pub name: Option<String>,
    pub domain: Option<String>,
}

/// Decoded self-hosted share token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub user_id: String,
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    websites: Arc<RwLock<HashMap<Uuid, Website>>>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

pub fn app() -> Router {
    app_with_key(DEFAULT_API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        websites: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/api/websites", get(list_websites).post(create_website))
        .route(
            "/api/websites/{id}",
            get(get_website).post(update_website).delete(delete_website),
        )
        .route("/api/echo", any(echo))
        .route("/api/legacy-error", get(legacy_error))
        .route("/api/plain-error", get(plain_error))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_key(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

/// Caller identity: `cloud` for the API key, the user id for a share token.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(key) = headers.get(API_KEY_HEADER) {
        return if key.as_bytes() == state.api_key.as_bytes() {
            Ok("cloud".to_string())
        } else {
            Err(api_error(StatusCode::UNAUTHORIZED, "Invalid API key"))
        };
    }
    if let Some(token) = headers.get(SHARE_TOKEN_HEADER) {
        return decode_share_token(token.as_bytes())
            .map(|payload| payload.user_id)
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Invalid share token"));
    }
    tracing::debug!("request without credentials rejected");
    Err(api_error(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

pub fn decode_share_token(token: &[u8]) -> Option<SharePayload> {
    let raw = general_purpose::STANDARD.decode(token).ok()?;
    serde_json::from_slice(&raw).ok()
}

async fn list_websites(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Website>>, ApiError> {
    authenticate(&state, &headers)?;
    let websites = state.websites.read().await;
    Ok(Json(websites.values().cloned().collect()))
}

async fn create_website(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateWebsite>,
) -> Result<(StatusCode, Json<Website>), ApiError> {
    let caller = authenticate(&state, &headers)?;
    let website = Website {
        id: Uuid::new_v4(),
        name: input.name,
        domain: input.domain,
        created_by: caller,
    };
    state.websites.write().await.insert(website.id, website.clone());
    Ok((StatusCode::CREATED, Json(website)))
}

async fn get_website(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Website>, ApiError> {
    authenticate(&state, &headers)?;
    let websites = state.websites.read().await;
    websites
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Website not found"))
}

async fn update_website(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateWebsite>,
) -> Result<Json<Website>, ApiError> {
    authenticate(&state, &headers)?;
    let mut websites = state.websites.write().await;
    let website = websites
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Website not found"))?;
    if let Some(name) = input.name {
        website.name = name;
    }
    if let Some(domain) = input.domain {
        website.domain = domain;
    }
    Ok(Json(website.clone()))
}

async fn delete_website(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authenticate(&state, &headers)?;
    let mut websites = state.websites.write().await;
    websites
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Website not found"))
}

/// Reflects the request back so clients can check what went on the wire.
async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Json<Value> {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "query": query,
        "body": body,
    }))
}

/// Older deployments report failures under `message`.
async fn legacy_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Invalid date range" })),
    )
}

async fn plain_error() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable")
}
