//! Authenticated request client for the Entrolytics API.
//!
//! # Design
//! `ApiClient` holds the resolved endpoint, the credentials and a shared
//! transport, and never mutates any of them. Each call runs the same fixed
//! sequence: resolve the URL, derive auth headers, dispatch once, normalize.
//! The first and last steps are public as `build_request` and
//! `parse_response` so a host can drive its own I/O between them.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AuthMode, Credentials};
use crate::config::{ClientConfig, EnvSource, ProcessEnv};
use crate::error::{ApiError, ConfigError};
use crate::http::{set_header, HttpMethod, HttpRequest, HttpResponse};
use crate::query::{build_url, Params};
use crate::response::{error_message, ApiResponse};
use crate::transport::{ReqwestTransport, Transport};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Everything about a single call except its path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    /// `Some(Value::Null)` is treated like `None`: no body is sent.
    pub body: Option<Value>,
    pub params: Params,
    /// Applied last; a same-named header replaces the default or auth one.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body`. A value that serializes to `null` (`()`, `None`)
    /// leaves the request without a body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?).filter(|v| !v.is_null());
        Ok(self)
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Client for the Entrolytics API. Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct ApiClient {
    endpoint: Url,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Build a client, falling back to `ENTROLYTICS_*` process variables.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::with_env(config, &ProcessEnv)
    }

    /// Build a client purely from `ENTROLYTICS_*` process variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ClientConfig::default())
    }

    /// Build a client, falling back to `env` for unset fields.
    pub fn with_env(config: ClientConfig, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let resolved = config.resolve(env)?;
        let transport = config
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()) as Arc<dyn Transport>);
        debug!(
            endpoint = %resolved.endpoint,
            auth = ?resolved.credentials.mode(),
            "entrolytics client configured"
        );
        Ok(Self {
            endpoint: resolved.endpoint,
            credentials: resolved.credentials,
            transport,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The mode the next request will authenticate with.
    pub fn auth_mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    /// Issue one request and normalize its outcome. Never panics or returns
    /// `Err`; every failure is an `ApiResponse::Failure`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        let request = match self.build_request(path, &options) {
            Ok(request) => request,
            Err(e) => {
                warn!(path, error = %e, "entrolytics request could not be built");
                return ApiResponse::failure(0, e.message());
            }
        };

        debug!(method = %request.method, url = %request.url, "entrolytics request");
        let method = request.method;
        match self.transport.send(request).await {
            Ok(response) => parse_response(response),
            Err(e) => {
                warn!(%method, path, error = %e, "entrolytics transport failure");
                ApiResponse::failure(0, e.message())
            }
        }
    }

    /// Resolve the URL and assemble headers and body, stamping any share
    /// token with the current time.
    pub fn build_request(&self, path: &str, options: &RequestOptions) -> Result<HttpRequest, ApiError> {
        self.build_request_at(path, options, chrono::Utc::now().timestamp_millis())
    }

    /// As `build_request`, with the share-token timestamp supplied.
    pub fn build_request_at(
        &self,
        path: &str,
        options: &RequestOptions,
        timestamp_ms: i64,
    ) -> Result<HttpRequest, ApiError> {
        let url = build_url(&self.endpoint, path, &options.params).map_err(|e| ApiError::Transport {
            message: format!("invalid request path {path:?}: {e}"),
        })?;

        let auth = self
            .credentials
            .headers_at(timestamp_ms)
            .map_err(|e| ApiError::Transport {
                message: e.to_string(),
            })?;

        let mut headers = vec![(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string())];
        for (name, value) in auth.iter().chain(options.headers.iter()) {
            set_header(&mut headers, name, value);
        }

        let body = options
            .body
            .as_ref()
            .filter(|v| !v.is_null())
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Transport {
                message: e.to_string(),
            })?;

        Ok(HttpRequest {
            method: options.method,
            url: url.into(),
            headers,
            body,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: Params) -> ApiResponse<T> {
        self.request(path, RequestOptions::new(HttpMethod::Get).params(params))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(HttpMethod::Post, path, body).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(HttpMethod::Put, path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(path, RequestOptions::new(HttpMethod::Delete))
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(HttpMethod::Patch, path, body).await
    }

    async fn send_json<T, B>(&self, method: HttpMethod, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match RequestOptions::new(method).json(body) {
            Ok(options) => self.request(path, options).await,
            Err(e) => ApiResponse::failure(0, e.to_string()),
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Normalize a transport response. Malformed or empty bodies read as `{}`,
/// or as `null` when `T` cannot hold a map (`()`, `Option<_>`).
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> ApiResponse<T> {
    let status = response.status;
    let parsed = response.json().ok();

    if !response.is_ok() {
        let payload = parsed.unwrap_or_else(|| Value::Object(Map::new()));
        let message = error_message(status, &payload);
        warn!(status, error = %message, "entrolytics request failed");
        return ApiResponse::failure(status, message);
    }

    let data = match parsed {
        Some(payload) => serde_json::from_value(payload),
        None => serde_json::from_value(Value::Object(Map::new()))
            .or_else(|_| T::deserialize(Value::Null)),
    };
    match data {
        Ok(data) => ApiResponse::Success { status, data },
        Err(e) => ApiResponse::failure(status, format!("unexpected response body: {e}")),
    }
}
