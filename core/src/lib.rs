//! Authenticated request layer for the Entrolytics analytics API.
//!
//! # Overview
//! Every endpoint helper funnels through `ApiClient::request`, which builds
//! the URL, attaches credentials, dispatches through a pluggable `Transport`
//! and folds both transport failures and non-ok statuses into one
//! `ApiResponse` shape.
//!
//! # Design
//! - Configuration resolves once, at construction, from explicit values with
//!   an `ENTROLYTICS_*` environment fallback; a missing endpoint is the only
//!   hard error.
//! - Auth mode is recomputed per request: API key, else self-hosted share
//!   token, else anonymous.
//! - `build_request` / `parse_response` expose the pure halves of a call, so
//!   a host can run its own I/O in between.
//! - The client holds no mutable state; concurrent calls are independent.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod response;
pub mod transport;

pub use auth::{AuthMode, Credentials, ShareToken, API_KEY_HEADER, SHARE_TOKEN_HEADER};
pub use client::{parse_response, ApiClient, RequestOptions};
pub use config::{ClientConfig, EnvSource, NoEnv, ProcessEnv, ResolvedConfig};
pub use error::{ApiError, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{build_url, Params, QueryValue};
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport};
