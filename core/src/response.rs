//! The uniform outcome of every request.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ApiError;

/// Outcome of `ApiClient::request`. Failures are data, not `Err`: callers
/// inspect `is_ok()` or convert with `into_result()`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success { status: u16, data: T },
    /// `status` is 0 when no HTTP response was obtained.
    Failure { status: u16, error: String },
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiResponse::Success { status, .. } | ApiResponse::Failure { status, .. } => *status,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResponse::Success { .. } => None,
            ApiResponse::Failure { error, .. } => Some(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Success { status, data } => ApiResponse::Success {
                status,
                data: f(data),
            },
            ApiResponse::Failure { status, error } => ApiResponse::Failure { status, error },
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            ApiResponse::Success { data, .. } => Ok(data),
            ApiResponse::Failure { status: 0, error } => Err(ApiError::Transport { message: error }),
            ApiResponse::Failure { status, error } => Err(ApiError::Http {
                status,
                message: error,
            }),
        }
    }

    pub(crate) fn failure(status: u16, error: impl Into<String>) -> Self {
        ApiResponse::Failure {
            status,
            error: error.into(),
        }
    }
}

/// Serializes as `{"ok", "status", "data"}` or `{"ok", "status", "error"}`.
impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiResponse", 3)?;
        match self {
            ApiResponse::Success { status, data } => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("status", status)?;
                state.serialize_field("data", data)?;
            }
            ApiResponse::Failure { status, error } => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("status", status)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Pick the caller-visible message for a non-ok response: a string `error`
/// field, then a string `message` field, then `HTTP <status>`.
pub fn error_message(status: u16, body: &Value) -> String {
    ["error", "message"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
