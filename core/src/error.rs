//! Error types for the Entrolytics request client.
//!
//! # Design
//! Only `ConfigError` is ever returned as an `Err` by the client itself, and
//! only while constructing it. Every failure past construction is folded into
//! a failed `ApiResponse`; `ApiError` exists for callers who prefer `?` and
//! opt in through `ApiResponse::into_result`. `TransportError` is what a
//! `Transport` implementation reports when no HTTP response was obtained.

use thiserror::Error;

/// Message used when a transport failure carries no text of its own.
pub const GENERIC_NETWORK_ERROR: &str = "Network error";

/// Fatal configuration problems, raised while building an `ApiClient`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither the explicit config nor the environment provided an endpoint.
    #[error("Entrolytics API endpoint is required. Set ENTROLYTICS_API_ENDPOINT or pass endpoint in config.")]
    MissingEndpoint,

    /// The endpoint is not an absolute URL that paths can be resolved against.
    #[error("invalid Entrolytics API endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Self-hosted token requested without both a user id and a secret.
    #[error("userId and secret are required for self-hosted authentication")]
    MissingSelfHostedCredentials,
}

/// A failed request, for callers converting an `ApiResponse` into a `Result`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a status outside the ok range.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No usable HTTP response was obtained (status 0).
    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl ApiError {
    /// The status carried by the failed response; 0 for transport failures.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Transport { .. } => 0,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Http { message, .. } | ApiError::Transport { message } => message,
        }
    }
}

/// Failure reported by a `Transport` when the round-trip did not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, DNS, TLS, timeout or abort.
    #[error("{message}")]
    Network { message: String },

    /// The response arrived but its body could not be read.
    #[error("{message}")]
    Body { message: String },

    /// The request could not be built (bad URL, header or body).
    #[error("{message}")]
    InvalidRequest { message: String },
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        TransportError::Network {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        TransportError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Caller-visible text, falling back to a generic message when empty.
    pub fn message(&self) -> &str {
        let message = match self {
            TransportError::Network { message }
            | TransportError::Body { message }
            | TransportError::InvalidRequest { message } => message.as_str(),
        };
        if message.is_empty() {
            GENERIC_NETWORK_ERROR
        } else {
            message
        }
    }
}
