//! Client configuration and its resolution against the environment.
//!
//! # Design
//! Each field resolves independently: an explicit, non-empty value in
//! `ClientConfig` wins, otherwise the matching `ENTROLYTICS_*` variable is
//! read through an `EnvSource`. The environment is a capability rather than
//! global state so tests can resolve against a plain map.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ENTROLYTICS_API_ENDPOINT` | `endpoint` (required) |
//! | `ENTROLYTICS_API_KEY` | `api_key` |
//! | `ENTROLYTICS_USER_ID` | `user_id` |
//! | `ENTROLYTICS_SECRET` | `secret` |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::auth::Credentials;
use crate::error::ConfigError;
use crate::transport::Transport;

pub const ENDPOINT_VAR: &str = "ENTROLYTICS_API_ENDPOINT";
pub const API_KEY_VAR: &str = "ENTROLYTICS_API_KEY";
pub const USER_ID_VAR: &str = "ENTROLYTICS_USER_ID";
pub const SECRET_VAR: &str = "ENTROLYTICS_SECRET";

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An environment with no variables set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnv;

impl EnvSource for NoEnv {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Explicit client configuration. Unset fields fall back to the environment.
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub secret: Option<String>,
    /// Replaces the default `ReqwestTransport`.
    pub transport: Option<Arc<dyn Transport>>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve every field, failing only when no usable endpoint is found.
    pub fn resolve(&self, env: &dyn EnvSource) -> Result<ResolvedConfig, ConfigError> {
        let endpoint =
            pick(self.endpoint.as_deref(), env, ENDPOINT_VAR).ok_or(ConfigError::MissingEndpoint)?;
        let endpoint = Url::parse(&endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        Ok(ResolvedConfig {
            endpoint,
            credentials: Credentials {
                api_key: pick(self.api_key.as_deref(), env, API_KEY_VAR),
                user_id: pick(self.user_id.as_deref(), env, USER_ID_VAR),
                secret: pick(self.secret.as_deref(), env, SECRET_VAR),
            },
        })
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("transport", &self.transport.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

/// Output of `ClientConfig::resolve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub endpoint: Url,
    pub credentials: Credentials,
}

/// Empty strings count as unset, for both explicit values and variables.
fn pick(explicit: Option<&str>, env: &dyn EnvSource, key: &str) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| env.var(key).filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_endpoint_fails() {
        let err = ClientConfig::new().resolve(&NoEnv).unwrap_err();
        assert_eq!(err, ConfigError::MissingEndpoint);
    }

    #[test]
    fn empty_endpoint_counts_as_missing() {
        let e = env(&[(ENDPOINT_VAR, "")]);
        let err = ClientConfig::new().endpoint("").resolve(&e).unwrap_err();
        assert_eq!(err, ConfigError::MissingEndpoint);
    }

    #[test]
    fn endpoint_falls_back_to_env() {
        let e = env(&[(ENDPOINT_VAR, "https://analytics.example.com/api/")]);
        let resolved = ClientConfig::new().resolve(&e).unwrap();
        assert_eq!(resolved.endpoint.as_str(), "https://analytics.example.com/api/");
    }

    #[test]
    fn explicit_values_win_over_env() {
        let e = env(&[
            (ENDPOINT_VAR, "https://env.example.com"),
            (API_KEY_VAR, "env-key"),
            (USER_ID_VAR, "env-user"),
            (SECRET_VAR, "env-secret"),
        ]);
        let resolved = ClientConfig::new()
            .endpoint("https://explicit.example.com")
            .api_key("explicit-key")
            .resolve(&e)
            .unwrap();
        assert_eq!(resolved.endpoint.host_str(), Some("explicit.example.com"));
        assert_eq!(resolved.credentials.api_key.as_deref(), Some("explicit-key"));
        assert_eq!(resolved.credentials.user_id.as_deref(), Some("env-user"));
        assert_eq!(resolved.credentials.secret.as_deref(), Some("env-secret"));
    }

    #[test]
    fn empty_explicit_credential_uses_env() {
        let e = env(&[(API_KEY_VAR, "env-key")]);
        let resolved = ClientConfig::new()
            .endpoint("http://localhost:3000")
            .api_key("")
            .resolve(&e)
            .unwrap();
        assert_eq!(resolved.credentials.api_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn unparseable_endpoint_fails() {
        let err = ClientConfig::new()
            .endpoint("not a url")
            .resolve(&NoEnv)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn non_base_endpoint_fails() {
        let err = ClientConfig::new()
            .endpoint("mailto:ops@example.com")
            .resolve(&NoEnv)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = ClientConfig::new().api_key("k-123").secret("s-456");
        let shown = format!("{config:?}");
        assert!(!shown.contains("k-123"));
        assert!(!shown.contains("s-456"));
    }
}
