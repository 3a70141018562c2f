//! Authentication header derivation.
//!
//! # Design
//! The auth mode is derived from whichever credentials are present every time
//! headers are built; nothing is cached on the client. Cloud deployments send
//! the API key verbatim. Self-hosted deployments send a share token, which is
//! the base64 encoding of `{"userId": ..., "timestamp": ...}`. The token is
//! not signed; self-hosted servers expect exactly this format.

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const API_KEY_HEADER: &str = "x-entrolytics-api-key";
pub const SHARE_TOKEN_HEADER: &str = "x-entrolytics-share-token";

/// Resolved credentials. Any combination of fields may be set.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub secret: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How a request authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    CloudKey,
    SelfHosted,
    Anonymous,
}

impl Credentials {
    /// An API key takes precedence; a user id needs its secret to count.
    pub fn mode(&self) -> AuthMode {
        if self.api_key.is_some() {
            AuthMode::CloudKey
        } else if self.user_id.is_some() && self.secret.is_some() {
            AuthMode::SelfHosted
        } else {
            AuthMode::Anonymous
        }
    }

    /// Auth headers for a request issued now.
    pub fn headers(&self) -> Result<Vec<(String, String)>, ConfigError> {
        self.headers_at(Utc::now().timestamp_millis())
    }

    /// Auth headers for a request issued at `timestamp_ms` (unix millis).
    pub fn headers_at(&self, timestamp_ms: i64) -> Result<Vec<(String, String)>, ConfigError> {
        match (self.mode(), &self.api_key) {
            (AuthMode::CloudKey, Some(key)) => {
                Ok(vec![(API_KEY_HEADER.to_string(), key.clone())])
            }
            (AuthMode::SelfHosted, _) => {
                let token = ShareToken::create(self, timestamp_ms)?;
                Ok(vec![(SHARE_TOKEN_HEADER.to_string(), token.encode())])
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Payload of a self-hosted share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareToken {
    pub user_id: String,
    pub timestamp: i64,
}

impl ShareToken {
    /// Both `user_id` and `secret` must be set, even though only the user id
    /// ends up in the payload.
    pub fn create(credentials: &Credentials, timestamp_ms: i64) -> Result<Self, ConfigError> {
        match (&credentials.user_id, &credentials.secret) {
            (Some(user_id), Some(_)) => Ok(Self {
                user_id: user_id.clone(),
                timestamp: timestamp_ms,
            }),
            _ => Err(ConfigError::MissingSelfHostedCredentials),
        }
    }

    pub fn encode(&self) -> String {
        // Two plain fields; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        general_purpose::STANDARD.encode(json)
    }

    /// Inverse of `encode`, for servers and tests inspecting a token.
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = general_purpose::STANDARD.decode(token).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(api_key: Option<&str>, user_id: Option<&str>, secret: Option<&str>) -> Credentials {
        Credentials {
            api_key: api_key.map(str::to_string),
            user_id: user_id.map(str::to_string),
            secret: secret.map(str::to_string),
        }
    }

    #[test]
    fn precedence_over_all_combinations() {
        for api_key in [None, Some("key")] {
            for user_id in [None, Some("user")] {
                for secret in [None, Some("secret")] {
                    let c = creds(api_key, user_id, secret);
                    let headers = c.headers_at(1_700_000_000_000).unwrap();
                    let names: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
                    if api_key.is_some() {
                        assert_eq!(c.mode(), AuthMode::CloudKey);
                        assert_eq!(names, vec![API_KEY_HEADER]);
                    } else if user_id.is_some() && secret.is_some() {
                        assert_eq!(c.mode(), AuthMode::SelfHosted);
                        assert_eq!(names, vec![SHARE_TOKEN_HEADER]);
                    } else {
                        assert_eq!(c.mode(), AuthMode::Anonymous);
                        assert!(names.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn api_key_sent_verbatim() {
        let headers = creds(Some(" k/+= "), None, None).headers().unwrap();
        assert_eq!(headers, vec![(API_KEY_HEADER.to_string(), " k/+= ".to_string())]);
    }

    #[test]
    fn share_token_wire_format() {
        let c = creds(None, Some("u-1"), Some("s"));
        let headers = c.headers_at(1_700_000_000_123).unwrap();
        let raw = general_purpose::STANDARD.decode(&headers[0].1).unwrap();
        assert_eq!(
            String::from_utf8(raw).unwrap(),
            r#"{"userId":"u-1","timestamp":1700000000123}"#
        );
    }

    #[test]
    fn share_token_excludes_secret() {
        let token = ShareToken::create(&creds(None, Some("u"), Some("hunter2")), 5).unwrap();
        let decoded = general_purpose::STANDARD.decode(token.encode()).unwrap();
        assert!(!String::from_utf8(decoded).unwrap().contains("hunter2"));
    }

    #[test]
    fn share_token_guard_rejects_half_pairs() {
        let err = ShareToken::create(&creds(None, Some("u"), None), 0).unwrap_err();
        assert_eq!(err, ConfigError::MissingSelfHostedCredentials);
        let err = ShareToken::create(&creds(None, None, Some("s")), 0).unwrap_err();
        assert_eq!(err, ConfigError::MissingSelfHostedCredentials);
    }

    #[test]
    fn decode_inverts_encode() {
        let token = ShareToken {
            user_id: "abc".to_string(),
            timestamp: 42,
        };
        assert_eq!(ShareToken::decode(&token.encode()), Some(token));
        assert_eq!(ShareToken::decode("%%%"), None);
    }

    #[test]
    fn headers_stable_for_same_instant() {
        let c = creds(None, Some("u"), Some("s"));
        assert_eq!(c.headers_at(10).unwrap(), c.headers_at(10).unwrap());
        let a = c.headers_at(10).unwrap();
        let b = c.headers_at(11).unwrap();
        assert_eq!(a[0].0, b[0].0);
        assert_ne!(a[0].1, b[0].1);
    }

    #[test]
    fn debug_redacts_secrets() {
        let shown = format!("{:?}", creds(Some("k-1"), Some("u"), Some("s-1")));
        assert!(!shown.contains("k-1"));
        assert!(!shown.contains("s-1"));
    }
}
