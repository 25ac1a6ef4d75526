use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Record in the external auth system, keyed by email. Independent of the
/// domain profile row; created at signup and deleted only as a compensation
/// action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: Uuid,                // unique identity ID
    pub email: String,           // login email, normalized
    #[serde(default)]
    pub user_metadata: Value,    // arbitrary metadata set at signup
}

/// Cached copy of the provider-owned session. The tokens are opaque to this
/// crate; it stores and forwards them without inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
    pub user: Identity,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Metadata attached to the identity at signup. Wire keys match the columns
/// the backend expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpMetadata {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    pub username: String,
    #[serde(rename = "celular")]
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Notification delivered whenever the underlying session is created,
/// refreshed or cleared, including changes triggered outside this process.
#[derive(Debug, Clone)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

/// Failure surfaced by the identity provider: a code/message pair. The
/// message is free text matched by substring downstream; that brittleness is
/// the existing wire contract, not a choice made here.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthApiError {
    pub code: Option<String>,
    pub message: String,
}

impl AuthApiError {
    /// Transport-level failure. The fixed prefix keeps the substring
    /// classifier's `Network` rule firing.
    pub fn network(detail: impl std::fmt::Display) -> Self {
        Self {
            code: None,
            message: format!("Network request failed: {detail}"),
        }
    }

    pub(crate) fn malformed(detail: impl std::fmt::Display) -> Self {
        Self {
            code: None,
            message: format!("malformed auth response: {detail}"),
        }
    }
}

/// Successful body of `/token` (password or refresh grant).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: Identity,
}

impl TokenResponse {
    pub(crate) fn into_session(self, now: OffsetDateTime) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: now + time::Duration::seconds(self.expires_in),
            user: self.user,
        }
    }
}

/// Body of `/signup`. With email confirmation enabled the provider returns
/// the bare identity at the top level; with autoconfirm it returns a full
/// token payload with the identity nested.
#[derive(Debug, Deserialize)]
pub(crate) struct SignUpResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<Value>,
}

/// Error body of the auth API. Field names vary across endpoints and
/// provider versions, so every variant is optional.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorBody {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl AuthErrorBody {
    pub(crate) fn into_api_error(self, status: reqwest::StatusCode) -> AuthApiError {
        let message = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        let code = self.code.map(|c| match c {
            Value::String(s) => s,
            other => other.to_string(),
        });
        AuthApiError { code, message }
    }
}
