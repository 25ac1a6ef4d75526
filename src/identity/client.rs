use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::identity::dto::{
    AuthApiError, AuthErrorBody, Identity, Session, SessionChange, SessionEvent, SignUpMetadata,
    SignUpResponse, TokenResponse,
};
use crate::storage::TokenStore;

/// Wrapper around the external auth provider. Every call is a single round
/// trip; failures surface as [`AuthApiError`] and nothing retries silently.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Current session, restored from persistence and refreshed if the
    /// access token has expired.
    async fn get_session(&self) -> Result<Option<Session>, AuthApiError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthApiError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> Result<Identity, AuthApiError>;

    async fn sign_out(&self) -> Result<(), AuthApiError>;

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthApiError>;

    /// Compensation hook: remove an identity created earlier in the same
    /// provisioning run.
    async fn delete_identity(&self, id: Uuid) -> Result<(), AuthApiError>;

    /// Subscribe to session lifecycle notifications. Dropping the receiver
    /// is the unsubscription; no further delivery is possible after that.
    fn on_session_change(&self) -> broadcast::Receiver<SessionChange>;
}

/// HTTP client for a GoTrue-style auth API under `{api_url}/auth/v1`.
///
/// The persisted session blob lives under the configured storage key; this
/// client is the only writer of that key.
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    storage_key: String,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionChange>,
}

impl GoTrueClient {
    pub fn new(http: reqwest::Client, config: &ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            http,
            base_url: format!("{}/auth/v1", config.api_url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            storage_key: config.session_storage_key.clone(),
            store,
            events,
        }
    }

    fn emit(&self, event: SessionEvent, session: Option<Session>) {
        // send only fails when nobody is subscribed, which is fine
        let _ = self.events.send(SessionChange { event, session });
    }

    async fn persist(&self, session: &Session) {
        match serde_json::to_string(session) {
            Ok(raw) => self.store.set(&self.storage_key, &raw).await,
            Err(e) => warn!(error = %e, "failed to serialize session for storage"),
        }
    }

    async fn load_persisted(&self) -> Option<Session> {
        let raw = self.store.get(&self.storage_key).await?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted session");
                self.store.remove(&self.storage_key).await;
                None
            }
        }
    }

    async fn request_token(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthApiError> {
        let url = format!("{}/token", self.base_url);
        let resp = self
            .http
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(AuthApiError::network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(error_from(resp).await);
        }
        let token: TokenResponse = resp.json().await.map_err(AuthApiError::malformed)?;
        Ok(token.into_session(OffsetDateTime::now_utc()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthApiError> {
        self.request_token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }
}

#[async_trait]
impl IdentityService for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthApiError> {
        let Some(session) = self.load_persisted().await else {
            return Ok(None);
        };
        if !session.is_expired(OffsetDateTime::now_utc()) {
            return Ok(Some(session));
        }
        debug!(identity_id = %session.user.id, "persisted session expired, refreshing");
        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.persist(&refreshed).await;
                self.emit(SessionEvent::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed, clearing persisted session");
                self.store.remove(&self.storage_key).await;
                self.emit(SessionEvent::SignedOut, None);
                Err(e)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthApiError> {
        let session = self
            .request_token("password", json!({ "email": email, "password": password }))
            .await?;
        self.persist(&session).await;
        info!(identity_id = %session.user.id, "session established");
        self.emit(SessionEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> Result<Identity, AuthApiError> {
        let url = format!("{}/signup", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(AuthApiError::network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(error_from(resp).await);
        }
        let body: SignUpResponse = resp.json().await.map_err(AuthApiError::malformed)?;

        // Autoconfirm deployments hand back a full session right away.
        if let (Some(access_token), Some(refresh_token), Some(expires_in), Some(user)) = (
            body.access_token,
            body.refresh_token,
            body.expires_in,
            body.user.clone(),
        ) {
            let session = TokenResponse {
                access_token,
                refresh_token,
                expires_in,
                user: user.clone(),
            }
            .into_session(OffsetDateTime::now_utc());
            self.persist(&session).await;
            self.emit(SessionEvent::SignedIn, Some(session));
            return Ok(user);
        }

        if let Some(user) = body.user {
            return Ok(user);
        }
        match (body.id, body.email) {
            (Some(id), Some(email)) => Ok(Identity {
                id,
                email,
                user_metadata: body.user_metadata.unwrap_or(serde_json::Value::Null),
            }),
            _ => Err(AuthApiError::malformed("signup response without identity")),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthApiError> {
        let session = self.load_persisted().await;
        // Clear locally first: the session must not survive a dead network.
        self.store.remove(&self.storage_key).await;
        self.emit(SessionEvent::SignedOut, None);

        let Some(session) = session else {
            return Ok(());
        };
        let url = format!("{}/logout", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(AuthApiError::network)?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        info!("session revoked");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthApiError> {
        let url = format!("{}/recover", self.base_url);
        let resp = self
            .http
            .post(&url)
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(AuthApiError::network)?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(())
    }

    async fn delete_identity(&self, id: Uuid) -> Result<(), AuthApiError> {
        let url = format!("{}/admin/users/{}", self.base_url, id);
        let resp = self
            .http
            .delete(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await
            .map_err(AuthApiError::network)?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }
}

async fn error_from(resp: reqwest::Response) -> AuthApiError {
    let status = resp.status();
    let body = resp.json::<AuthErrorBody>().await.unwrap_or_default();
    body.into_api_error(status)
}
