use serde::Deserialize;

/// Storage key the session blob is persisted under.
pub const DEFAULT_SESSION_STORAGE_KEY: &str = "nutriu.auth.token";

/// Deep link opened from password-reset emails.
pub const DEFAULT_RESET_REDIRECT: &str = "nutriu://reset-password";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub anon_key: String,
    pub session_storage_key: String,
    pub reset_redirect: String,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            anon_key: anon_key.into(),
            session_storage_key: DEFAULT_SESSION_STORAGE_KEY.to_string(),
            reset_redirect: DEFAULT_RESET_REDIRECT.to_string(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_url: std::env::var("NUTRIU_API_URL")?,
            anon_key: std::env::var("NUTRIU_ANON_KEY")?,
            session_storage_key: std::env::var("NUTRIU_SESSION_STORAGE_KEY")
                .unwrap_or_else(|_| DEFAULT_SESSION_STORAGE_KEY.into()),
            reset_redirect: std::env::var("NUTRIU_RESET_REDIRECT")
                .unwrap_or_else(|_| DEFAULT_RESET_REDIRECT.into()),
        })
    }
}
