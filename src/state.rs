use std::sync::Arc;

use crate::config::ClientConfig;
use crate::identity::client::{GoTrueClient, IdentityService};
use crate::profile::client::{PostgrestClient, ProfileStore};
use crate::storage::{MemoryTokenStore, TokenStore};

/// Wired service clients shared by every credential operation. Cheap to
/// clone; one instance per host app.
#[derive(Clone)]
pub struct AuthContext {
    pub identity: Arc<dyn IdentityService>,
    pub profile: Arc<dyn ProfileStore>,
    pub config: Arc<ClientConfig>,
}

impl AuthContext {
    /// Real HTTP clients over an in-memory token store.
    pub fn init(config: ClientConfig) -> anyhow::Result<Self> {
        Self::with_store(config, Arc::new(MemoryTokenStore::new()))
    }

    /// Real HTTP clients over a caller-supplied token store (secure enclave
    /// on device, browser storage on web).
    pub fn with_store(config: ClientConfig, store: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let http = reqwest::Client::builder().build()?;
        let identity =
            Arc::new(GoTrueClient::new(http.clone(), &config, store)) as Arc<dyn IdentityService>;
        let profile = Arc::new(PostgrestClient::new(http, &config)) as Arc<dyn ProfileStore>;
        Ok(Self {
            identity,
            profile,
            config,
        })
    }

    pub fn from_parts(
        identity: Arc<dyn IdentityService>,
        profile: Arc<dyn ProfileStore>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            identity,
            profile,
            config,
        }
    }
}
