use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Key/value persistence for the session token blob.
///
/// Implementations never surface errors: `get` before any session exists
/// returns `None`, and a failing backend logs internally and carries on. The
/// concrete store is a host decision (secure enclave on device, browser
/// storage on web); this crate only ships the in-memory one.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
    async fn remove(&self, key: &str);
}

/// In-process store, the default when the host injects nothing.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    async fn remove(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}
