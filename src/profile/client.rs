use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::ClientConfig;
use crate::profile::dto::{Account, AccountPatch, NewAccount, ProgressRecord, StoreError};

/// Table-style access to the relational backend (`usuarios` and
/// `puntos_usuario`). Every operation is a single round trip; nothing here
/// composes a transaction — that is the provisioning saga's job.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_account(&self, record: &NewAccount) -> Result<(), StoreError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;
    async fn update_account(&self, id: i64, patch: &AccountPatch) -> Result<(), StoreError>;
    async fn init_progress(&self, account_id: i64) -> Result<(), StoreError>;
    async fn fetch_progress(&self, account_id: i64) -> Result<Option<ProgressRecord>, StoreError>;
}

/// HTTP client for a PostgREST endpoint under `{api_url}/rest/v1`.
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            base_url: format!("{}/rest/v1", config.api_url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn fetch_single<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        filter: (&str, String),
    ) -> Result<Option<T>, StoreError> {
        let resp = self
            .request(self.http.get(self.table_url(table)))
            .query(&[filter, ("limit", "1".to_string())])
            .send()
            .await
            .map_err(StoreError::network)?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let mut rows: Vec<T> = resp
            .json()
            .await
            .map_err(|e| StoreError::network(format!("malformed response: {e}")))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn write(&self, builder: reqwest::RequestBuilder) -> Result<(), StoreError> {
        let resp = self
            .request(builder)
            .header("Prefer", "return=minimal")
            .send()
            .await
            .map_err(StoreError::network)?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PostgrestClient {
    async fn insert_account(&self, record: &NewAccount) -> Result<(), StoreError> {
        debug!(username = %record.username, "inserting account row");
        self.write(self.http.post(self.table_url("usuarios")).json(record))
            .await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_single("usuarios", ("correo", format!("eq.{email}")))
            .await
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        self.fetch_single("usuarios", ("id_usuario", format!("eq.{id}")))
            .await
    }

    async fn update_account(&self, id: i64, patch: &AccountPatch) -> Result<(), StoreError> {
        self.write(
            self.http
                .patch(self.table_url("usuarios"))
                .query(&[("id_usuario", format!("eq.{id}"))])
                .json(patch),
        )
        .await
    }

    async fn init_progress(&self, account_id: i64) -> Result<(), StoreError> {
        debug!(account_id, "inserting zeroed progress row");
        self.write(
            self.http.post(self.table_url("puntos_usuario")).json(&json!({
                "id_usuario": account_id,
                "puntos_totales": 0,
                "puntos_hoy": 0,
            })),
        )
        .await
    }

    async fn fetch_progress(&self, account_id: i64) -> Result<Option<ProgressRecord>, StoreError> {
        self.fetch_single("puntos_usuario", ("id_usuario", format!("eq.{account_id}")))
            .await
    }
}

async fn error_from(resp: reqwest::Response) -> StoreError {
    let status = resp.status();
    match resp.json::<StoreError>().await {
        Ok(err) => err,
        Err(e) => StoreError {
            code: None,
            message: format!("request failed with status {status}: {e}"),
            details: None,
        },
    }
}
