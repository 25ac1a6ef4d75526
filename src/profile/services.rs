use anyhow::Context;
use tracing::warn;

use crate::profile::client::ProfileStore;
use crate::profile::dto::{Account, AccountPatch, ProgressRecord, PATIENT_USER_TYPE};

/// Materialized view of a signed-in patient: the account row merged with its
/// progress counters.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub account: Account,
    pub progress: ProgressRecord,
}

/// Load the domain profile for the current session's email. Credential
/// operations deliberately do not fetch this; the UI calls it lazily once a
/// session exists.
///
/// A missing progress row is tolerated and replaced with zeroed counters so
/// a half-provisioned account still renders.
pub async fn load_profile(
    store: &dyn ProfileStore,
    email: &str,
) -> anyhow::Result<Option<UserProfile>> {
    let Some(account) = store
        .find_account_by_email(email)
        .await
        .context("load account by email")?
    else {
        return Ok(None);
    };
    if account.user_type != PATIENT_USER_TYPE {
        return Ok(None);
    }
    let progress = match store.fetch_progress(account.id).await {
        Ok(Some(progress)) => progress,
        Ok(None) => ProgressRecord::zeroed(account.id),
        Err(e) => {
            warn!(error = %e, account_id = account.id, "progress fetch failed, using defaults");
            ProgressRecord::zeroed(account.id)
        }
    };
    Ok(Some(UserProfile { account, progress }))
}

/// Apply a partial update to the account row and return the refreshed row.
pub async fn update_profile(
    store: &dyn ProfileStore,
    account_id: i64,
    patch: &AccountPatch,
) -> anyhow::Result<Account> {
    store
        .update_account(account_id, patch)
        .await
        .context("update account")?;
    store
        .find_account_by_id(account_id)
        .await
        .context("reload account after update")?
        .with_context(|| format!("account {account_id} vanished after update"))
}
