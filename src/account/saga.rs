use anyhow::anyhow;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::account::errors::AuthError;
use crate::identity::client::IdentityService;
use crate::identity::dto::{Identity, SignUpMetadata};
use crate::profile::client::ProfileStore;
use crate::profile::dto::{NewAccount, DEFAULT_AVATAR, PATIENT_USER_TYPE};

/// Input collected by the registration screen.
#[derive(Debug, Clone)]
pub struct SignUpData {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub birth_date: String,
    pub gender: String,
    pub weight: Option<f32>,
    pub height: Option<f32>,
    pub goal: Option<String>,
}

impl SignUpData {
    pub(crate) fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    fn metadata(&self) -> SignUpMetadata {
        SignUpMetadata {
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            username: self.username.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }

    fn account_record(&self, identity: &Identity) -> NewAccount {
        NewAccount {
            auth_user_id: identity.id,
            user_type: PATIENT_USER_TYPE.to_string(),
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.normalized_email(),
            phone: self.phone.trim().to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
            birth_date: self.birth_date.clone(),
            gender: self.gender.clone(),
            weight: self.weight,
            height: self.height,
            goal: self.goal.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    CreateIdentity,
    InsertAccount,
    InitProgress,
}

/// Where a provisioning run ended up. Each step consumes the previous state
/// and advances it, so a partial failure is an inspectable value rather than
/// a silent gap: `Failed` keeps the step that broke and whether the identity
/// rollback went through.
#[derive(Debug)]
pub enum Provisioning {
    Created {
        identity: Identity,
    },
    ProfileInserted {
        identity: Identity,
    },
    ProgressInitialized {
        identity: Identity,
        account_id: i64,
    },
    Failed {
        step: SagaStep,
        error: AuthError,
        compensated: bool,
    },
}

/// Provision a new account across the identity provider and the profile
/// store: create the identity, insert the profile row, initialize the
/// progress row. Strictly sequential; step 2 needs the identity id from
/// step 1 and step 3 the account id from step 2.
///
/// On a profile-insert failure the identity from step 1 is deleted. A
/// progress-init failure has no compensation: the account and identity stay,
/// which the returned state records.
pub async fn provision(
    identity: &dyn IdentityService,
    store: &dyn ProfileStore,
    data: &SignUpData,
) -> Provisioning {
    let state = create_identity(identity, data).await;
    let state = insert_account(identity, store, data, state).await;
    init_progress(store, data, state).await
}

async fn create_identity(identity: &dyn IdentityService, data: &SignUpData) -> Provisioning {
    match identity
        .sign_up(&data.normalized_email(), &data.password, data.metadata())
        .await
    {
        Ok(user) => {
            info!(identity_id = %user.id, "identity created");
            Provisioning::Created { identity: user }
        }
        Err(e) => {
            warn!(error = %e, "identity creation rejected");
            Provisioning::Failed {
                step: SagaStep::CreateIdentity,
                error: AuthError::sign_up_failure(e),
                compensated: false,
            }
        }
    }
}

async fn insert_account(
    identity: &dyn IdentityService,
    store: &dyn ProfileStore,
    data: &SignUpData,
    state: Provisioning,
) -> Provisioning {
    let Provisioning::Created { identity: user } = state else {
        return state;
    };
    match store.insert_account(&data.account_record(&user)).await {
        Ok(()) => {
            info!(identity_id = %user.id, "account row inserted");
            Provisioning::ProfileInserted { identity: user }
        }
        Err(e) => {
            warn!(error = %e, identity_id = %user.id, "account insert failed, rolling back identity");
            let compensated = compensate(identity, user.id).await;
            Provisioning::Failed {
                step: SagaStep::InsertAccount,
                error: AuthError::insert_failure(e),
                compensated,
            }
        }
    }
}

async fn init_progress(
    store: &dyn ProfileStore,
    data: &SignUpData,
    state: Provisioning,
) -> Provisioning {
    let Provisioning::ProfileInserted { identity: user } = state else {
        return state;
    };
    // The insert did not return the generated id; fetch it back by the
    // unique email.
    let account = match store.find_account_by_email(&data.normalized_email()).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return Provisioning::Failed {
                step: SagaStep::InitProgress,
                error: AuthError::Unexpected(anyhow!("account row missing after insert")),
                compensated: false,
            };
        }
        Err(e) => {
            return Provisioning::Failed {
                step: SagaStep::InitProgress,
                error: AuthError::Unexpected(anyhow::Error::new(e).context("re-fetch account")),
                compensated: false,
            };
        }
    };
    match store.init_progress(account.id).await {
        Ok(()) => {
            info!(account_id = account.id, "progress record initialized");
            Provisioning::ProgressInitialized {
                identity: user,
                account_id: account.id,
            }
        }
        Err(e) => {
            warn!(error = %e, account_id = account.id, "progress init failed, account kept");
            Provisioning::Failed {
                step: SagaStep::InitProgress,
                error: AuthError::Unexpected(anyhow::Error::new(e).context("init progress")),
                compensated: false,
            }
        }
    }
}

/// Delete the identity created earlier in this run. Nothing corrective is
/// available to the caller if this fails, so the failure is only logged.
async fn compensate(identity: &dyn IdentityService, id: Uuid) -> bool {
    match identity.delete_identity(id).await {
        Ok(()) => {
            info!(identity_id = %id, "identity rolled back");
            true
        }
        Err(e) => {
            error!(error = %e, identity_id = %id, "compensation failed, identity left orphaned");
            false
        }
    }
}
