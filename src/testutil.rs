//! Shared in-memory fakes for the two service boundaries. They enforce the
//! same uniqueness rules as the real backend so saga tests exercise real
//! interleavings.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::account::saga::SignUpData;
use crate::config::ClientConfig;
use crate::identity::client::IdentityService;
use crate::identity::dto::{
    AuthApiError, Identity, Session, SessionChange, SessionEvent, SignUpMetadata,
};
use crate::profile::client::ProfileStore;
use crate::profile::dto::{
    Account, AccountPatch, NewAccount, ProgressRecord, StoreError, DEFAULT_AVATAR,
    PATIENT_USER_TYPE,
};
use crate::state::AuthContext;

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig::new("http://localhost:54321", "test-anon-key")
}

pub(crate) fn fake_context(
    identity: Arc<FakeIdentityService>,
    profile: Arc<FakeProfileStore>,
) -> AuthContext {
    AuthContext::from_parts(identity, profile, Arc::new(test_config()))
}

pub(crate) fn session_for(user: Identity) -> Session {
    Session {
        access_token: "fake-access".into(),
        refresh_token: "fake-refresh".into(),
        expires_at: OffsetDateTime::now_utc() + time::Duration::hours(1),
        user,
    }
}

pub(crate) fn sign_up_data(email: &str, username: &str) -> SignUpData {
    SignUpData {
        name: "Ana".into(),
        surname: "Pérez".into(),
        username: username.into(),
        email: email.into(),
        phone: "099111222".into(),
        password: "secret123".into(),
        birth_date: "1995-04-12".into(),
        gender: "femenino".into(),
        weight: None,
        height: None,
        goal: None,
    }
}

#[derive(Default)]
pub(crate) struct CallCounters {
    pub sign_in: AtomicUsize,
    pub sign_up: AtomicUsize,
    pub reset: AtomicUsize,
    pub delete: AtomicUsize,
    pub get_session: AtomicUsize,
}

pub(crate) struct FakeIdentityService {
    pub identities: Mutex<Vec<Identity>>,
    pub current: Mutex<Option<Session>>,
    pub last_sign_in_email: Mutex<Option<String>>,
    pub get_session_error: Mutex<Option<AuthApiError>>,
    pub sign_in_error: Mutex<Option<AuthApiError>>,
    pub sign_up_error: Mutex<Option<AuthApiError>>,
    pub sign_out_error: Mutex<Option<AuthApiError>>,
    pub reset_error: Mutex<Option<AuthApiError>>,
    pub delete_error: Mutex<Option<AuthApiError>>,
    pub calls: CallCounters,
    events: broadcast::Sender<SessionChange>,
}

impl FakeIdentityService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            identities: Mutex::default(),
            current: Mutex::default(),
            last_sign_in_email: Mutex::default(),
            get_session_error: Mutex::default(),
            sign_in_error: Mutex::default(),
            sign_up_error: Mutex::default(),
            sign_out_error: Mutex::default(),
            reset_error: Mutex::default(),
            delete_error: Mutex::default(),
            calls: CallCounters::default(),
            events,
        }
    }

    /// Seed a registered identity so sign-in can succeed.
    pub async fn register(&self, email: &str, username: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            user_metadata: serde_json::json!({ "username": username }),
        };
        self.identities.lock().await.push(identity.clone());
        identity
    }

    pub fn emit(&self, event: SessionEvent, session: Option<Session>) {
        let _ = self.events.send(SessionChange { event, session });
    }

    pub fn receiver_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl IdentityService for FakeIdentityService {
    async fn get_session(&self) -> Result<Option<Session>, AuthApiError> {
        self.calls.get_session.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_session_error.lock().await.clone() {
            return Err(err);
        }
        Ok(self.current.lock().await.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Session, AuthApiError> {
        self.calls.sign_in.fetch_add(1, Ordering::SeqCst);
        *self.last_sign_in_email.lock().await = Some(email.to_string());
        if let Some(err) = self.sign_in_error.lock().await.clone() {
            return Err(err);
        }
        let identity = self
            .identities
            .lock()
            .await
            .iter()
            .find(|i| i.email == email)
            .cloned()
            .ok_or(AuthApiError {
                code: Some("400".into()),
                message: "Invalid login credentials".into(),
            })?;
        let session = session_for(identity);
        *self.current.lock().await = Some(session.clone());
        self.emit(SessionEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: SignUpMetadata,
    ) -> Result<Identity, AuthApiError> {
        self.calls.sign_up.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_up_error.lock().await.clone() {
            return Err(err);
        }
        // Deliberately no uniqueness check: concurrent signups race on
        // identity creation and the profile store is the only backstop.
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            user_metadata: serde_json::to_value(&metadata).unwrap_or(Value::Null),
        };
        self.identities.lock().await.push(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthApiError> {
        *self.current.lock().await = None;
        self.emit(SessionEvent::SignedOut, None);
        if let Some(err) = self.sign_out_error.lock().await.clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn send_password_reset(
        &self,
        _email: &str,
        _redirect_to: &str,
    ) -> Result<(), AuthApiError> {
        self.calls.reset.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.reset_error.lock().await.clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn delete_identity(&self, id: Uuid) -> Result<(), AuthApiError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.delete_error.lock().await.clone() {
            return Err(err);
        }
        self.identities.lock().await.retain(|i| i.id != id);
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError {
        code: Some(StoreError::UNIQUE_VIOLATION.into()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
        details: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeProfileStore {
    pub accounts: Mutex<Vec<Account>>,
    pub progress: Mutex<Vec<ProgressRecord>>,
    pub insert_error: Mutex<Option<StoreError>>,
    pub progress_error: Mutex<Option<StoreError>>,
    next_id: AtomicI64,
}

/// Insert a row directly, bypassing the saga. Returns the stored account.
pub(crate) async fn seeded_account(
    store: &FakeProfileStore,
    email: &str,
    username: &str,
) -> Account {
    let record = NewAccount {
        auth_user_id: Uuid::new_v4(),
        user_type: PATIENT_USER_TYPE.into(),
        name: "Ana".into(),
        surname: "Pérez".into(),
        username: username.into(),
        email: email.into(),
        phone: "099111222".into(),
        avatar: DEFAULT_AVATAR.into(),
        birth_date: "1995-04-12".into(),
        gender: "femenino".into(),
        weight: None,
        height: None,
        goal: None,
    };
    store.insert_account(&record).await.expect("seed insert");
    store
        .find_account_by_email(email)
        .await
        .expect("seed lookup")
        .expect("seeded account present")
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn insert_account(&self, record: &NewAccount) -> Result<(), StoreError> {
        if let Some(err) = self.insert_error.lock().await.clone() {
            return Err(err);
        }
        // Uniqueness is checked and the row inserted under one lock, like
        // the real constraint.
        let mut accounts = self.accounts.lock().await;
        if accounts.iter().any(|a| a.username == record.username) {
            return Err(unique_violation("usuarios_nombre_usuario_key"));
        }
        if accounts.iter().any(|a| a.email == record.email) {
            return Err(unique_violation("usuarios_correo_key"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        accounts.push(Account {
            id,
            auth_user_id: record.auth_user_id,
            user_type: record.user_type.clone(),
            name: record.name.clone(),
            surname: record.surname.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            avatar: record.avatar.clone(),
            birth_date: record.birth_date.clone(),
            gender: record.gender.clone(),
            weight: record.weight,
            height: record.height,
            goal: record.goal.clone(),
        });
        Ok(())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_account(&self, id: i64, patch: &AccountPatch) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        // Like PostgREST, patching zero rows is not an error.
        if let Some(account) = accounts.iter_mut().find(|a| a.id == id) {
            if let Some(name) = &patch.name {
                account.name = name.clone();
            }
            if let Some(surname) = &patch.surname {
                account.surname = surname.clone();
            }
            if let Some(phone) = &patch.phone {
                account.phone = phone.clone();
            }
            if let Some(avatar) = &patch.avatar {
                account.avatar = avatar.clone();
            }
            if let Some(weight) = patch.weight {
                account.weight = Some(weight);
            }
            if let Some(height) = patch.height {
                account.height = Some(height);
            }
            if let Some(goal) = &patch.goal {
                account.goal = Some(goal.clone());
            }
        }
        Ok(())
    }

    async fn init_progress(&self, account_id: i64) -> Result<(), StoreError> {
        if let Some(err) = self.progress_error.lock().await.clone() {
            return Err(err);
        }
        self.progress
            .lock()
            .await
            .push(ProgressRecord::zeroed(account_id));
        Ok(())
    }

    async fn fetch_progress(&self, account_id: i64) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self
            .progress
            .lock()
            .await
            .iter()
            .find(|p| p.account_id == account_id)
            .cloned())
    }
}
