use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::identity::client::IdentityService;
use crate::identity::dto::{Identity, Session, SessionChange};

/// Where the client currently stands in the auth lifecycle. The host renders
/// its screen sets off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Point-in-time copy of the manager's state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: Option<Session>,
    pub user: Option<Identity>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self {
            session: None,
            user: None,
            loading: true,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Initializing
        } else if self.session.is_some() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Unauthenticated
        }
    }
}

/// Aborts the listener task when dropped. The broadcast receiver dies with
/// the task, so no notification can be delivered after teardown; there is no
/// manager-side filtering to get wrong.
struct ListenerGuard {
    handle: JoinHandle<()>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Owns the live session/user cache and keeps it in sync with provider
/// notifications. One instance per process lifetime of the host UI; create
/// with [`SessionManager::init`], tear down with [`SessionManager::dispose`]
/// or by dropping.
pub struct SessionManager {
    state: Arc<RwLock<SessionSnapshot>>,
    _listener: ListenerGuard,
}

impl SessionManager {
    /// Subscribe to session-change notifications, then bootstrap from the
    /// persisted session. The subscription guard exists before the first
    /// await, so every exit path — including a failed bootstrap — releases
    /// it on drop.
    pub async fn init(identity: Arc<dyn IdentityService>) -> Self {
        let state = Arc::new(RwLock::new(SessionSnapshot::initializing()));
        let rx = identity.on_session_change();
        let listener = ListenerGuard {
            handle: tokio::spawn(listen(rx, Arc::clone(&state))),
        };

        let session = match identity.get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session bootstrap failed, starting unauthenticated");
                None
            }
        };
        apply(&state, session).await;

        Self {
            state,
            _listener: listener,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> AuthPhase {
        self.state.read().await.phase()
    }

    /// Release the session-change subscription. Dropping the manager has the
    /// same effect; this exists for symmetry with `init`.
    pub fn dispose(self) {}
}

/// Replace session and user atomically and clear `loading`, whatever the
/// current state. Last write wins; notification order is the provider's
/// contract.
async fn apply(state: &RwLock<SessionSnapshot>, session: Option<Session>) {
    let mut guard = state.write().await;
    guard.user = session.as_ref().map(|s| s.user.clone());
    guard.session = session;
    guard.loading = false;
}

async fn listen(mut rx: broadcast::Receiver<SessionChange>, state: Arc<RwLock<SessionSnapshot>>) {
    loop {
        match rx.recv().await {
            Ok(change) => {
                debug!(event = ?change.event, authenticated = change.session.is_some(), "session change");
                apply(&state, change.session).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "session change stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
