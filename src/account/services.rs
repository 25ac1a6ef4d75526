use serde::Serialize;
use tracing::{error, info, warn};

use crate::account::errors::{classify_sign_in, messages, AuthError, IdentityReason};
use crate::account::saga::{provision, Provisioning, SagaStep, SignUpData};
use crate::state::AuthContext;

/// Uniform outcome handed to the UI: a success flag plus an optional
/// localized message. Credential operations never let anything else cross
/// the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl From<AuthError> for ActionResult {
    fn from(err: AuthError) -> Self {
        Self::fail(err.user_message())
    }
}

/// Sign in with email and password. Blank input fails before any network
/// call; the email is trimmed and lowercased before submission. The domain
/// profile is not fetched here — the UI loads it lazily via
/// [`crate::profile::services::load_profile`] once the session exists.
pub async fn sign_in(ctx: &AuthContext, email: &str, password: &str) -> ActionResult {
    if email.trim().is_empty() || password.trim().is_empty() {
        warn!("sign-in rejected: blank credentials");
        return AuthError::Validation(messages::SIGN_IN_MISSING_FIELDS).into();
    }
    let email = email.trim().to_lowercase();
    match ctx.identity.sign_in_with_password(&email, password).await {
        Ok(session) => {
            info!(identity_id = %session.user.id, "signed in");
            ActionResult::ok()
        }
        Err(e) => {
            warn!(error = %e, "sign-in rejected by identity service");
            AuthError::sign_in_failure(e).into()
        }
    }
}

/// Register a new account. Validation runs first (required fields non-blank,
/// password at least 6 characters); the actual creation is the provisioning
/// saga in [`crate::account::saga`].
pub async fn sign_up(ctx: &AuthContext, data: SignUpData) -> ActionResult {
    if data.name.trim().is_empty()
        || data.surname.trim().is_empty()
        || data.username.trim().is_empty()
        || data.email.trim().is_empty()
        || data.password.trim().is_empty()
    {
        warn!("sign-up rejected: missing required fields");
        return AuthError::Validation(messages::SIGN_UP_MISSING_FIELDS).into();
    }
    if data.password.chars().count() < 6 {
        warn!("sign-up rejected: password too short");
        return AuthError::Validation(messages::PASSWORD_TOO_SHORT).into();
    }

    match provision(ctx.identity.as_ref(), ctx.profile.as_ref(), &data).await {
        Provisioning::ProgressInitialized { account_id, .. } => {
            info!(account_id, "account provisioned");
            ActionResult::ok()
        }
        Provisioning::Failed {
            step: SagaStep::InitProgress,
            error,
            ..
        } => {
            // The account and identity exist; the counters can be rebuilt on
            // first read, so the user still gets in.
            warn!(error = %error, "progress record not initialized");
            ActionResult::ok()
        }
        Provisioning::Failed { error, .. } => error.into(),
        state @ (Provisioning::Created { .. } | Provisioning::ProfileInserted { .. }) => {
            error!(state = ?state, "provisioning stopped mid-flight");
            ActionResult::fail(messages::UNEXPECTED)
        }
    }
}

/// Best-effort sign-out: failures are logged and swallowed so the UI can
/// always return to the signed-out screens.
pub async fn sign_out(ctx: &AuthContext) {
    if let Err(e) = ctx.identity.sign_out().await {
        error!(error = %e, "sign-out failed");
    }
}

/// Request a password-reset email pointing at the configured deep link.
/// Every accepted submission gets the same confirmation regardless of
/// whether the email is registered, so the endpoint cannot be used to
/// enumerate accounts; only blank input and transport failure report an
/// error.
pub async fn reset_password(ctx: &AuthContext, email: &str) -> ActionResult {
    if email.trim().is_empty() {
        warn!("password reset rejected: blank email");
        return AuthError::Validation(messages::RESET_MISSING_EMAIL).into();
    }
    let email = email.trim().to_lowercase();
    match ctx
        .identity
        .send_password_reset(&email, &ctx.config.reset_redirect)
        .await
    {
        Ok(()) => {
            info!("password reset email requested");
            ActionResult::ok()
        }
        Err(e) if classify_sign_in(&e.message) == IdentityReason::Network => {
            warn!(error = %e, "password reset transport failure");
            ActionResult::fail(messages::NETWORK)
        }
        Err(e) => {
            warn!(error = %e, "password reset rejected by provider, reporting generic outcome");
            ActionResult::ok()
        }
    }
}
