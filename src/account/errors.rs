use thiserror::Error;

use crate::identity::dto::AuthApiError;
use crate::profile::dto::StoreError;

/// User-facing copy (es-ES), kept verbatim from the shipped app. Everything
/// shown to the user comes from this table; raw provider text only leaks
/// through for reasons the tables below do not know.
pub mod messages {
    pub const SIGN_IN_MISSING_FIELDS: &str = "Por favor, ingresa tu correo y contraseña.";
    pub const INVALID_CREDENTIALS: &str = "Correo o contraseña incorrectos.";
    pub const UNCONFIRMED_EMAIL: &str = "Por favor verifica tu correo electrónico.";
    pub const INVALID_EMAIL: &str = "Correo electrónico inválido.";
    pub const NETWORK: &str = "Error de conexión. Verifica tu internet.";
    pub const UNEXPECTED: &str = "Error inesperado. Por favor intenta nuevamente.";
    pub const SIGN_UP_MISSING_FIELDS: &str = "Todos los campos son obligatorios.";
    pub const PASSWORD_TOO_SHORT: &str = "La contraseña debe tener al menos 6 caracteres.";
    pub const EMAIL_TAKEN: &str = "Este correo ya está registrado.";
    pub const USERNAME_TAKEN: &str = "Este nombre de usuario ya está en uso.";
    pub const ACCOUNT_CREATION_FAILED: &str = "Error al crear cuenta";
    pub const RESET_MISSING_EMAIL: &str = "Por favor ingresa tu correo electrónico.";
}

/// Classified reason behind an identity-provider rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityReason {
    InvalidCredentials,
    UnconfirmedEmail,
    InvalidEmail,
    AlreadyRegistered,
    Network,
    Unknown,
}

/// Ordered substring rules, first match wins. The provider reports failures
/// as free text, so classification is by substring; the rules live in one
/// table per operation to stay independently testable.
const SIGN_IN_RULES: &[(&str, IdentityReason)] = &[
    ("Invalid login credentials", IdentityReason::InvalidCredentials),
    ("Email not confirmed", IdentityReason::UnconfirmedEmail),
    ("Invalid email", IdentityReason::InvalidEmail),
    ("Network", IdentityReason::Network),
];

const SIGN_UP_RULES: &[(&str, IdentityReason)] = &[
    ("already registered", IdentityReason::AlreadyRegistered),
    ("Invalid email", IdentityReason::InvalidEmail),
    ("Network", IdentityReason::Network),
];

fn classify(rules: &[(&str, IdentityReason)], raw: &str) -> IdentityReason {
    rules
        .iter()
        .find(|(needle, _)| raw.contains(needle))
        .map(|(_, reason)| *reason)
        .unwrap_or(IdentityReason::Unknown)
}

pub fn classify_sign_in(raw: &str) -> IdentityReason {
    classify(SIGN_IN_RULES, raw)
}

pub fn classify_sign_up(raw: &str) -> IdentityReason {
    classify(SIGN_UP_RULES, raw)
}

/// Classified reason behind a rejected profile insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    UsernameTaken,
    EmailTaken,
    Other,
}

/// Unique violations name the violated column in the message; anything else
/// collapses to a generic creation failure.
pub fn classify_constraint(err: &StoreError) -> ConstraintKind {
    if err.is_unique_violation() {
        if err.message.contains("nombre_usuario") {
            return ConstraintKind::UsernameTaken;
        }
        if err.message.contains("correo") {
            return ConstraintKind::EmailTaken;
        }
    }
    ConstraintKind::Other
}

/// Everything a credential operation can fail with. Operations catch this at
/// their boundary and hand the UI `user_message()`; the raw detail goes to
/// the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{raw}")]
    Identity {
        reason: IdentityReason,
        raw: AuthApiError,
    },
    #[error("{raw}")]
    Constraint {
        kind: ConstraintKind,
        raw: StoreError,
    },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AuthError {
    pub fn sign_in_failure(raw: AuthApiError) -> Self {
        Self::Identity {
            reason: classify_sign_in(&raw.message),
            raw,
        }
    }

    pub fn sign_up_failure(raw: AuthApiError) -> Self {
        Self::Identity {
            reason: classify_sign_up(&raw.message),
            raw,
        }
    }

    pub fn insert_failure(raw: StoreError) -> Self {
        Self::Constraint {
            kind: classify_constraint(&raw),
            raw,
        }
    }

    /// Short localized sentence shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => (*msg).to_string(),
            AuthError::Identity { reason, raw } => match reason {
                IdentityReason::InvalidCredentials => messages::INVALID_CREDENTIALS.into(),
                IdentityReason::UnconfirmedEmail => messages::UNCONFIRMED_EMAIL.into(),
                IdentityReason::InvalidEmail => messages::INVALID_EMAIL.into(),
                IdentityReason::AlreadyRegistered => messages::EMAIL_TAKEN.into(),
                IdentityReason::Network => messages::NETWORK.into(),
                IdentityReason::Unknown => raw.message.clone(),
            },
            AuthError::Constraint { kind, .. } => match kind {
                ConstraintKind::UsernameTaken => messages::USERNAME_TAKEN.into(),
                ConstraintKind::EmailTaken => messages::EMAIL_TAKEN.into(),
                ConstraintKind::Other => messages::ACCOUNT_CREATION_FAILED.into(),
            },
            AuthError::Unexpected(_) => messages::UNEXPECTED.into(),
        }
    }
}
