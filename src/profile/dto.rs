use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Every self-registration lands as this user type.
pub const PATIENT_USER_TYPE: &str = "paciente";

/// Placeholder avatar assigned at provisioning time.
pub const DEFAULT_AVATAR: &str = "usu.webp";

/// Row in the `usuarios` table. Wire names are the backend's Spanish column
/// names; the constraint classifier matches on them, so they must not drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(rename = "id_usuario")]
    pub id: i64,
    #[serde(rename = "id_auth_user")]
    pub auth_user_id: Uuid,
    #[serde(rename = "tipo_usuario")]
    pub user_type: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "numero_celular")]
    pub phone: String,
    #[serde(rename = "foto_perfil")]
    pub avatar: String,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: String,
    #[serde(rename = "genero")]
    pub gender: String,
    #[serde(rename = "peso", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(rename = "altura", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(rename = "objetivo", default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// Insert payload for `usuarios`; the numeric id is generated server-side.
/// Optional measurements are serialized only when provided.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewAccount {
    #[serde(rename = "id_auth_user")]
    pub auth_user_id: Uuid,
    #[serde(rename = "tipo_usuario")]
    pub user_type: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "numero_celular")]
    pub phone: String,
    #[serde(rename = "foto_perfil")]
    pub avatar: String,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: String,
    #[serde(rename = "genero")]
    pub gender: String,
    #[serde(rename = "peso", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(rename = "altura", skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(rename = "objetivo", skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// Partial update for `usuarios`; absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AccountPatch {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "apellido", skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(rename = "numero_celular", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "foto_perfil", skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "peso", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(rename = "altura", skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(rename = "objetivo", skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// Row in the `puntos_usuario` table, one per account, created zeroed at
/// provisioning time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressRecord {
    #[serde(rename = "id_usuario")]
    pub account_id: i64,
    #[serde(rename = "puntos_totales")]
    pub total_points: i64,
    #[serde(rename = "puntos_hoy")]
    pub today_points: i64,
    #[serde(rename = "nivel", default = "default_level")]
    pub level: String,
}

pub(crate) fn default_level() -> String {
    "principiante".to_string()
}

impl ProgressRecord {
    pub fn zeroed(account_id: i64) -> Self {
        Self {
            account_id,
            total_points: 0,
            today_points: 0,
            level: default_level(),
        }
    }
}

/// Structured error from the relational backend: a fixed code plus free text
/// naming the violated column on constraint failures.
#[derive(Debug, Clone, Error, Deserialize)]
#[error("{message}")]
pub struct StoreError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl StoreError {
    /// Postgres unique-constraint violation.
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    pub fn network(detail: impl std::fmt::Display) -> Self {
        Self {
            code: None,
            message: format!("Network request failed: {detail}"),
            details: None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(Self::UNIQUE_VIOLATION)
    }
}
