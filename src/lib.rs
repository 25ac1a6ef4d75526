//! Account identity and session lifecycle for the NutriU mobile app.
//!
//! The host UI renders its screen sets off [`SessionManager`] state and calls
//! the credential operations in [`account::services`]; those delegate to the
//! two service boundaries ([`identity::client::IdentityService`] and
//! [`profile::client::ProfileStore`]) and normalize every outcome into an
//! [`ActionResult`]. Account creation is a compensating saga across both
//! services, in [`account::saga`].

pub mod account;
pub mod config;
pub mod identity;
pub mod profile;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testutil;

pub use account::saga::SignUpData;
pub use account::services::{reset_password, sign_in, sign_out, sign_up, ActionResult};
pub use config::ClientConfig;
pub use session::{AuthPhase, SessionManager, SessionSnapshot};
pub use state::AuthContext;

/// Install the global tracing subscriber. Hosts call this once at startup;
/// `RUST_LOG` controls the filter and `LOG_FORMAT=json` switches to JSON
/// output.
pub fn init_tracing() {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "nutriu_client=debug".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
