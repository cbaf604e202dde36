//! Bearer-token sessions backed by a TTL key/value store.
//!
//! Tokens are AES-GCM sealed pointers to server-held [`SessionRecord`]s.
//! [`SessionManager`] issues, validates and revokes them; the
//! [`require_session`] middleware guards axum routes with them.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod aes;
    pub mod codec;
    pub mod keyring;
}

pub mod models {
    pub mod session;
}

pub mod store {
    pub mod memory;
    pub mod postgres;
    pub mod redis;
    pub mod sweep;
    pub mod ttl;
}

pub mod services {
    pub mod session;
}

pub mod handlers {
    pub mod session;
}

pub mod middleware_layer {
    pub mod auth;
}

pub use crate::crypto::keyring::Keyring;
pub use crate::error::{Result, SessionError, StoreError};
pub use crate::middleware_layer::auth::{require_session, CurrentSession, ErrorPresenter, SessionGuard};
pub use crate::models::session::{SessionRecord, SessionToken};
pub use crate::services::session::{SessionConfig, SessionManager};
pub use crate::state::AppState;
pub use crate::store::ttl::TtlStore;

/// Builds the session routes, all behind [`require_session`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(handlers::session::current_session))
        .route("/api/auth/logout", post(handlers::session::logout))
        .route_layer(from_fn_with_state(
            state.guard.clone(),
            middleware_layer::auth::require_session,
        ))
        .with_state(state)
}
