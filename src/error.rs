use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by a TTL store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The key is absent or its entry has expired.
    #[error("Key not found")]
    NotFound,

    /// The store call did not finish within the configured deadline.
    #[error("Store operation timed out")]
    Timeout,

    /// A connection could not be taken from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A PostgreSQL error.
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// The session subsystem's error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Bad or missing cipher keys. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The token could not be decoded or decrypted.
    #[error("Invalid token")]
    InvalidToken,

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A session record could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No valid session backs the presented credential.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The session existed but its lifetime has passed.
    #[error("Session expired")]
    Expired,
}

impl SessionError {
    /// Returns `true` when the caller should be treated as unauthenticated.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, SessionError::Unauthenticated | SessionError::Expired)
    }
}

/// A `Result` type that uses `SessionError` as the error type.
pub type Result<T> = std::result::Result<T, SessionError>;

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SessionError::Configuration(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }

            SessionError::InvalidToken | SessionError::Unauthenticated => {
                tracing::debug!("Unauthenticated request");
                (StatusCode::UNAUTHORIZED, "Unauthenticated")
            }

            SessionError::Expired => {
                tracing::debug!("Session expired");
                (StatusCode::UNAUTHORIZED, "Unauthenticated")
            }

            SessionError::Store(ref e) => {
                tracing::error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session store error")
            }

            SessionError::Serialization(ref msg) => {
                tracing::error!("Serialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
