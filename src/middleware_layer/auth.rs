use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::{
    error::SessionError,
    models::session::{SessionRecord, SessionToken},
    services::session::SessionManager,
};

/// The authorization scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Turns a rejected request into a response.
pub trait ErrorPresenter: Send + Sync {
    fn present(&self, error: SessionError) -> Response;
}

/// Renders errors as `{"error": "..."}` with the matching status code.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonErrorPresenter;

impl ErrorPresenter for JsonErrorPresenter {
    fn present(&self, error: SessionError) -> Response {
        error.into_response()
    }
}

/// State for [`require_session`]: a session manager and an error presenter.
#[derive(Clone)]
pub struct SessionGuard {
    sessions: Arc<SessionManager>,
    presenter: Arc<dyn ErrorPresenter>,
}

impl SessionGuard {
    /// Creates a guard that answers failures with [`JsonErrorPresenter`].
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self::with_presenter(sessions, Arc::new(JsonErrorPresenter))
    }

    /// Creates a guard with a custom error presenter.
    ///
    /// # Arguments
    ///
    /// * `sessions` - The manager that validates tokens.
    /// * `presenter` - Renders the response for rejected requests.
    pub fn with_presenter(sessions: Arc<SessionManager>, presenter: Arc<dyn ErrorPresenter>) -> Self {
        Self {
            sessions,
            presenter,
        }
    }
}

/// Extracts the bearer credential from the request headers.
///
/// # Returns
///
/// `None` if the header is absent, not valid UTF-8, or uses another scheme.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// A middleware that requires a valid bearer session.
///
/// On success the [`SessionRecord`] and the raw [`SessionToken`] are inserted
/// into the request extensions before the next handler runs. Every failure
/// is presented as [`SessionError::Unauthenticated`].
pub async fn require_session(
    State(guard): State<SessionGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let Some(token) = extract_bearer_token(request.headers()).map(str::to_owned) else {
        tracing::debug!("❌ No bearer token found");
        return guard.presenter.present(SessionError::Unauthenticated);
    };

    let session = match guard.sessions.validate(&token).await {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!("❌ Session rejected: {}", e);
            return guard.presenter.present(SessionError::Unauthenticated);
        }
    };

    tracing::debug!("✅ Authenticated {} {}", session.kind, session.subject_id);

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(SessionToken(token));

    next.run(request).await
}

/// The session attached by [`require_session`].
///
/// Rejects when the route is not guarded or when the session has expired
/// since the guard let the request through.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionRecord);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<SessionRecord>()
            .cloned()
            .ok_or(SessionError::Unauthenticated)?;

        if session.is_expired() {
            return Err(SessionError::Unauthenticated);
        }

        Ok(CurrentSession(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&headers("Basic abc")), None);
        assert_eq!(extract_bearer_token(&headers("bearer abc")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
