use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Serialize;

use crate::{
    error::Result,
    middleware_layer::auth::CurrentSession,
    models::session::SessionToken,
    state::AppState,
};

/// The response payload for logout.
#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match sonic_rs::to_string(body) {
        Ok(body) => (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ Response serialization failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Returns the session of the authenticated caller.
pub async fn current_session(CurrentSession(session): CurrentSession) -> Response {
    json(StatusCode::OK, &session)
}

/// Revokes the bearer token the request was authenticated with.
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Extension(token): Extension<SessionToken>,
) -> Result<Response> {
    tracing::info!("👋 Logout for {} {}", session.kind, session.subject_id);

    state.sessions.revoke(token.as_str()).await?;

    let response = LogoutResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok(json(StatusCode::OK, &response))
}
