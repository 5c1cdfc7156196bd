// Request gate: every route except sign-in and health needs a session
use crate::infrastructure::http_response::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

const LOGIN_PATH: &str = "/login";
const AUTH_API_PREFIX: &str = "/api/auth";

pub async fn auth_gate(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if !state.auth.is_configured() {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    if path.starts_with(AUTH_API_PREFIX) || path == "/healthz" {
        return next.run(request).await;
    }

    let signed_in = state.session_user(request.headers()).is_some();
    if path == LOGIN_PATH {
        if signed_in {
            return Redirect::temporary("/").into_response();
        }
        return next.run(request).await;
    }
    if signed_in {
        return next.run(request).await;
    }

    tracing::debug!("No session for {}", path);
    if path.starts_with("/api/") {
        return ApiError::Unauthorized("Unauthorized".to_string()).into_response();
    }
    Redirect::temporary(&format!("{}?from={}", LOGIN_PATH, urlencoding::encode(&path))).into_response()
}
