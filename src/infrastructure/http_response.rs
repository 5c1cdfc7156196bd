// HTTP response utilities: JSON errors, cache headers and session cookies
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Every failed API call answers `{ "error": message }` with one of these
/// statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status().is_server_error() {
            tracing::error!("{} {}", self.status().as_u16(), self);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// JSON body that shared caches may keep for `seconds` and serve stale while
/// revalidating.
pub fn json_with_cache<T: Serialize>(body: &T, seconds: u64) -> Result<Response<Body>, ApiError> {
    let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Internal(e.to_string()))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::CACHE_CONTROL,
            format!("public, s-maxage={}, stale-while-revalidate", seconds),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn svg_response(svg: String) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/svg+xml")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(svg))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Attributes of the session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

/// Cookie holding `token`, kept by the browser for as long as the session lives.
pub fn session_cookie(settings: &CookieSettings, token: &str, max_age: Duration) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        settings.name,
        token,
        max_age.as_secs()
    );
    if settings.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn clear_session_cookie(settings: &CookieSettings) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("{}=; Path=/; Max-Age=0", settings.name))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Value of cookie `name` from the request's Cookie headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}
