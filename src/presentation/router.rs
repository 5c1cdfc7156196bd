// Route table and middleware stack
use crate::presentation::app_state::AppState;
use crate::presentation::auth_gate::auth_gate;
use crate::presentation::handlers::{
    canvas_svg, get_workspace, health_check, list_models, login, logout, me, not_found, put_workspace,
    tile_data,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/models", get(list_models))
        .route("/api/data/:tile_id", get(tile_data))
        .route("/api/canvas.svg", get(canvas_svg))
        .route("/api/workspace", get(get_workspace).put(put_workspace))
        .route("/api/me", get(me))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
