// HTTP request handlers
use crate::application::auth_service::AuthError;
use crate::application::canvas::{CanvasState, TileDataState};
use crate::application::canvas_driver::{CanvasDriver, ServiceTileDataClient};
use crate::application::chart_renderer::{chart_area_for_width, estimated_tooltip_size, render_canvas};
use crate::application::tile_data_service::TileDataError;
use crate::application::workspace_repository::WorkspaceError;
use crate::application::workspace_shell::WorkspaceShell;
use crate::domain::time_scale::{parse_date, LinearScale};
use crate::infrastructure::http_response::{
    clear_session_cookie, json_with_cache, session_cookie, svg_response, ApiError,
};
use crate::presentation::app_state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, Response},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_CANVAS_WIDTH: u32 = 960;
const MIN_CANVAS_WIDTH: u32 = 320;
const MAX_CANVAS_WIDTH: u32 = 4096;
const CANVAS_VIEWPORT_HEIGHT: f64 = 10_000.0;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_story: Option<String>,
    pub source: crate::domain::tile::TileSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub fetch_kind: &'static str,
}

#[derive(Serialize)]
pub struct ModelView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tiles: Vec<TileView>,
}

/// Catalogue of models with their tiles resolved
pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry();
    let models: Vec<ModelView> = registry
        .models()
        .iter()
        .map(|model| ModelView {
            id: model.id.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            tiles: registry
                .model_tiles(model)
                .map(|tile| TileView {
                    id: tile.id.clone(),
                    label: tile.label.clone(),
                    description: tile.description.clone(),
                    chart_story: tile.chart_story.clone(),
                    source: tile.source.clone(),
                    source_url: tile.source_url(),
                    fetch_kind: tile.fetch.kind(),
                })
                .collect(),
        })
        .collect();
    Json(json!({ "models": models }))
}

/// Normalized payload for one tile
pub async fn tile_data(
    Path(tile_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, ApiError> {
    match state.tile_data.tile_data(&tile_id).await {
        Ok(payload) => json_with_cache(&payload, state.tile_data.options().revalidate.as_secs()),
        Err(e @ (TileDataError::UnknownTile | TileDataError::NoData)) => Err(ApiError::NotFound(e.to_string())),
        Err(TileDataError::Upstream(e)) => {
            tracing::warn!("Tile {} upstream failure: {:#}", tile_id, e);
            Err(ApiError::Upstream(e.to_string()))
        }
    }
}

#[derive(Deserialize)]
pub struct CanvasQuery {
    pub tiles: Option<String>,
    pub width: Option<u32>,
    /// Place the cursor at this date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`)
    pub at: Option<String>,
    /// Tile whose track is hovered; defaults to the first one
    pub hover: Option<String>,
}

/// Render the canvas for a comma separated tile list as SVG
pub async fn canvas_svg(
    Query(query): Query<CanvasQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, ApiError> {
    let registry = state.registry().clone();
    let width = query
        .width
        .unwrap_or(DEFAULT_CANVAS_WIDTH)
        .clamp(MIN_CANVAS_WIDTH, MAX_CANVAS_WIDTH) as f64;

    let mut shell = WorkspaceShell::new(registry.clone());
    let tile_ids = query.tiles.as_deref().unwrap_or("");
    for tile_id in tile_ids.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let model_id = registry
            .owning_model(tile_id)
            .map(|m| m.id.clone())
            .ok_or_else(|| ApiError::NotFound(format!("Unknown tile {}", tile_id)))?;
        shell
            .add_tile(&model_id, tile_id)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }

    let mut canvas = CanvasState::new(registry);
    canvas.set_chart_area(chart_area_for_width(width));
    canvas.set_viewport(width, CANVAS_VIEWPORT_HEIGHT);

    let client = Arc::new(ServiceTileDataClient::new(state.tile_data.clone()));
    let mut driver = CanvasDriver::new(canvas, client);
    driver.set_tracks(shell.tracks());
    driver.settle().await;

    if let Some(at) = query.at.as_deref() {
        hover_canvas_at(driver.state_mut(), at, query.hover.as_deref());
    }

    svg_response(render_canvas(driver.state(), width))
}

/// Drive the pointer events a hover at `at` would produce.
fn hover_canvas_at(canvas: &mut CanvasState, at: &str, hover_tile: Option<&str>) {
    let track = canvas
        .tracks()
        .iter()
        .find(|t| hover_tile.is_none_or(|h| t.tile_id == h))
        .cloned();
    let Some(track) = track else { return };

    let entries = match canvas.data_state(&track.tile_id) {
        Some(TileDataState::Ok(payload)) => payload.series_keys().count(),
        _ => 0,
    };
    let (w, h) = estimated_tooltip_size(entries);
    canvas.measure_tooltip(w, h);

    let area = canvas.chart_area();
    let x = LinearScale::for_domain(canvas.domain(), 0.0, area.width).to_pixel(parse_date(at) as f64);
    canvas.pointer_move(area.client_left + x, 120.0);
    canvas.animation_frame();
    canvas.hover_track(Some(&track.id));
}

pub async fn get_workspace(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state
        .session_user(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;
    let stored = state.workspaces.get(&user_id).await.map_err(workspace_error)?;
    Ok(Json(json!({ "state": stored })))
}

pub async fn put_workspace(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let user_id = state
        .session_user(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;
    let body: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;
    let workspace = body
        .get("state")
        .filter(|s| s.is_object())
        .ok_or_else(|| ApiError::BadRequest("Bad request: state required".to_string()))?;

    state
        .workspaces
        .put(&user_id, workspace)
        .await
        .map_err(workspace_error)?;
    Ok(Json(json!({ "ok": true })))
}

fn workspace_error(e: WorkspaceError) -> ApiError {
    match e {
        WorkspaceError::InvalidState => ApiError::BadRequest(e.to_string()),
        WorkspaceError::Storage(inner) => {
            tracing::error!("Workspace storage failed: {:#}", inner);
            ApiError::Internal("Failed to access workspace".to_string())
        }
    }
}

/// Identity of the signed-in user, or null
pub async fn me(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.session_user(&headers) {
        Some(id) => Json(json!({ "user": { "id": id } })),
        None => Json(json!({ "user": null })),
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

pub async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response<Body>, ApiError> {
    if !state.auth.is_configured() {
        return Err(ApiError::Unavailable(AuthError::NotConfigured.to_string()));
    }
    let request: LoginRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;

    let session = state
        .auth
        .login(
            request.username.as_deref().unwrap_or(""),
            request.password.as_deref().unwrap_or(""),
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| match e {
            AuthError::NotConfigured => ApiError::Unavailable(e.to_string()),
            AuthError::MissingCredentials => ApiError::BadRequest(e.to_string()),
            AuthError::InvalidCredentials => ApiError::Unauthorized(e.to_string()),
            AuthError::Issue => ApiError::Internal(e.to_string()),
        })?;

    tracing::info!("Signed in {}", session.user_id);
    let cookie = session_cookie(&state.cookie, &session.token, session.max_age)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response())
}

pub async fn logout(State(state): State<Arc<AppState>>) -> Result<Response<Body>, ApiError> {
    let cookie = clear_session_cookie(&state.cookie)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response())
}
