// Application state for HTTP handlers
use crate::application::auth_service::AuthService;
use crate::application::registry::Registry;
use crate::application::tile_data_service::TileDataService;
use crate::application::workspace_repository::WorkspaceRepository;
use crate::infrastructure::http_response::{read_cookie, CookieSettings};
use axum::http::HeaderMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tile_data: TileDataService,
    pub auth: AuthService,
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn registry(&self) -> &Arc<Registry> {
        self.tile_data.registry()
    }

    /// User id from a valid session cookie, if auth is configured.
    pub fn session_user(&self, headers: &HeaderMap) -> Option<String> {
        let token = read_cookie(headers, &self.cookie.name)?;
        self.auth.verify(token, chrono::Utc::now().timestamp())
    }
}
