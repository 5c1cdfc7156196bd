// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use geo_timeline::application::auth_service::AuthService;
use geo_timeline::application::series_source::FetchOptions;
use geo_timeline::application::tile_data_service::TileDataService;
use geo_timeline::infrastructure::config::{load_app_config, load_registry, AuthSettings};
use geo_timeline::infrastructure::file_workspace_repository::FileWorkspaceRepository;
use geo_timeline::infrastructure::fred_client::FredClient;
use geo_timeline::infrastructure::http_response::CookieSettings;
use geo_timeline::infrastructure::session_token::auth_credentials;
use geo_timeline::presentation::app_state::AppState;
use geo_timeline::presentation::router::build_router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;
    let registry = Arc::new(load_registry(Path::new(&config.data.registry_path))?);
    tracing::info!(
        "Loaded {} models, {} tiles ({} FRED series)",
        registry.models().len(),
        registry.tile_count(),
        registry.fred_series_ids().len()
    );

    // Data sources (infrastructure layer)
    let options = FetchOptions::revalidate_seconds(config.data.revalidate_seconds);
    let fred = Arc::new(FredClient::new(config.data.fred_base_url.clone()));
    let workspaces = Arc::new(FileWorkspaceRepository::new(&config.workspace.dir));
    tracing::info!(
        "Workspaces stored in {} (client autosave delay {:?})",
        config.workspace.dir,
        config.workspace.autosave_delay()
    );

    // Services (application layer)
    let tile_data = TileDataService::new(registry, fred, options);
    let credentials = AuthSettings::from_env().and_then(|settings| match auth_credentials(settings) {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            tracing::error!("Ignoring auth settings: {:#}", e);
            None
        }
    });
    let auth = AuthService::new(credentials, Duration::from_secs(config.session.max_age_seconds));
    if !auth.is_configured() {
        tracing::warn!("Auth not configured; workspace endpoints will reject every request");
    }

    let state = Arc::new(AppState {
        tile_data,
        auth,
        workspaces,
        cookie: CookieSettings {
            name: config.session.cookie_name.clone(),
            secure: config.session.secure,
        },
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting geo-timeline service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
