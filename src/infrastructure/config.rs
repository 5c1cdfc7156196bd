use crate::application::registry::Registry;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const APP_CONFIG_PATH: &str = "config/app.toml";
const ENV_PREFIX: &str = "TIMELINE";
const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub workspace: WorkspaceSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSettings {
    pub revalidate_seconds: u64,
    pub fred_base_url: String,
    pub registry_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceSettings {
    pub dir: String,
    pub autosave_delay_ms: u64,
}

impl WorkspaceSettings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub secure: bool,
    pub max_age_seconds: u64,
}

/// Credentials for the single configured user
#[derive(Clone)]
pub struct AuthSettings {
    pub username: String,
    pub password_hash: String,
    pub session_secret: String,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AuthSettings {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `None` unless all three values are present and the session secret is
    /// long enough.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let username = non_empty("AUTH_USERNAME")?;
        let password_hash = non_empty("AUTH_PASSWORD_HASH")?;
        let session_secret = non_empty("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            tracing::warn!("SESSION_SECRET must be at least {} characters", MIN_SESSION_SECRET_LEN);
            return None;
        }
        Some(Self {
            username,
            password_hash,
            session_secret,
        })
    }
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from(Path::new(APP_CONFIG_PATH))
}

/// Defaults, then the optional TOML file, then `TIMELINE__SECTION__KEY`
/// environment variables.
pub fn load_app_config_from(path: &Path) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("data.revalidate_seconds", 300)?
        .set_default("data.fred_base_url", "https://fred.stlouisfed.org")?
        .set_default("data.registry_path", "config/registry.toml")?
        .set_default("workspace.dir", "data/workspaces")?
        .set_default("workspace.autosave_delay_ms", 800)?
        .set_default("session.cookie_name", "geo_session")?
        .set_default("session.secure", false)?
        .set_default("session.max_age_seconds", 60 * 60 * 24 * 7)?
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_registry(path: &Path) -> anyhow::Result<Registry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalogue {}", path.display()))?;
    Registry::from_toml_str(&text).with_context(|| format!("Invalid catalogue {}", path.display()))
}
