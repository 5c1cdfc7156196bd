// HTTP client for the tile data endpoint
use crate::application::canvas::TileFetchError;
use crate::application::canvas_driver::TileDataClient;
use crate::domain::payload::TileDataPayload;
use async_trait::async_trait;

#[derive(Clone)]
pub struct HttpTileClient {
    base_url: String,
    client: reqwest::Client,
    session_cookie: Option<String>,
}

impl HttpTileClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            session_cookie: None,
        }
    }

    /// Send `name=value` as the Cookie header on every request.
    pub fn with_session_cookie(mut self, name: &str, value: &str) -> Self {
        self.session_cookie = Some(format!("{}={}", name, value));
        self
    }
}

#[async_trait]
impl TileDataClient for HttpTileClient {
    async fn fetch_tile(&self, tile_id: &str) -> Result<TileDataPayload, TileFetchError> {
        let url = format!("{}/api/data/{}", self.base_url, urlencoding::encode(tile_id));
        let mut request = self.client.get(&url);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TileFetchError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TileFetchError::Status(response.status().as_u16()));
        }
        response
            .json::<TileDataPayload>()
            .await
            .map_err(|e| TileFetchError::Transport(e.to_string()))
    }
}
