// Canvas driver - Runs tile fetches on tokio and feeds completions back into the canvas
use crate::application::canvas::{CanvasState, TileFetchError};
use crate::application::tile_data_service::{TileDataError, TileDataService};
use crate::domain::payload::TileDataPayload;
use crate::domain::workspace::Track;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Anything that can load a tile payload by id
#[async_trait]
pub trait TileDataClient: Send + Sync {
    async fn fetch_tile(&self, tile_id: &str) -> Result<TileDataPayload, TileFetchError>;
}

/// Calls the tile data service directly, reporting errors with the status the
/// HTTP endpoint would have used.
pub struct ServiceTileDataClient {
    service: TileDataService,
}

impl ServiceTileDataClient {
    pub fn new(service: TileDataService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TileDataClient for ServiceTileDataClient {
    async fn fetch_tile(&self, tile_id: &str) -> Result<TileDataPayload, TileFetchError> {
        self.service.tile_data(tile_id).await.map_err(|e| match e {
            TileDataError::UnknownTile | TileDataError::NoData => TileFetchError::Status(404),
            TileDataError::Upstream(_) => TileFetchError::Status(502),
        })
    }
}

type Completion = (String, Result<TileDataPayload, TileFetchError>);

/// Owns a [`CanvasState`] and applies fetch completions to it one at a time.
/// In-flight fetches are never cancelled.
pub struct CanvasDriver {
    state: CanvasState,
    client: Arc<dyn TileDataClient>,
    fetches: JoinSet<Completion>,
}

impl CanvasDriver {
    pub fn new(state: CanvasState, client: Arc<dyn TileDataClient>) -> Self {
        Self {
            state,
            client,
            fetches: JoinSet::new(),
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CanvasState {
        &mut self.state
    }

    pub fn into_state(self) -> CanvasState {
        self.state
    }

    pub fn in_flight(&self) -> usize {
        self.fetches.len()
    }

    /// Update the visible tracks and spawn one fetch per newly started tile.
    pub fn set_tracks(&mut self, tracks: &[Track]) -> usize {
        let started = self.state.sync_tracks(tracks);
        for tile_id in &started {
            let client = self.client.clone();
            let tile_id = tile_id.clone();
            self.fetches.spawn(async move {
                // A panicking client still settles its tile
                let result = AssertUnwindSafe(client.fetch_tile(&tile_id))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        tracing::error!("Fetch for tile {} panicked", tile_id);
                        Err(TileFetchError::Transport("fetch task panicked".to_string()))
                    });
                (tile_id, result)
            });
        }
        started.len()
    }

    /// Wait for the next fetch to finish and apply it. Returns the tile id,
    /// or `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<String> {
        loop {
            match self.fetches.join_next().await? {
                Ok((tile_id, result)) => {
                    self.state.apply_fetch_result(&tile_id, result);
                    return Some(tile_id);
                }
                Err(e) => tracing::warn!("Tile fetch task ended without a result: {}", e),
            }
        }
    }

    /// Apply completions until no fetch is left in flight.
    pub async fn settle(&mut self) {
        while self.next_completion().await.is_some() {}
    }
}
