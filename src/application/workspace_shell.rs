// Workspace shell - Track list, scenes and tile sets edited from the sidebar
use crate::application::registry::Registry;
use crate::domain::workspace::{dedupe_by_tile_id, Scene, TileSet, Track, WorkspaceState};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ShellError {
    #[error("unknown model {0}")]
    UnknownModel(String),
    #[error("unknown tile {0}")]
    UnknownTile(String),
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct WorkspaceShell {
    registry: Arc<Registry>,
    state: WorkspaceState,
}

impl WorkspaceShell {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: WorkspaceState::default(),
        }
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn tracks(&self) -> &[Track] {
        &self.state.tracks
    }

    /// Add a tile from a model. Returns false when a track for the tile
    /// already exists.
    pub fn add_tile(&mut self, model_id: &str, tile_id: &str) -> Result<bool, ShellError> {
        let model = self
            .registry
            .model(model_id)
            .ok_or_else(|| ShellError::UnknownModel(model_id.to_string()))?;
        let tile = self
            .registry
            .tile(tile_id)
            .ok_or_else(|| ShellError::UnknownTile(tile_id.to_string()))?;

        if self.state.tracks.iter().any(|t| t.tile_id == tile.id) {
            return Ok(false);
        }
        self.state.tracks.push(Track {
            id: format!("track-{}-{}-{}", model.id, tile.id, now_ms()),
            model_id: model.id.clone(),
            model_name: model.name.clone(),
            tile_id: tile.id.clone(),
            tile_name: tile.label.clone(),
        });
        Ok(true)
    }

    pub fn remove_tile(&mut self, tile_id: &str) {
        self.state.tracks.retain(|t| t.tile_id != tile_id);
    }

    pub fn remove_track(&mut self, track_id: &str) {
        self.state.tracks.retain(|t| t.id != track_id);
    }

    pub fn clear_all(&mut self) {
        self.state.tracks.clear();
    }

    pub fn select_model(&mut self, model_id: Option<&str>) {
        self.state.selected_model_id = model_id.map(str::to_string);
    }

    pub fn save_scene(&mut self, name: &str) -> &Scene {
        self.state.scenes.push(Scene {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            tracks: self.state.tracks.clone(),
            created_at: now_ms(),
        });
        &self.state.scenes[self.state.scenes.len() - 1]
    }

    /// Make `scene_id` the active scene and replace the tracks with its
    /// snapshot. `None` only clears the active scene.
    pub fn load_scene(&mut self, scene_id: Option<&str>) {
        self.state.active_scene_id = scene_id.map(str::to_string);
        let Some(id) = scene_id else { return };
        if let Some(scene) = self.state.scenes.iter().find(|s| s.id == id) {
            self.state.tracks = dedupe_by_tile_id(scene.tracks.clone());
        }
    }

    pub fn save_tile_set(&mut self, name: &str) -> &TileSet {
        self.state.tile_sets.push(TileSet {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            tracks: self.state.tracks.clone(),
            created_at: now_ms(),
        });
        &self.state.tile_sets[self.state.tile_sets.len() - 1]
    }

    pub fn apply_tile_set(&mut self, tile_set_id: &str) -> bool {
        match self.state.tile_sets.iter().find(|s| s.id == tile_set_id) {
            Some(set) => {
                self.state.tracks = dedupe_by_tile_id(set.tracks.clone());
                true
            }
            None => false,
        }
    }

    /// Restore from a stored document. Fields that are missing or of the
    /// wrong type are skipped, as are malformed list entries.
    pub fn hydrate(&mut self, stored: &Value) {
        let Some(obj) = stored.as_object() else {
            return;
        };
        if let Some(tracks) = obj.get("tracks").and_then(list_of::<Track>) {
            self.state.tracks = dedupe_by_tile_id(tracks);
        }
        if let Some(scenes) = obj.get("scenes").and_then(list_of::<Scene>) {
            self.state.scenes = scenes;
        }
        if let Some(sets) = obj.get("tileSets").and_then(list_of::<TileSet>) {
            self.state.tile_sets = sets;
        }
        if let Some(selected) = obj.get("selectedModelId").and_then(optional_string) {
            self.state.selected_model_id = selected;
        }
        if let Some(active) = obj.get("activeSceneId").and_then(optional_string) {
            self.state.active_scene_id = active;
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.state).unwrap_or(Value::Null)
    }
}

fn list_of<T: DeserializeOwned>(value: &Value) -> Option<Vec<T>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
    )
}

/// `Some(None)` for JSON null, `Some(Some(..))` for a string, `None` otherwise
fn optional_string(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}
