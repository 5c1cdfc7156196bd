// Workspace domain model: tracks on the canvas and saved snapshots of them
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A tile placed on the canvas. At most one track exists per tile id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub model_id: String,
    pub model_name: String,
    pub tile_id: String,
    pub tile_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub name: String,
    pub tracks: Vec<Track>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSet {
    pub id: String,
    pub name: String,
    pub tracks: Vec<Track>,
    pub created_at: i64,
}

/// Everything persisted for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    pub tracks: Vec<Track>,
    pub scenes: Vec<Scene>,
    pub tile_sets: Vec<TileSet>,
    pub selected_model_id: Option<String>,
    pub active_scene_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    NotSaved,
    Saving,
    Saved,
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::NotSaved => "Not saved",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "Saved",
        }
    }
}

/// Keep the first track for each tile id, preserving order.
pub fn dedupe_by_tile_id(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.tile_id.clone()))
        .collect()
}
