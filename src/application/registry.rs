// Registry - Static lookup over the model and tile catalogue
use crate::domain::tile::{RegistryModel, TileDef};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid catalogue: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate tile id {0}")]
    DuplicateTile(String),
    #[error("model {model} references unknown tile {tile}")]
    UnknownTile { model: String, tile: String },
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default)]
    models: Vec<RegistryModel>,
    #[serde(default)]
    tiles: Vec<TileDef>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    models: Vec<RegistryModel>,
    tiles: Vec<TileDef>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new(models: Vec<RegistryModel>, tiles: Vec<TileDef>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(tiles.len());
        for (i, tile) in tiles.iter().enumerate() {
            if index.insert(tile.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateTile(tile.id.clone()));
            }
        }
        for model in &models {
            if let Some(missing) = model.tiles.iter().find(|t| !index.contains_key(*t)) {
                return Err(RegistryError::UnknownTile {
                    model: model.id.clone(),
                    tile: missing.clone(),
                });
            }
        }
        Ok(Self {
            models,
            tiles,
            index,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RegistryError> {
        let file: CatalogueFile = toml::from_str(text)?;
        Self::new(file.models, file.tiles)
    }

    pub fn models(&self) -> &[RegistryModel] {
        &self.models
    }

    pub fn model(&self, model_id: &str) -> Option<&RegistryModel> {
        self.models.iter().find(|m| m.id == model_id)
    }

    pub fn tile(&self, tile_id: &str) -> Option<&TileDef> {
        self.index.get(tile_id).map(|&i| &self.tiles[i])
    }

    /// Tiles of a model in catalogue order
    pub fn model_tiles<'a>(&'a self, model: &'a RegistryModel) -> impl Iterator<Item = &'a TileDef> {
        model.tiles.iter().filter_map(|id| self.tile(id))
    }

    /// First model exposing the tile; used when a track is created from a bare tile id.
    pub fn owning_model(&self, tile_id: &str) -> Option<&RegistryModel> {
        self.models.iter().find(|m| m.tiles.iter().any(|t| t == tile_id))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn fred_series_ids(&self) -> HashSet<&str> {
        self.tiles
            .iter()
            .filter_map(|t| match &t.fetch {
                crate::domain::tile::FetchDescriptor::FredMulti { series } => Some(series),
                _ => None,
            })
            .flatten()
            .map(|s| s.id.as_str())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::tile::FetchDescriptor;

    pub(crate) fn catalogue() -> Registry {
        Registry::from_toml_str(include_str!("../../config/registry.toml")).unwrap()
    }

    #[test]
    fn test_bundled_catalogue_loads() {
        let registry = catalogue();
        assert_eq!(registry.models().len(), 9);
        assert_eq!(registry.tile_count(), 55);
        assert!(registry.fred_series_ids().contains("UNRATE"));
    }

    #[test]
    fn test_lookup_by_tile_id() {
        let registry = catalogue();
        let tile = registry.tile("wealth-distribution").unwrap();
        assert_eq!(tile.fetch, FetchDescriptor::WealthDistribution);
        assert_eq!(
            tile.source_url().as_deref(),
            Some("https://fred.stlouisfed.org/series/WFRBST01108")
        );
        assert!(registry.tile("no-such-tile").is_none());
    }

    #[test]
    fn test_shared_tiles_resolve_to_first_model() {
        let registry = catalogue();
        let owner = registry.owning_model("wealth-distribution").unwrap();
        assert_eq!(owner.id, "generational-theory");

        let model = registry.model("economic-machine").unwrap();
        assert_eq!(registry.model_tiles(model).count(), model.tiles.len());
    }

    #[test]
    fn test_rejects_dangling_model_tile() {
        let err = Registry::from_toml_str(
            r#"
            [[models]]
            id = "m"
            name = "M"
            description = "d"
            tiles = ["missing"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTile { .. }));
    }

    #[test]
    fn test_rejects_duplicate_tile() {
        let tile = r#"
            [[tiles]]
            id = "a"
            label = "A"
            description = "d"
            source = { provider = "p" }
            fetch = { kind = "stub" }
        "#;
        let err = Registry::from_toml_str(&format!("{}{}", tile, tile)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTile(id) if id == "a"));
    }
}
