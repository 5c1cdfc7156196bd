// Application layer - Catalogue, data loading, canvas and workspace logic
pub mod auth_service;
pub mod autosave;
pub mod canvas;
pub mod canvas_driver;
pub mod chart_renderer;
pub mod registry;
pub mod series_source;
pub mod tile_data_service;
pub mod workspace_repository;
pub mod workspace_shell;
