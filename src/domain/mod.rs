// Domain layer - Pure types and calculations
pub mod format;
pub mod payload;
pub mod static_datasets;
pub mod tile;
pub mod time_scale;
pub mod workspace;
