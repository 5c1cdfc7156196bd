// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod file_workspace_repository;
pub mod fred_client;
pub mod http_response;
pub mod http_tile_client;
pub mod session_token;
