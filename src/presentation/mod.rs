// Presentation layer - HTTP routes, handlers and request gating
pub mod app_state;
pub mod auth_gate;
pub mod handlers;
pub mod router;
