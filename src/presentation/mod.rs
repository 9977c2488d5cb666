// Presentation layer - HTTP surface for producers and the dashboard
pub mod app_state;
pub mod handlers;
pub mod router;
