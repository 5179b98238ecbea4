// Newsroom services
// Services provide core functionality: gateways, reconciliation, authentication, the saved list, settings.

pub mod auth_service;
pub mod gateway;
#[cfg(feature = "http")]
pub mod http_gateway;
pub mod memory_gateway;
pub mod reconciliation;
pub mod saved_view;
pub mod settings_engine;
