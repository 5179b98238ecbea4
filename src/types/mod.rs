// Newsroom shared type definitions
// Each submodule defines types used across the application.

pub mod article;
pub mod bookmark;
pub mod errors;
pub mod pending;
pub mod settings;
pub mod sync;
pub mod user;
