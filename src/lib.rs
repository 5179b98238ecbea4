//! Newsroom: bookmark synchronization core of a news-reading client.
//!
//! Guest bookmarks saved while signed out are merged into the user's
//! server-side list on sign-in; mutations that cannot reach the server are
//! queued and replayed when connectivity returns.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod rpc_handler;
pub mod services;
pub mod types;
