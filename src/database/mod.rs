//! Newsroom local persistence.
//!
//! One SQLite file holds the session row, the guest bookmark list and the
//! pending-operation log. Every store shares a single [`Database`] handle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use newsroom::database::Database;
//!
//! let db = Arc::new(Database::open("newsroom.db").expect("open database"));
//! let version = newsroom::database::migrations::get_schema_version(&db.connection());
//! assert_eq!(version, newsroom::database::migrations::CURRENT_SCHEMA_VERSION);
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
