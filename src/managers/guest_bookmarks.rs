//! Guest Bookmark Store for Newsroom.
//!
//! Bookmarks saved while nobody is signed in. Entries are kept in insertion
//! order and are unique by article URL.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};

use crate::database::connection::Database;
use crate::types::article::Article;
use crate::types::bookmark::Bookmark;
use crate::types::errors::StoreError;

/// Trait defining guest bookmark operations.
pub trait GuestBookmarkStoreTrait {
    fn load(&self) -> Result<Vec<Bookmark>, StoreError>;
    fn add(&self, article: &Article) -> Result<Option<Bookmark>, StoreError>;
    fn remove(&self, url: &str) -> Result<bool, StoreError>;
    fn list(&self) -> Result<Vec<Bookmark>, StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Guest bookmark store backed by the `guest_bookmarks` table.
pub struct GuestBookmarkStore {
    db: Arc<Database>,
}

impl GuestBookmarkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns true when a guest bookmark exists for the URL.
    pub fn contains(&self, url: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .db
            .connection()
            .query_row(
                "SELECT position FROM guest_bookmarks WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Reads every row, skipping (and deleting) rows that no longer decode.
    fn read_all(&self) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT position, id, article_json, saved_at FROM guest_bookmarks ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut bookmarks = Vec::new();
        let mut corrupt = Vec::new();
        for row in rows {
            let (position, id, article_json, saved_at) = row?;
            let article = serde_json::from_str::<Article>(&article_json);
            let saved_at = DateTime::parse_from_rfc3339(&saved_at).map(|t| t.with_timezone(&Utc));
            match (article, saved_at) {
                (Ok(article), Ok(saved_at)) => bookmarks.push(Bookmark {
                    id,
                    user_id: None,
                    article,
                    saved_at,
                }),
                _ => corrupt.push(position),
            }
        }
        drop(stmt);

        for position in corrupt {
            warn!(position, "dropping unreadable guest bookmark");
            conn.execute(
                "DELETE FROM guest_bookmarks WHERE position = ?1",
                params![position],
            )?;
        }
        Ok(bookmarks)
    }
}

impl GuestBookmarkStoreTrait for GuestBookmarkStore {
    /// Restores the persisted list. An empty store yields an empty list.
    fn load(&self) -> Result<Vec<Bookmark>, StoreError> {
        let bookmarks = self.read_all()?;
        info!(count = bookmarks.len(), "guest bookmarks loaded");
        Ok(bookmarks)
    }

    /// Appends a guest bookmark unless one already exists for the URL.
    ///
    /// Returns the new bookmark, or `None` when the add was a no-op.
    fn add(&self, article: &Article) -> Result<Option<Bookmark>, StoreError> {
        let bookmark = Bookmark::guest(article.clone());
        let article_json = serde_json::to_string(&bookmark.article)?;

        let inserted = self.db.connection().execute(
            "INSERT OR IGNORE INTO guest_bookmarks (id, url, article_json, saved_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                bookmark.id,
                bookmark.article.url,
                article_json,
                bookmark.saved_at.to_rfc3339()
            ],
        )?;

        if inserted == 0 {
            debug!(url = %article.url, "guest bookmark already present");
            return Ok(None);
        }
        debug!(url = %article.url, id = %bookmark.id, "guest bookmark added");
        Ok(Some(bookmark))
    }

    /// Deletes the guest bookmark for the URL. Returns false when there was none.
    fn remove(&self, url: &str) -> Result<bool, StoreError> {
        let affected = self
            .db
            .connection()
            .execute("DELETE FROM guest_bookmarks WHERE url = ?1", params![url])?;
        Ok(affected > 0)
    }

    fn list(&self) -> Result<Vec<Bookmark>, StoreError> {
        self.read_all()
    }

    /// Empties the store, including its persisted rows.
    fn clear(&self) -> Result<(), StoreError> {
        let removed = self
            .db
            .connection()
            .execute("DELETE FROM guest_bookmarks", [])?;
        info!(removed, "guest bookmarks cleared");
        Ok(())
    }
}
