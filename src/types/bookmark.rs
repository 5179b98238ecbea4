use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::article::Article;

/// Prefix of identifiers synthesized for bookmarks that only exist locally.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// A saved article, owned either by a user or by the anonymous guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    /// `None` for guest bookmarks.
    #[serde(default)]
    pub user_id: Option<String>,
    pub article: Article,
    pub saved_at: DateTime<Utc>,
}

impl Bookmark {
    /// Creates a guest bookmark with a synthesized local identifier.
    pub fn guest(article: Article) -> Self {
        Self {
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
            user_id: None,
            article,
            saved_at: Utc::now(),
        }
    }

    pub fn url(&self) -> &str {
        &self.article.url
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}
