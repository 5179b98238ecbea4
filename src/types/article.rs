use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The publisher an article came from, as reported by the news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArticleSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// A news article. Immutable once received; the URL is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub source: ArticleSource,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Builds an article with only the fields the bookmark core needs.
    pub fn new(url: impl Into<String>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: None,
            url_to_image: None,
            source: ArticleSource {
                id: None,
                name: source.into(),
            },
            published_at: None,
        }
    }

    /// Returns true when the article carries a usable identifying URL.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}
