//! Saved-list query: search, source filter and sort over the rendered list.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::sync::TrackedBookmark;

/// Ordering of the saved list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently saved first.
    #[default]
    Recent,
    Oldest,
    /// Title A-Z.
    TitleAsc,
    /// Title Z-A.
    TitleDesc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recent" => Ok(SortOrder::Recent),
            "oldest" => Ok(SortOrder::Oldest),
            "az" | "title_asc" => Ok(SortOrder::TitleAsc),
            "za" | "title_desc" => Ok(SortOrder::TitleDesc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

/// Filter and ordering applied to the saved list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedQuery {
    /// Case-insensitive text matched against title and description.
    pub search: Option<String>,
    /// Source name to keep; `None` or `"all"` keeps every source.
    pub source: Option<String>,
    pub sort: SortOrder,
}

impl SavedQuery {
    pub fn matches(&self, item: &TrackedBookmark) -> bool {
        let article = &item.bookmark.article;

        if let Some(source) = self.source.as_deref().map(str::trim) {
            if !source.is_empty()
                && !source.eq_ignore_ascii_case("all")
                && !article.source.name.eq_ignore_ascii_case(source)
            {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                article.title.to_lowercase().contains(&needle)
                    || article
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    /// Filters and sorts `items`.
    pub fn apply(&self, items: Vec<TrackedBookmark>) -> Vec<TrackedBookmark> {
        let mut kept: Vec<TrackedBookmark> = items.into_iter().filter(|i| self.matches(i)).collect();
        match self.sort {
            SortOrder::Recent => kept.sort_by(|a, b| b.bookmark.saved_at.cmp(&a.bookmark.saved_at)),
            SortOrder::Oldest => kept.sort_by(|a, b| a.bookmark.saved_at.cmp(&b.bookmark.saved_at)),
            SortOrder::TitleAsc => kept.sort_by_cached_key(|i| i.bookmark.article.title.to_lowercase()),
            SortOrder::TitleDesc => {
                kept.sort_by_cached_key(|i| i.bookmark.article.title.to_lowercase());
                kept.reverse();
            }
        }
        kept
    }
}

/// Distinct non-empty source names, alphabetically.
pub fn sources(items: &[TrackedBookmark]) -> Vec<String> {
    items
        .iter()
        .map(|i| i.bookmark.article.source.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
