//! Unit tests for the saved-list query.

use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;

use newsroom::services::saved_view::{sources, SavedQuery, SortOrder};
use newsroom::types::article::Article;
use newsroom::types::bookmark::Bookmark;
use newsroom::types::sync::{SyncStatus, TrackedBookmark};

fn item(url: &str, title: &str, source: &str, description: Option<&str>, minutes: i64) -> TrackedBookmark {
    let mut article = Article::new(url, title, source);
    article.description = description.map(str::to_string);
    TrackedBookmark {
        bookmark: Bookmark {
            id: url.to_string(),
            user_id: None,
            article,
            saved_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
        },
        status: SyncStatus::Pending,
    }
}

fn sample() -> Vec<TrackedBookmark> {
    vec![
        item("https://x/1", "Borrow checker tips", "LWN", Some("Lifetimes explained"), 1),
        item("https://x/2", "async in depth", "The Register", None, 3),
        item("https://x/3", "Compilers weekly", "LWN", Some("An ASYNC runtime story"), 2),
    ]
}

fn ids(items: &[TrackedBookmark]) -> Vec<&str> {
    items.iter().map(|i| i.bookmark.id.as_str()).collect()
}

#[rstest]
#[case(SortOrder::Recent, vec!["https://x/2", "https://x/3", "https://x/1"])]
#[case(SortOrder::Oldest, vec!["https://x/1", "https://x/3", "https://x/2"])]
#[case(SortOrder::TitleAsc, vec!["https://x/2", "https://x/1", "https://x/3"])]
#[case(SortOrder::TitleDesc, vec!["https://x/3", "https://x/1", "https://x/2"])]
fn test_sort_orders(#[case] sort: SortOrder, #[case] expected: Vec<&str>) {
    let query = SavedQuery {
        sort,
        ..SavedQuery::default()
    };
    assert_eq!(ids(&query.apply(sample())), expected);
}

#[test]
fn test_search_matches_title_and_description_case_insensitively() {
    let query = SavedQuery {
        search: Some("Async".into()),
        sort: SortOrder::Oldest,
        ..SavedQuery::default()
    };
    assert_eq!(ids(&query.apply(sample())), vec!["https://x/3", "https://x/2"]);
}

#[test]
fn test_source_filter() {
    let query = SavedQuery {
        source: Some("lwn".into()),
        sort: SortOrder::Oldest,
        ..SavedQuery::default()
    };
    assert_eq!(ids(&query.apply(sample())), vec!["https://x/1", "https://x/3"]);

    let all = SavedQuery {
        source: Some("all".into()),
        ..SavedQuery::default()
    };
    assert_eq!(all.apply(sample()).len(), 3);
}

#[test]
fn test_blank_search_keeps_everything() {
    let query = SavedQuery {
        search: Some("   ".into()),
        ..SavedQuery::default()
    };
    assert_eq!(query.apply(sample()).len(), 3);
}

#[test]
fn test_sources_are_distinct_and_sorted() {
    assert_eq!(sources(&sample()), vec!["LWN".to_string(), "The Register".to_string()]);
}

#[rstest]
#[case("recent", SortOrder::Recent)]
#[case("oldest", SortOrder::Oldest)]
#[case("az", SortOrder::TitleAsc)]
#[case("ZA", SortOrder::TitleDesc)]
fn test_sort_order_parses(#[case] input: &str, #[case] expected: SortOrder) {
    assert_eq!(input.parse::<SortOrder>().unwrap(), expected);
}

#[test]
fn test_unknown_sort_order() {
    assert!("newest".parse::<SortOrder>().is_err());
}
