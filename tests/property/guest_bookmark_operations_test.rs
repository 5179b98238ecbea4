//! Property-based tests for guest bookmark store operations.
//!
//! Adding is idempotent per URL and the list keeps first-insertion order,
//! for arbitrary sequences of adds and removes.

use std::sync::Arc;

use newsroom::database::Database;
use newsroom::managers::guest_bookmarks::{GuestBookmarkStore, GuestBookmarkStoreTrait};
use newsroom::types::article::Article;
use proptest::prelude::*;

/// Strategy for URLs drawn from a small pool so sequences revisit the same articles.
fn arb_url() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| format!("https://news.example/{}", n))
}

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Remove(String),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_url().prop_map(Op::Add),
        1 => arb_url().prop_map(Op::Remove),
    ]
}

fn setup() -> GuestBookmarkStore {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    GuestBookmarkStore::new(Arc::new(db))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn repeated_adds_store_one_entry(url in arb_url(), times in 1usize..5) {
        let store = setup();
        let article = Article::new(url.clone(), "Title", "Wire");
        let first = store.add(&article).unwrap();
        prop_assert!(first.is_some());
        for _ in 1..times {
            prop_assert!(store.add(&article).unwrap().is_none());
        }
        let list = store.list().unwrap();
        prop_assert_eq!(list.len(), 1);
        prop_assert_eq!(&list[0].article.url, &url);
    }

    #[test]
    fn list_matches_insertion_order_model(ops in prop::collection::vec(arb_op(), 0..30)) {
        let store = setup();
        let mut model: Vec<String> = Vec::new();

        for op in &ops {
            match op {
                Op::Add(url) => {
                    let added = store.add(&Article::new(url.clone(), "Title", "Wire")).unwrap();
                    prop_assert_eq!(added.is_some(), !model.contains(url));
                    if !model.contains(url) {
                        model.push(url.clone());
                    }
                }
                Op::Remove(url) => {
                    let removed = store.remove(url).unwrap();
                    prop_assert_eq!(removed, model.contains(url));
                    model.retain(|u| u != url);
                }
            }
        }

        let urls: Vec<String> = store.list().unwrap().into_iter().map(|b| b.article.url).collect();
        prop_assert_eq!(urls, model);
    }
}
