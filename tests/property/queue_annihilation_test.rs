//! Property-based tests for pending-queue annihilation.
//!
//! With no flush running, the queue never holds more than one entry per URL,
//! and an add followed by a remove of the same URL leaves nothing behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use newsroom::database::Database;
use newsroom::managers::pending_queue::PendingQueue;
use newsroom::types::article::Article;
use newsroom::types::pending::{EnqueueOutcome, PendingKind};
use proptest::prelude::*;

const OWNER: &str = "u-1";

fn arb_url() -> impl Strategy<Value = String> {
    (0u8..5).prop_map(|n| format!("https://news.example/{}", n))
}

fn arb_kind() -> impl Strategy<Value = PendingKind> {
    (any::<bool>(), arb_url()).prop_map(|(add, url)| {
        if add {
            PendingKind::Add { article: Article::new(url, "Title", "Wire") }
        } else {
            PendingKind::Remove { bookmark_id: format!("b-{}", url), url }
        }
    })
}

fn setup() -> PendingQueue {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    PendingQueue::new(Arc::new(db))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn add_then_remove_leaves_no_trace(url in arb_url(), others in prop::collection::vec(arb_url(), 0..4)) {
        let queue = setup();
        for other in others.iter().filter(|o| **o != url) {
            queue.enqueue(OWNER, PendingKind::Add { article: Article::new(other.clone(), "T", "W") }).unwrap();
        }
        let before = queue.len(OWNER).unwrap();

        let added = queue.enqueue(OWNER, PendingKind::Add { article: Article::new(url.clone(), "T", "W") }).unwrap();
        prop_assert!(matches!(added, EnqueueOutcome::Queued(_)));
        let removed = queue
            .enqueue(OWNER, PendingKind::Remove { bookmark_id: String::new(), url: url.clone() })
            .unwrap();
        prop_assert_eq!(removed, EnqueueOutcome::Annihilated);

        prop_assert_eq!(queue.len(OWNER).unwrap(), before);
        prop_assert!(queue.list(OWNER).unwrap().iter().all(|op| op.kind.url() != url));
    }

    #[test]
    fn queue_stays_minimal(kinds in prop::collection::vec(arb_kind(), 0..40)) {
        let queue = setup();
        let mut model: BTreeMap<String, &'static str> = BTreeMap::new();

        for kind in kinds {
            let url = kind.url().to_string();
            let label = kind.label();
            let outcome = queue.enqueue(OWNER, kind).unwrap();
            match model.get(&url).copied() {
                Some(existing) if existing != label => {
                    prop_assert_eq!(outcome, EnqueueOutcome::Annihilated);
                    model.remove(&url);
                }
                Some(_) => prop_assert_eq!(outcome, EnqueueOutcome::Duplicate),
                None => {
                    prop_assert!(matches!(outcome, EnqueueOutcome::Queued(_)));
                    model.insert(url, label);
                }
            }
        }

        let ops = queue.list(OWNER).unwrap();
        prop_assert_eq!(ops.len(), model.len());
        for op in &ops {
            prop_assert_eq!(model.get(op.kind.url()).copied(), Some(op.kind.label()));
        }
        prop_assert!(ops.windows(2).all(|w| w[0].seq < w[1].seq));
    }
}
