use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::article::Article;
use super::bookmark::Bookmark;

/// A bookmark mutation waiting to be replayed against the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingKind {
    Add { article: Article },
    Remove { bookmark_id: String, url: String },
}

impl PendingKind {
    pub fn url(&self) -> &str {
        match self {
            PendingKind::Add { article } => &article.url,
            PendingKind::Remove { url, .. } => url,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PendingKind::Add { .. } => "add",
            PendingKind::Remove { .. } => "remove",
        }
    }
}

/// A queued mutation as stored in the pending-operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Monotonic submission sequence; flush order follows it.
    pub seq: i64,
    pub owner_id: String,
    pub kind: PendingKind,
    pub enqueued_at: DateTime<Utc>,
}

/// What `enqueue` did with a submitted mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the log under the given sequence number.
    Queued(i64),
    /// Cancelled an opposite, still-unflushed mutation for the same URL.
    Annihilated,
    /// An identical mutation for the same URL was already queued.
    Duplicate,
}

/// A queued mutation that reached a terminal state during flush.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushedOperation {
    /// The gateway stored the article.
    Created(Bookmark),
    /// The gateway already had the article; `existing` is its copy when reported.
    AlreadyPresent { url: String, existing: Option<Bookmark> },
    /// The bookmark is gone from the gateway (deleted now or before).
    Removed { bookmark_id: String, url: String },
    /// The gateway refused the mutation permanently; it was dropped.
    Rejected { url: String, reason: String },
}

/// Why a flush stopped before draining the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushAbort {
    Auth(String),
    Network(String),
}

/// How a flush call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Every queued entry for the owner reached a terminal state.
    Drained,
    /// Stopped at the head entry; it and everything after it stay queued.
    Aborted { url: String, cause: FlushAbort },
    /// Another flush was already running; this call did nothing.
    Coalesced,
}

/// Result of one `flush` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub outcome: FlushOutcome,
    pub completed: Vec<FlushedOperation>,
    pub remaining: usize,
}

impl FlushReport {
    pub fn coalesced(remaining: usize) -> Self {
        Self {
            outcome: FlushOutcome::Coalesced,
            completed: Vec::new(),
            remaining,
        }
    }

    pub fn is_coalesced(&self) -> bool {
        self.outcome == FlushOutcome::Coalesced
    }

    pub fn aborted_on_auth(&self) -> bool {
        matches!(
            self.outcome,
            FlushOutcome::Aborted {
                cause: FlushAbort::Auth(_),
                ..
            }
        )
    }
}
