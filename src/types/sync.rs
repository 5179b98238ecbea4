use serde::{Deserialize, Serialize};

use super::bookmark::Bookmark;
use super::pending::FlushReport;

/// Where the reconciliation engine is in the per-session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No identity; the guest list is authoritative.
    Uninitialized,
    /// An identity just arrived and guest bookmarks are being transferred.
    Migrating,
    /// Migration could not reach the gateway; retried on the next connectivity event.
    MigrationPending,
    /// Remote list loaded and guest bookmarks merged.
    Synced,
    /// Re-running migration and flush after connectivity came back.
    Reconnecting,
    /// The identity was cleared by an explicit logout.
    LoggedOut,
}

impl SyncPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncPhase::Uninitialized => "uninitialized",
            SyncPhase::Migrating => "migrating",
            SyncPhase::MigrationPending => "migration_pending",
            SyncPhase::Synced => "synced",
            SyncPhase::Reconnecting => "reconnecting",
            SyncPhase::LoggedOut => "logged_out",
        }
    }
}

/// Per-bookmark synchronization state shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Only known locally: a guest entry or a queued add.
    Pending,
    /// Stored by the gateway under this identifier.
    Confirmed { id: String },
    /// The last attempt to store it failed; it stays eligible for retry.
    Failed { reason: String },
}

/// A bookmark together with its synchronization state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedBookmark {
    pub bookmark: Bookmark,
    pub status: SyncStatus,
}

impl TrackedBookmark {
    pub fn url(&self) -> &str {
        self.bookmark.url()
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, SyncStatus::Confirmed { .. })
    }
}

/// Summary of one `init_for_user` run.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncReport {
    /// Migration finished and the queue was flushed.
    Completed {
        migrated: usize,
        already_remote: usize,
        flush: FlushReport,
    },
    /// An identical run for the same identity was already in progress.
    Coalesced,
    /// The session changed while the run was in flight; its results were discarded.
    Stale,
}
