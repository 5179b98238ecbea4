//! Bookmark Reconciliation Engine for Newsroom.
//!
//! Produces the single bookmark list the UI renders. Without an identity the
//! guest store is authoritative. Once an identity arrives, guest bookmarks
//! are migrated into the remote set, the pending queue is flushed, and the
//! rendered list becomes the remote list with queued mutations applied
//! optimistically.
//!
//! Exactly-once effect per URL comes from the URL-presence check before each
//! migration create plus treating a duplicate as success. Results of gateway
//! calls are applied only if the session they were issued under is still
//! current.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::managers::guest_bookmarks::{GuestBookmarkStore, GuestBookmarkStoreTrait};
use crate::managers::pending_queue::PendingQueue;
use crate::services::gateway::BookmarkGateway;
use crate::types::article::Article;
use crate::types::bookmark::{Bookmark, LOCAL_ID_PREFIX};
use crate::types::errors::{GatewayError, StoreError, SyncError};
use crate::types::pending::{
    EnqueueOutcome, FlushAbort, FlushOutcome, FlushReport, FlushedOperation, PendingKind,
};
use crate::types::sync::{SyncPhase, SyncReport, SyncStatus, TrackedBookmark};
use crate::types::user::Identity;

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    token: String,
}

/// Identity, credential and generation captured when a call starts.
#[derive(Debug, Clone)]
struct Snapshot {
    owner_id: String,
    token: String,
    generation: u64,
}

struct EngineState {
    phase: SyncPhase,
    session: Option<Session>,
    /// Bumped whenever the session is replaced or dropped.
    generation: u64,
    /// Remote bookmarks known to exist, in the order they were learned.
    remote: Vec<Bookmark>,
    /// Queued adds whose last flush attempt failed, by URL.
    failures: HashMap<String, String>,
}

impl EngineState {
    fn snapshot(&self) -> Option<Snapshot> {
        self.session.as_ref().map(|s| Snapshot {
            owner_id: s.identity.id.clone(),
            token: s.token.clone(),
            generation: self.generation,
        })
    }

    fn remember(&mut self, bookmark: Bookmark) {
        self.failures.remove(bookmark.url());
        if let Some(slot) = self.remote.iter_mut().find(|b| b.url() == bookmark.url()) {
            *slot = bookmark;
        } else {
            self.remote.push(bookmark);
        }
    }

    fn forget(&mut self, bookmark_id: &str) {
        self.remote.retain(|b| b.id != bookmark_id);
    }

    fn remote_by_url(&self, url: &str) -> Option<&Bookmark> {
        self.remote.iter().find(|b| b.url() == url)
    }
}

/// Releases an identity's init slot when the run that claimed it ends.
struct InitSlot<'a> {
    running: &'a Mutex<HashSet<String>>,
    owner_id: String,
}

impl<'a> InitSlot<'a> {
    fn claim(running: &'a Mutex<HashSet<String>>, owner_id: &str) -> Option<Self> {
        let mut set = running.lock().unwrap_or_else(|p| p.into_inner());
        set.insert(owner_id.to_string()).then(|| Self {
            running,
            owner_id: owner_id.to_string(),
        })
    }
}

impl Drop for InitSlot<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.owner_id);
    }
}

/// Reconciles guest, queued and remote bookmarks for at most one session.
pub struct ReconciliationEngine {
    guests: Arc<GuestBookmarkStore>,
    queue: Arc<PendingQueue>,
    gateway: Arc<dyn BookmarkGateway>,
    state: Mutex<EngineState>,
    initializing: Mutex<HashSet<String>>,
}

impl ReconciliationEngine {
    pub fn new(
        guests: Arc<GuestBookmarkStore>,
        queue: Arc<PendingQueue>,
        gateway: Arc<dyn BookmarkGateway>,
    ) -> Self {
        Self {
            guests,
            queue,
            gateway,
            state: Mutex::new(EngineState {
                phase: SyncPhase::Uninitialized,
                session: None,
                generation: 0,
                remote: Vec::new(),
                failures: HashMap::new(),
            }),
            initializing: Mutex::new(HashSet::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn phase(&self) -> SyncPhase {
        self.lock().phase
    }

    /// The identity the engine is currently reconciling for.
    pub fn identity(&self) -> Option<Identity> {
        self.lock().session.as_ref().map(|s| s.identity.clone())
    }

    fn set_phase(state: &mut EngineState, phase: SyncPhase) {
        if state.phase != phase {
            info!(from = state.phase.as_str(), to = phase.as_str(), "sync phase changed");
            state.phase = phase;
        }
    }

    /// Applies `f` only if the session captured in `snap` is still current.
    fn apply<T>(&self, snap: &Snapshot, f: impl FnOnce(&mut EngineState) -> T) -> Option<T> {
        let mut state = self.lock();
        if state.generation != snap.generation {
            debug!(owner = %snap.owner_id, "discarding result for a replaced session");
            return None;
        }
        Some(f(&mut state))
    }

    fn require_session(&self) -> Result<Snapshot, SyncError> {
        self.lock().snapshot().ok_or(SyncError::NoSession)
    }

    // === Session lifecycle ===

    /// Attaches `identity` and reconciles: fetch the remote list, migrate
    /// guest bookmarks, then flush the identity's queue.
    ///
    /// A second call for the same identity while one is running coalesces.
    /// On a transport failure the engine stays in `MigrationPending` and
    /// the guest list keeps rendering until the next connectivity event.
    pub async fn init_for_user(
        &self,
        identity: Identity,
        token: String,
    ) -> Result<SyncReport, SyncError> {
        let Some(_slot) = InitSlot::claim(&self.initializing, &identity.id) else {
            debug!(user = %identity.id, "initialization already running, coalescing");
            return Ok(SyncReport::Coalesced);
        };

        let snap = {
            let mut state = self.lock();
            let same_identity = state
                .session
                .as_ref()
                .is_some_and(|s| s.identity.id == identity.id);
            if !same_identity {
                state.generation += 1;
                state.remote.clear();
                state.failures.clear();
            }
            info!(user = %identity.id, generation = state.generation, "initializing bookmarks for user");
            state.session = Some(Session { identity, token });
            Self::set_phase(&mut state, SyncPhase::Migrating);
            state.snapshot().ok_or(SyncError::NoSession)?
        };

        self.reconcile(&snap).await
    }

    /// Re-runs reconciliation for the current session after the network came
    /// back. This is also the trigger that flushes the queue.
    pub async fn connectivity_restored(&self) -> Result<SyncReport, SyncError> {
        let snap = self.require_session()?;
        let Some(_slot) = InitSlot::claim(&self.initializing, &snap.owner_id) else {
            return Ok(SyncReport::Coalesced);
        };
        if self
            .apply(&snap, |state| Self::set_phase(state, SyncPhase::Reconnecting))
            .is_none()
        {
            return Ok(SyncReport::Stale);
        }
        self.reconcile(&snap).await
    }

    /// Drops the session. The identity's queue and remote state are abandoned.
    pub fn logout(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(session) = state.session.take() {
            self.queue.clear_owner(&session.identity.id)?;
            info!(user = %session.identity.id, "session closed");
        }
        Self::reset(&mut state, SyncPhase::LoggedOut);
        Ok(())
    }

    /// Drops a session whose credential stopped working. The queue is kept so
    /// the same identity resumes it after signing in again.
    pub fn expire_session(&self) {
        let mut state = self.lock();
        if let Some(session) = state.session.take() {
            warn!(user = %session.identity.id, "session expired, falling back to guest mode");
        }
        Self::reset(&mut state, SyncPhase::Uninitialized);
    }

    fn reset(state: &mut EngineState, phase: SyncPhase) {
        state.generation += 1;
        state.remote.clear();
        state.failures.clear();
        Self::set_phase(state, phase);
    }

    async fn reconcile(&self, snap: &Snapshot) -> Result<SyncReport, SyncError> {
        let remote = match self.gateway.list(&snap.token).await {
            Ok(remote) => remote,
            Err(e) => return self.migration_failed(snap, e),
        };
        let Some(()) = self.apply(snap, |state| {
            state.remote.clear();
            for bookmark in remote {
                state.remember(bookmark);
            }
        }) else {
            return Ok(SyncReport::Stale);
        };

        let (migrated, already_remote) = match self.migrate_guests(snap).await? {
            Some(counts) => counts,
            None => return Ok(SyncReport::Stale),
        };

        if self
            .apply(snap, |state| Self::set_phase(state, SyncPhase::Synced))
            .is_none()
        {
            return Ok(SyncReport::Stale);
        }
        info!(owner = %snap.owner_id, migrated, already_remote, "guest bookmarks migrated");

        let flush = self.flush_for(snap).await?;
        Ok(SyncReport::Completed {
            migrated,
            already_remote,
            flush,
        })
    }

    /// Submits every guest bookmark the remote set lacks, in insertion order.
    ///
    /// Each guest entry is removed as soon as its URL is known to be remote,
    /// so an interrupted run resumes where it stopped. Returns `None` when the
    /// session was replaced mid-run.
    async fn migrate_guests(&self, snap: &Snapshot) -> Result<Option<(usize, usize)>, SyncError> {
        let mut migrated = 0;
        let mut already_remote = 0;

        for guest in self.guests.list()? {
            let url = guest.url().to_string();
            let Some(present) = self.apply(snap, |state| state.remote_by_url(&url).is_some()) else {
                return Ok(None);
            };
            if present {
                already_remote += 1;
                self.guests.remove(&url)?;
                continue;
            }

            match self.gateway.create(&guest.article, &snap.token).await {
                Ok(created) => {
                    migrated += 1;
                    self.guests.remove(&url)?;
                    debug!(%url, id = %created.id, "guest bookmark migrated");
                    self.apply(snap, |state| state.remember(created));
                }
                Err(GatewayError::Conflict { existing, .. }) => {
                    already_remote += 1;
                    self.guests.remove(&url)?;
                    if let Some(existing) = existing {
                        self.apply(snap, |state| state.remember(*existing));
                    }
                }
                Err(e) if e.is_retryable() || e.is_auth() => {
                    return self.migration_failed(snap, e).map(|_| None);
                }
                Err(e) => {
                    warn!(%url, error = %e, "dropping guest bookmark the gateway refused");
                    self.guests.remove(&url)?;
                }
            }
        }

        self.guests.clear()?;
        Ok(Some((migrated, already_remote)))
    }

    fn migration_failed(&self, snap: &Snapshot, error: GatewayError) -> Result<SyncReport, SyncError> {
        warn!(owner = %snap.owner_id, error = %error, "migration interrupted, will retry on reconnect");
        match self.apply(snap, |state| Self::set_phase(state, SyncPhase::MigrationPending)) {
            Some(()) => Err(error.into()),
            None => Ok(SyncReport::Stale),
        }
    }

    // === Mutations ===

    /// Saves an article for the current owner.
    ///
    /// Without a session this is a guest add. With one the gateway is called
    /// directly; a transport failure queues the add and renders it as pending.
    /// A validation failure is returned and nothing is queued. An auth
    /// failure queues the add and is returned so the caller can drop the session.
    pub async fn add_bookmark(&self, article: Article) -> Result<TrackedBookmark, SyncError> {
        if !article.has_url() {
            return Err(SyncError::Validation("Missing article".to_string()));
        }

        let Some(snap) = self.lock().snapshot() else {
            return self.add_guest(article);
        };

        let existing = self.lock().remote_by_url(&article.url).cloned();
        if let Some(existing) = existing {
            if self.queued_remove(&snap.owner_id, &existing.id)? {
                // Re-adding something whose delete has not been sent yet.
                let outcome = self.queue.enqueue(&snap.owner_id, PendingKind::Add { article })?;
                if let EnqueueOutcome::Queued(seq) = outcome {
                    return Ok(self.queued_add(&snap, existing.article, seq));
                }
            }
            return Ok(confirmed(existing));
        }

        match self.gateway.create(&article, &snap.token).await {
            Ok(created) => {
                info!(url = %created.url(), id = %created.id, "bookmark saved");
                self.apply(&snap, |state| state.remember(created.clone()));
                Ok(confirmed(created))
            }
            Err(GatewayError::Conflict { existing: Some(existing), .. }) => {
                self.apply(&snap, |state| state.remember((*existing).clone()));
                Ok(confirmed(*existing))
            }
            Err(GatewayError::Conflict { message, existing: None }) => {
                let remote = self.gateway.list(&snap.token).await?;
                let found = remote.iter().find(|b| b.url() == article.url).cloned();
                self.apply(&snap, |state| remote.into_iter().for_each(|b| state.remember(b)));
                found.map(confirmed).ok_or(SyncError::Validation(message))
            }
            Err(e) if e.is_retryable() || e.is_auth() => {
                let url = article.url.clone();
                let outcome = self.queue.enqueue(&snap.owner_id, PendingKind::Add { article: article.clone() })?;
                warn!(%url, error = %e, ?outcome, "bookmark add queued");
                if e.is_auth() {
                    return Err(e.into());
                }
                let seq = match outcome {
                    EnqueueOutcome::Queued(seq) => seq,
                    _ => self.queued_add_seq(&snap.owner_id, &url)?.unwrap_or_default(),
                };
                Ok(self.queued_add(&snap, article, seq))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn add_guest(&self, article: Article) -> Result<TrackedBookmark, SyncError> {
        let bookmark = match self.guests.add(&article)? {
            Some(added) => added,
            None => self
                .guests
                .list()?
                .into_iter()
                .find(|b| b.url() == article.url)
                .unwrap_or_else(|| Bookmark::guest(article)),
        };
        Ok(TrackedBookmark {
            bookmark,
            status: SyncStatus::Pending,
        })
    }

    fn queued_remove(&self, owner_id: &str, bookmark_id: &str) -> Result<bool, SyncError> {
        Ok(self.queue.list(owner_id)?.iter().any(|op| {
            matches!(&op.kind, PendingKind::Remove { bookmark_id: id, .. } if id == bookmark_id)
        }))
    }

    fn queued_add_seq(&self, owner_id: &str, url: &str) -> Result<Option<i64>, SyncError> {
        Ok(self
            .queue
            .list(owner_id)?
            .iter()
            .find(|op| matches!(op.kind, PendingKind::Add { .. }) && op.kind.url() == url)
            .map(|op| op.seq))
    }

    /// Cancels the owner's queued add for `url`, if any. Returns whether one existed.
    fn cancel_queued_add(&self, snap: &Snapshot, url: &str) -> Result<bool, SyncError> {
        if self.queued_add_seq(&snap.owner_id, url)?.is_none() {
            return Ok(false);
        }
        let outcome = self.queue.enqueue(
            &snap.owner_id,
            PendingKind::Remove {
                bookmark_id: String::new(),
                url: url.to_string(),
            },
        )?;
        debug!(%url, ?outcome, "queued add cancelled");
        self.lock().failures.remove(url);
        Ok(true)
    }

    fn queued_add(&self, snap: &Snapshot, article: Article, seq: i64) -> TrackedBookmark {
        let bookmark = Bookmark {
            id: format!("{}{}", LOCAL_ID_PREFIX, seq),
            user_id: Some(snap.owner_id.clone()),
            article,
            saved_at: chrono::Utc::now(),
        };
        TrackedBookmark {
            bookmark,
            status: SyncStatus::Pending,
        }
    }

    /// Removes the article with `url` from the current owner's list.
    ///
    /// Returns false when nothing with that URL was saved. A transport
    /// failure queues the delete and hides the bookmark at once.
    pub async fn remove_bookmark(&self, url: &str) -> Result<bool, SyncError> {
        let Some(snap) = self.lock().snapshot() else {
            return Ok(self.guests.remove(url)?);
        };

        let remote = self.lock().remote_by_url(url).cloned();
        let Some(remote) = remote else {
            // Only local copies: a guest entry awaiting migration or a queued add.
            let guest_removed = self.guests.remove(url)?;
            let queued_add = self.cancel_queued_add(&snap, url)?;
            return Ok(guest_removed || queued_add);
        };
        if self.queued_remove(&snap.owner_id, &remote.id)? {
            // The delete is queued or on the wire; a re-add may sit behind it.
            return self.cancel_queued_add(&snap, url);
        }

        match self.gateway.delete(&remote.id, &snap.token).await {
            Ok(()) | Err(GatewayError::NotFound(_)) => {
                info!(%url, id = %remote.id, "bookmark removed");
                self.apply(&snap, |state| state.forget(&remote.id));
                Ok(true)
            }
            Err(e) if e.is_retryable() || e.is_auth() => {
                let outcome = self.queue.enqueue(
                    &snap.owner_id,
                    PendingKind::Remove {
                        bookmark_id: remote.id.clone(),
                        url: url.to_string(),
                    },
                )?;
                warn!(%url, error = %e, ?outcome, "bookmark remove queued");
                if e.is_auth() {
                    return Err(e.into());
                }
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drains the current owner's queue and folds the results into the
    /// remote list. Coalesces with a flush that is already running.
    pub async fn flush(&self) -> Result<FlushReport, SyncError> {
        let snap = self.require_session()?;
        self.flush_for(&snap).await
    }

    async fn flush_for(&self, snap: &Snapshot) -> Result<FlushReport, SyncError> {
        let report = self
            .queue
            .flush(self.gateway.as_ref(), &snap.token, &snap.owner_id)
            .await?;
        if report.is_coalesced() {
            return Ok(report);
        }

        let mut refresh = false;
        self.apply(snap, |state| {
            for op in &report.completed {
                match op {
                    FlushedOperation::Created(bookmark) => state.remember(bookmark.clone()),
                    FlushedOperation::AlreadyPresent { existing: Some(b), .. } => {
                        state.remember(b.clone())
                    }
                    FlushedOperation::AlreadyPresent { url, existing: None } => {
                        state.failures.remove(url);
                        refresh = true;
                    }
                    FlushedOperation::Removed { bookmark_id, .. } => state.forget(bookmark_id),
                    FlushedOperation::Rejected { url, .. } => {
                        state.failures.remove(url);
                    }
                }
            }
            if let FlushOutcome::Aborted { url, cause } = &report.outcome {
                let reason = match cause {
                    FlushAbort::Auth(msg) | FlushAbort::Network(msg) => msg.clone(),
                };
                state.failures.insert(url.clone(), reason);
            }
        });

        if refresh {
            match self.gateway.list(&snap.token).await {
                Ok(remote) => {
                    self.apply(snap, |state| remote.into_iter().for_each(|b| state.remember(b)));
                }
                Err(e) => warn!(error = %e, "could not refresh remote bookmarks after flush"),
            }
        }
        Ok(report)
    }

    // === Rendering ===

    /// The unified list, keyed by URL.
    ///
    /// Without a session: the guest list, all pending. With one: remote
    /// bookmarks minus queued removes, then queued adds, then guest entries
    /// still awaiting migration.
    pub fn view(&self) -> Result<Vec<TrackedBookmark>, SyncError> {
        let (snap, remote, failures) = {
            let state = self.lock();
            (state.snapshot(), state.remote.clone(), state.failures.clone())
        };

        let Some(snap) = snap else {
            return Ok(self
                .guests
                .list()?
                .into_iter()
                .map(|bookmark| TrackedBookmark {
                    bookmark,
                    status: SyncStatus::Pending,
                })
                .collect());
        };

        let queued = self.queue.list(&snap.owner_id)?;
        let removed: HashSet<&str> = queued
            .iter()
            .filter_map(|op| match &op.kind {
                PendingKind::Remove { bookmark_id, .. } => Some(bookmark_id.as_str()),
                PendingKind::Add { .. } => None,
            })
            .collect();

        let mut seen = HashSet::new();
        let mut view = Vec::new();
        for bookmark in remote {
            if removed.contains(bookmark.id.as_str()) || !seen.insert(bookmark.url().to_string()) {
                continue;
            }
            view.push(confirmed(bookmark));
        }
        for op in &queued {
            let PendingKind::Add { article } = &op.kind else {
                continue;
            };
            if !seen.insert(article.url.clone()) {
                continue;
            }
            let status = match failures.get(&article.url) {
                Some(reason) => SyncStatus::Failed {
                    reason: reason.clone(),
                },
                None => SyncStatus::Pending,
            };
            view.push(TrackedBookmark {
                bookmark: Bookmark {
                    id: format!("{}{}", LOCAL_ID_PREFIX, op.seq),
                    user_id: Some(op.owner_id.clone()),
                    article: article.clone(),
                    saved_at: op.enqueued_at,
                },
                status,
            });
        }
        for guest in self.guests.list()? {
            if seen.insert(guest.url().to_string()) {
                view.push(TrackedBookmark {
                    bookmark: guest,
                    status: SyncStatus::Pending,
                });
            }
        }
        Ok(view)
    }

    pub fn is_saved(&self, url: &str) -> Result<bool, SyncError> {
        if self.lock().snapshot().is_none() {
            return Ok(self.guests.contains(url)?);
        }
        Ok(self.view()?.iter().any(|t| t.url() == url))
    }
}

fn confirmed(bookmark: Bookmark) -> TrackedBookmark {
    TrackedBookmark {
        status: SyncStatus::Confirmed {
            id: bookmark.id.clone(),
        },
        bookmark,
    }
}
