//! Pending-Operation Queue for Newsroom.
//!
//! A durable FIFO log of bookmark mutations that could not reach the gateway.
//! The queue stays minimal: an add and a remove for the same URL cancel each
//! other, and a repeated mutation is ignored. Entries are scoped by owner so a
//! session that expired can resume its queue after signing in again.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};

use crate::database::connection::Database;
use crate::services::gateway::BookmarkGateway;
use crate::types::errors::{GatewayError, StoreError};
use crate::types::pending::{
    EnqueueOutcome, FlushAbort, FlushOutcome, FlushReport, FlushedOperation, PendingKind,
    PendingOperation,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Marks an owner's queue as flushing until the flush that claimed it ends, however it ends.
struct FlushGuard<'a> {
    owners: &'a Mutex<HashSet<String>>,
    owner_id: String,
}

impl<'a> FlushGuard<'a> {
    fn acquire(owners: &'a Mutex<HashSet<String>>, owner_id: &str) -> Option<Self> {
        lock(owners).insert(owner_id.to_string()).then(|| Self {
            owners,
            owner_id: owner_id.to_string(),
        })
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        lock(self.owners).remove(&self.owner_id);
    }
}

enum Step {
    Done(FlushedOperation),
    Abort(FlushAbort),
}

/// Pending-operation queue backed by the `pending_operations` table.
pub struct PendingQueue {
    db: Arc<Database>,
    /// Owners whose queue is being flushed.
    flushing: Mutex<HashSet<String>>,
    /// Per owner, the sequence number of the entry whose gateway call is outstanding.
    in_flight: Mutex<HashMap<String, i64>>,
}

impl PendingQueue {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            flushing: Mutex::new(HashSet::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true while a flush of `owner_id`'s queue is running.
    pub fn is_flushing(&self, owner_id: &str) -> bool {
        lock(&self.flushing).contains(owner_id)
    }

    fn in_flight(&self, owner_id: &str) -> Option<i64> {
        lock(&self.in_flight).get(owner_id).copied()
    }

    fn set_in_flight(&self, owner_id: &str, seq: Option<i64>) {
        let mut in_flight = lock(&self.in_flight);
        match seq {
            Some(seq) => in_flight.insert(owner_id.to_string(), seq),
            None => in_flight.remove(owner_id),
        };
    }

    /// Submits a mutation for `owner_id`.
    ///
    /// A remove cancels a queued add for the same URL. An add cancels a queued
    /// remove, unless that remove is already being sent, in which case the add
    /// is appended behind it.
    pub fn enqueue(&self, owner_id: &str, kind: PendingKind) -> Result<EnqueueOutcome, StoreError> {
        let url = kind.url().to_string();
        let label = kind.label();
        let payload_json = serde_json::to_string(&kind)?;
        let in_flight = self.in_flight(owner_id);

        let mut conn = self.db.connection();
        let tx = conn.transaction()?;

        let existing: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(
                "SELECT seq, kind FROM pending_operations WHERE owner_id = ?1 AND url = ?2 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![owner_id, url], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<_, _>>()?
        };

        let opposite = existing.iter().rev().find(|(seq, existing_label)| {
            existing_label != label
                && (matches!(kind, PendingKind::Remove { .. }) || Some(*seq) != in_flight)
        });

        if let Some((seq, existing_label)) = opposite {
            tx.execute("DELETE FROM pending_operations WHERE seq = ?1", params![seq])?;
            tx.commit()?;
            info!(%url, cancelled = %existing_label, by = label, "pending operations annihilated");
            return Ok(EnqueueOutcome::Annihilated);
        }

        if existing
            .iter()
            .any(|(seq, existing_label)| existing_label == label && Some(*seq) != in_flight)
        {
            debug!(%url, kind = label, "pending operation already queued");
            return Ok(EnqueueOutcome::Duplicate);
        }

        tx.execute(
            "INSERT INTO pending_operations (owner_id, kind, url, payload_json, enqueued_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![owner_id, label, url, payload_json, Utc::now().to_rfc3339()],
        )?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;
        info!(%url, kind = label, seq, "pending operation queued");
        Ok(EnqueueOutcome::Queued(seq))
    }

    /// Returns the owner's queued operations in submission order.
    pub fn list(&self, owner_id: &str) -> Result<Vec<PendingOperation>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT seq, owner_id, payload_json, enqueued_at FROM pending_operations WHERE owner_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![owner_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut ops = Vec::new();
        for row in rows {
            let (seq, owner_id, payload_json, enqueued_at) = row?;
            ops.push(Self::decode(seq, owner_id, &payload_json, &enqueued_at)?);
        }
        Ok(ops)
    }

    pub fn len(&self, owner_id: &str) -> Result<usize, StoreError> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM pending_operations WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn is_empty(&self, owner_id: &str) -> Result<bool, StoreError> {
        Ok(self.len(owner_id)? == 0)
    }

    /// Abandons every queued operation of `owner_id`. Returns how many were dropped.
    pub fn clear_owner(&self, owner_id: &str) -> Result<usize, StoreError> {
        let removed = self.db.connection().execute(
            "DELETE FROM pending_operations WHERE owner_id = ?1",
            params![owner_id],
        )?;
        if removed > 0 {
            info!(owner = owner_id, removed, "pending operations abandoned");
        }
        Ok(removed)
    }

    fn peek(&self, owner_id: &str) -> Result<Option<PendingOperation>, StoreError> {
        let row: Option<(i64, String, String, String)> = self
            .db
            .connection()
            .query_row(
                "SELECT seq, owner_id, payload_json, enqueued_at FROM pending_operations WHERE owner_id = ?1 ORDER BY seq LIMIT 1",
                params![owner_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        match row {
            Some((seq, owner_id, payload_json, enqueued_at)) => {
                Ok(Some(Self::decode(seq, owner_id, &payload_json, &enqueued_at)?))
            }
            None => Ok(None),
        }
    }

    /// Deletes a flushed entry. Returns false if it had already been cancelled.
    fn complete(&self, seq: i64) -> Result<bool, StoreError> {
        let affected = self
            .db
            .connection()
            .execute("DELETE FROM pending_operations WHERE seq = ?1", params![seq])?;
        Ok(affected > 0)
    }

    fn decode(
        seq: i64,
        owner_id: String,
        payload_json: &str,
        enqueued_at: &str,
    ) -> Result<PendingOperation, StoreError> {
        let kind: PendingKind = serde_json::from_str(payload_json)?;
        let enqueued_at = DateTime::parse_from_rfc3339(enqueued_at)
            .map_err(|e| StoreError::Serialization(e.to_string()))?
            .with_timezone(&Utc);
        Ok(PendingOperation {
            seq,
            owner_id,
            kind,
            enqueued_at,
        })
    }

    /// Replays the owner's queue against the gateway, oldest first.
    ///
    /// Each entry leaves the queue only once it reaches a terminal state:
    /// success, an already-satisfied duplicate or missing bookmark, or a
    /// permanent refusal. An auth or transport failure stops the flush and
    /// leaves the failing entry and everything after it queued. A call made
    /// while another flush is running returns at once as coalesced.
    pub async fn flush(
        &self,
        gateway: &dyn BookmarkGateway,
        token: &str,
        owner_id: &str,
    ) -> Result<FlushReport, StoreError> {
        let Some(_guard) = FlushGuard::acquire(&self.flushing, owner_id) else {
            debug!(owner = owner_id, "flush already running, coalescing");
            return Ok(FlushReport::coalesced(self.len(owner_id)?));
        };

        let mut completed = Vec::new();
        while let Some(op) = self.peek(owner_id)? {
            self.set_in_flight(owner_id, Some(op.seq));
            let step = self.replay(gateway, token, &op).await;
            self.set_in_flight(owner_id, None);

            match step? {
                Step::Done(flushed) => completed.push(flushed),
                Step::Abort(cause) => {
                    let remaining = self.len(owner_id)?;
                    warn!(owner = owner_id, url = %op.kind.url(), ?cause, remaining, "flush aborted");
                    return Ok(FlushReport {
                        outcome: FlushOutcome::Aborted {
                            url: op.kind.url().to_string(),
                            cause,
                        },
                        completed,
                        remaining,
                    });
                }
            }
        }

        info!(owner = owner_id, flushed = completed.len(), "pending queue drained");
        Ok(FlushReport {
            outcome: FlushOutcome::Drained,
            completed,
            remaining: 0,
        })
    }

    async fn replay(
        &self,
        gateway: &dyn BookmarkGateway,
        token: &str,
        op: &PendingOperation,
    ) -> Result<Step, StoreError> {
        match &op.kind {
            PendingKind::Add { article } => match gateway.create(article, token).await {
                Ok(bookmark) => {
                    if !self.complete(op.seq)? {
                        // Cancelled by a remove while the create was outstanding.
                        self.enqueue(
                            &op.owner_id,
                            PendingKind::Remove {
                                bookmark_id: bookmark.id.clone(),
                                url: article.url.clone(),
                            },
                        )?;
                    }
                    Ok(Step::Done(FlushedOperation::Created(bookmark)))
                }
                Err(GatewayError::Conflict { existing, .. }) => {
                    self.complete(op.seq)?;
                    Ok(Step::Done(FlushedOperation::AlreadyPresent {
                        url: article.url.clone(),
                        existing: existing.map(|b| *b),
                    }))
                }
                Err(e) => self.settle_failure(op, e),
            },
            PendingKind::Remove { bookmark_id, url } => {
                match gateway.delete(bookmark_id, token).await {
                    Ok(()) | Err(GatewayError::NotFound(_)) => {
                        self.complete(op.seq)?;
                        Ok(Step::Done(FlushedOperation::Removed {
                            bookmark_id: bookmark_id.clone(),
                            url: url.clone(),
                        }))
                    }
                    Err(e) => self.settle_failure(op, e),
                }
            }
        }
    }

    fn settle_failure(&self, op: &PendingOperation, error: GatewayError) -> Result<Step, StoreError> {
        match error {
            GatewayError::Auth(msg) => Ok(Step::Abort(FlushAbort::Auth(msg))),
            e if e.is_retryable() => Ok(Step::Abort(FlushAbort::Network(e.to_string()))),
            e => {
                warn!(url = %op.kind.url(), kind = op.kind.label(), error = %e, "dropping rejected pending operation");
                self.complete(op.seq)?;
                Ok(Step::Done(FlushedOperation::Rejected {
                    url: op.kind.url().to_string(),
                    reason: e.to_string(),
                }))
            }
        }
    }
}
