#![allow(dead_code)]
//! Submission guard: one completed submission per employee ID, ever.
//!
//! The guard wraps a [`SubmissionStore`] with per-employee async locks so
//! that check-then-record is atomic from the caller's point of view. A
//! submission attempt takes a [`SubmissionTicket`] up front; the ticket
//! holds the employee's lock until it is committed or dropped, so two
//! concurrent attempts for the same ID cannot both pass the duplicate check.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::AppError;
use crate::submissions::store::SubmissionStore;

pub struct SubmissionGuard {
    store: Arc<dyn SubmissionStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SubmissionGuard {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a completed submission already exists for this employee.
    pub async fn contains(&self, employee_id: &str) -> Result<bool, AppError> {
        self.store.contains(employee_id).await
    }

    /// Records a completed submission directly, outside the ticket flow.
    pub async fn record(&self, employee_id: &str) -> Result<(), AppError> {
        let lock = self.lock_for(employee_id).await;
        let _permit = lock.lock_owned().await;
        self.store.add(employee_id).await
    }

    /// Starts a submission attempt. Fails with `DuplicateIdentity` if the
    /// employee has already submitted; otherwise returns a ticket holding
    /// the employee's lock. Concurrent attempts for the same ID queue here.
    pub async fn begin(&self, employee_id: &str) -> Result<SubmissionTicket, AppError> {
        let lock = self.lock_for(employee_id).await;
        let permit = lock.lock_owned().await;

        if self.store.contains(employee_id).await? {
            return Err(AppError::DuplicateIdentity(employee_id.to_string()));
        }

        Ok(SubmissionTicket {
            store: Arc::clone(&self.store),
            employee_id: employee_id.to_string(),
            _permit: permit,
        })
    }

    async fn lock_for(&self, employee_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // An entry nobody holds or waits on can be rebuilt on demand, so
        // sweep those out rather than letting the map grow with every id
        // ever attempted.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(employee_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Permission to record one submission. Dropping the ticket without
/// committing abandons the attempt and records nothing.
pub struct SubmissionTicket {
    store: Arc<dyn SubmissionStore>,
    employee_id: String,
    _permit: OwnedMutexGuard<()>,
}

impl SubmissionTicket {
    /// Records the submission in the ledger. The employee's lock is released
    /// when the ticket is consumed.
    pub async fn commit(self) -> Result<(), AppError> {
        self.store.add(&self.employee_id).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::submissions::store::MemorySubmissionStore;

    fn make_guard() -> Arc<SubmissionGuard> {
        Arc::new(SubmissionGuard::new(Arc::new(MemorySubmissionStore::new())))
    }

    #[tokio::test]
    async fn test_begin_then_commit_records_submission() {
        let guard = make_guard();

        let ticket = guard.begin("EMP-001").await.unwrap();
        assert!(!guard.contains("EMP-001").await.unwrap());

        ticket.commit().await.unwrap();
        assert!(guard.contains("EMP-001").await.unwrap());
    }

    #[tokio::test]
    async fn test_begin_rejects_recorded_employee() {
        let guard = make_guard();
        guard.record("EMP-001").await.unwrap();

        let result = guard.begin("EMP-001").await;
        assert!(matches!(result, Err(AppError::DuplicateIdentity(_))));
    }

    #[tokio::test]
    async fn test_dropped_ticket_records_nothing() {
        let guard = make_guard();

        let ticket = guard.begin("EMP-001").await.unwrap();
        drop(ticket);

        assert!(!guard.contains("EMP-001").await.unwrap());
        // The lock was released, so a fresh attempt succeeds.
        let retry = guard.begin("EMP-001").await.unwrap();
        retry.commit().await.unwrap();
        assert!(guard.contains("EMP-001").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let guard = make_guard();
        guard.record("EMP-001").await.unwrap();
        guard.record("EMP-001").await.unwrap();
        assert!(guard.contains("EMP-001").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_begins_for_same_id_serialize() {
        let guard = make_guard();

        let ticket = guard.begin("EMP-001").await.unwrap();

        let contender = {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move { guard.begin("EMP-001").await.map(|_| ()) })
        };

        // The contender must queue behind the held ticket.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        ticket.commit().await.unwrap();

        let result = contender.await.unwrap();
        assert!(matches!(result, Err(AppError::DuplicateIdentity(_))));
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block_each_other() {
        let guard = make_guard();

        let first = guard.begin("EMP-001").await.unwrap();
        let second = guard.begin("EMP-002").await.unwrap();

        first.commit().await.unwrap();
        second.commit().await.unwrap();

        assert!(guard.contains("EMP-001").await.unwrap());
        assert!(guard.contains("EMP-002").await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_map_prunes_entries_nobody_holds() {
        let guard = make_guard();

        let ticket = guard.begin("EMP-001").await.unwrap();
        ticket.commit().await.unwrap();
        let _ = guard.begin("EMP-002").await;

        // The next lookup sweeps both idle entries.
        guard.record("EMP-003").await.unwrap();

        {
            let locks = guard.locks.lock().await;
            assert!(!locks.contains_key("EMP-001"));
            assert!(!locks.contains_key("EMP-002"));
            assert_eq!(locks.len(), 1);
        }

        // Pruning forgets nothing: the ledger still rejects EMP-001.
        assert!(guard.contains("EMP-001").await.unwrap());
        assert!(matches!(
            guard.begin("EMP-001").await,
            Err(AppError::DuplicateIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_map_keeps_entries_still_held() {
        let guard = make_guard();
        let ticket = guard.begin("EMP-001").await.unwrap();

        // A sweep while the ticket is alive must not drop EMP-001's lock.
        guard.record("EMP-002").await.unwrap();
        {
            let locks = guard.locks.lock().await;
            assert!(locks.contains_key("EMP-001"));
        }

        ticket.commit().await.unwrap();
        assert!(guard.contains("EMP-001").await.unwrap());
    }
}
