//! In-memory adapter for tests and for embedding without a database.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::Adapter;
use crate::error::{ErrorCode, GatekeeperError, Result};
use crate::rbac::models::PolicySnapshot;

/// Holds the "persisted" snapshot behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    snapshot: Mutex<PolicySnapshot>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing persisted contents.
    pub fn with_snapshot(snapshot: PolicySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Contents as of the last successful save.
    pub fn persisted(&self) -> PolicySnapshot {
        self.snapshot.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail with a storage error until reset.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn load_all(&self) -> Result<PolicySnapshot> {
        Ok(self.snapshot.lock().clone())
    }

    async fn save_all(&self, snapshot: &PolicySnapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(GatekeeperError::storage(
                ErrorCode::StorageUnavailable,
                "memory adapter is rejecting saves",
            ));
        }
        *self.snapshot.lock() = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
