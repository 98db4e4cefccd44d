//! State backend trait and error types

use async_trait::async_trait;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another process
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    /// State file is corrupted or invalid
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// A write would replace state belonging to another lineage
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    /// A write would go back to an older serial
    #[error("Stale state: serial {attempted} is not newer than stored serial {stored}")]
    StaleSerial { stored: u64, attempted: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Trait for state storage backends
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state; `None` on first use
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state
    ///
    /// The serial must already be incremented; writing an older serial or a
    /// different lineage over existing state fails.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire a lock for the given operation
    ///
    /// Fails if another unexpired lock is held.
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock previously returned by `acquire_lock`
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by id, regardless of who holds it
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Prepare the backend storage
    async fn init(&self) -> BackendResult<()>;

    /// Short backend kind name, e.g. "local"
    fn backend_type(&self) -> &'static str;
}

/// Reject writes that would clobber newer or unrelated state
pub fn check_overwrite(stored: &StateFile, incoming: &StateFile) -> BackendResult<()> {
    if stored.lineage != incoming.lineage {
        return Err(BackendError::LineageMismatch {
            expected: stored.lineage.clone(),
            actual: incoming.lineage.clone(),
        });
    }
    if incoming.serial <= stored.serial {
        return Err(BackendError::StaleSerial {
            stored: stored.serial,
            attempted: incoming.serial,
        });
    }
    Ok(())
}
