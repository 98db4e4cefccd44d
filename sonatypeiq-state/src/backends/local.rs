//! Local file backend for state storage
//!
//! State lives in a JSON file (default: sonatypeiq.tfstate.json). The
//! previous version is kept as `<file>.backup`, and a sibling `.lock` file
//! created exclusively serves as the lock.

use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendError, BackendResult, StateBackend, check_overwrite};
use crate::lock::LockInfo;
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "sonatypeiq.tfstate.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.state_path.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    async fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        match fs::read_to_string(&self.lock_path).await {
            Ok(content) => Ok(serde_json::from_str::<LockInfo>(&content).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::Io(format!("Failed to read lock file: {}", e))),
        }
    }

    async fn remove_lock_file(&self) -> BackendResult<()> {
        fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }

    async fn create_lock_file(&self, lock: &LockInfo) -> BackendResult<bool> {
        let content = serde_json::to_string_pretty(lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(BackendError::Io(format!("Failed to create lock file: {}", e))),
        };

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;
        Ok(true)
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Io(format!("Failed to read state file: {}", e))),
        };

        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;

        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await? {
            check_overwrite(&stored, state)?;
            fs::copy(&self.state_path, self.backup_path())
                .await
                .map_err(|e| BackendError::Io(format!("Failed to back up state file: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        // Write to a temporary sibling first so a crash never leaves a torn file
        let tmp_path = self.state_path.with_extension("tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;
        fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;

        debug!(
            "Wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        let lock = LockInfo::new(operation);
        if self.create_lock_file(&lock).await? {
            return Ok(lock);
        }

        // An unreadable or expired lock may be taken over
        if let Some(existing) = self.read_lock().await?
            && !existing.is_expired()
        {
            return Err(BackendError::locked(&existing));
        }

        debug!("Taking over stale lock at {}", self.lock_path.display());
        self.remove_lock_file().await?;
        if self.create_lock_file(&lock).await? {
            Ok(lock)
        } else {
            match self.read_lock().await? {
                Some(existing) => Err(BackendError::locked(&existing)),
                None => Err(BackendError::Io("Failed to acquire lock".to_string())),
            }
        }
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }

        self.remove_lock_file().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        if !fs::try_exists(&self.lock_path).await.unwrap_or(false) {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        }

        if let Some(existing) = self.read_lock().await?
            && existing.id != lock_id
        {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }

        self.remove_lock_file().await
    }

    async fn init(&self) -> BackendResult<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::Io(format!("Failed to create state directory: {}", e)))?;
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
