//! Lock information stored next to the state file

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default lock timeout in seconds (15 minutes)
pub const DEFAULT_LOCK_TIMEOUT_SECS: i64 = 900;

/// Information about a state lock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique identifier for this lock
    pub id: String,
    /// The operation holding the lock (e.g., "apply", "destroy", "import")
    pub operation: String,
    /// Who acquired the lock (username@hostname)
    pub who: String,
    /// Tool version that took the lock
    #[serde(default)]
    pub version: String,
    /// When the lock was created
    pub created: DateTime<Utc>,
    /// When the lock expires
    pub expires: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_timeout(operation, DEFAULT_LOCK_TIMEOUT_SECS)
    }

    pub fn with_timeout(operation: impl Into<String>, timeout_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            who: lock_owner(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: now,
            expires: now + Duration::seconds(timeout_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires
    }

    pub fn time_remaining(&self) -> Duration {
        self.expires - Utc::now()
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}\nOperation: {}\nWho: {}\nVersion: {}\nCreated: {}",
            self.id,
            self.operation,
            self.who,
            self.version,
            self.created.to_rfc3339()
        )
    }
}

/// username@hostname
fn lock_owner() -> String {
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    format!("{}@{}", username, hostname)
}
