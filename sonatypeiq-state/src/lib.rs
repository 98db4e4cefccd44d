//! sonatypeiq state management
//!
//! Records which IQ Server objects a manifest manages and their last known
//! attributes, with locking so two runs never write the same state.
//!
//! - **StateFile**: every tracked object, with serial and lineage
//! - **StateBackend**: storage trait; `LocalBackend` keeps a JSON file
//! - **LockInfo**: who holds the lock and until when
//!
//! ```ignore
//! use sonatypeiq_state::{open_backend, StateFile};
//!
//! let backend = open_backend(None);
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... apply changes, state.record(&new_state) ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, open_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
