//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use std::path::PathBuf;

use crate::backend::StateBackend;

/// Open the backend for a state file path, or the default file
pub fn open_backend(path: Option<PathBuf>) -> Box<dyn StateBackend> {
    match path {
        Some(path) => Box::new(LocalBackend::with_path(path)),
        None => Box::new(LocalBackend::new()),
    }
}
