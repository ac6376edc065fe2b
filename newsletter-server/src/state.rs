//! Shared application state for the newsletter server.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::notify::Notifier;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Flat JSON file holding the subscriber list.
    pub storage_path: PathBuf,
    /// Serializes read-modify-write cycles on the storage file within this
    /// process. Other processes writing the same file are not coordinated.
    pub write_lock: Arc<Mutex<()>>,
    /// Owner notification, when configured.
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl AppState {
    pub fn new(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            write_lock: Arc::new(Mutex::new(())),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}
