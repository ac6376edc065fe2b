//! Snapshot persistence behind a key-value contract.
//!
//! The chat keeps two logical keys, one for the transcript and one for the
//! structured records. Reads of a missing key return empty; writes are
//! last-write-wins. The [`SnapshotStore`] trait lets tests substitute an
//! in-memory store for the directory-backed one.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::core::types::{CollectedRecord, Message, Snapshot};

/// Key for the chat transcript.
pub const CHAT_KEY: &str = "portfolio_chat_responses_v1";
/// Key for the structured per-project records.
pub const RECORDS_KEY: &str = "portfolio_chat_structured_v1";

/// Abstraction over snapshot persistence backends.
pub trait SnapshotStore {
    /// Last saved snapshot. Each key falls back to empty on its own when it
    /// was never saved or cannot be read.
    fn load(&self) -> Result<Snapshot>;
    /// Replace the stored snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read and parse a key. Missing file yields `T::default()`.
    pub fn read_key<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!(key, "key missing, using empty value");
            return Ok(T::default());
        }
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
    }

    pub fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        write_json(&self.key_path(key), value)
    }

    /// Like [`read_key`](Self::read_key), but an unreadable key is logged and
    /// read as empty so other keys still load.
    fn read_key_or_empty<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.read_key(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = ?err, "unreadable key, reading as empty");
                T::default()
            }
        }
    }
}

impl SnapshotStore for DirStore {
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    fn load(&self) -> Result<Snapshot> {
        let messages: Vec<Message> = self.read_key_or_empty(CHAT_KEY);
        let records: Vec<CollectedRecord> = self.read_key_or_empty(RECORDS_KEY);
        debug!(
            messages = messages.len(),
            records = records.len(),
            "snapshot loaded"
        );
        Ok(Snapshot { messages, records })
    }

    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.write_key(CHAT_KEY, &snapshot.messages)?;
        self.write_key(RECORDS_KEY, &snapshot.records)?;
        debug!(
            messages = snapshot.messages.len(),
            records = snapshot.records.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

/// In-memory store. Can be switched into a failing mode to exercise the
/// memory-only fallback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: RefCell<Snapshot>,
    saves: RefCell<u32>,
    fail_saves: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: RefCell::new(snapshot),
            ..Self::default()
        }
    }

    /// Store whose every `save` fails, as if quota were exceeded.
    pub fn failing() -> Self {
        Self {
            fail_saves: Cell::new(true),
            ..Self::default()
        }
    }

    /// Switch the failing mode on or off.
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.set(failing);
    }

    pub fn saved(&self) -> Snapshot {
        self.saved.borrow().clone()
    }

    pub fn save_count(&self) -> u32 {
        *self.saves.borrow()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.get() {
            return Err(anyhow!("memory store rejected save"));
        }
        *self.saved.borrow_mut() = snapshot.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

/// Serialize `value` to pretty-printed JSON with trailing newline, atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(value).context("serialize json")?;
    payload.push('\n');
    write_atomic(path, &payload)
}

/// Write `contents` to a sibling temp file, then rename over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Sender, Subject};

    fn sample_snapshot() -> Snapshot {
        let mut record = CollectedRecord::for_subject(&Subject::new(1, "Alpha"));
        record.fields.insert("role".to_string(), "Engineer".to_string());
        Snapshot {
            messages: vec![Message {
                id: "msg-1".to_string(),
                sender: Sender::System,
                text: "hello".to_string(),
            }],
            records: vec![record],
        }
    }

    #[test]
    fn empty_dir_loads_empty_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = DirStore::new(temp.path().join(".folio"));
        assert_eq!(store.load().expect("load"), Snapshot::default());
    }

    #[test]
    fn save_writes_one_file_per_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = DirStore::new(temp.path());
        let snapshot = sample_snapshot();
        store.save(&snapshot).expect("save");

        let records = fs::read_to_string(store.key_path(RECORDS_KEY)).expect("read records");
        assert!(records.contains("\"subjectId\": 1"));
        assert!(records.ends_with('\n'));
        assert!(store.key_path(CHAT_KEY).exists());
        assert_eq!(store.load().expect("load"), snapshot);
    }

    #[test]
    fn last_write_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = DirStore::new(temp.path());
        store.save(&sample_snapshot()).expect("save");
        store.save(&Snapshot::default()).expect("save");
        assert_eq!(store.load().expect("load"), Snapshot::default());
    }

    #[test]
    fn corrupt_key_reads_as_empty_without_dropping_the_other() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = DirStore::new(temp.path());
        let snapshot = sample_snapshot();
        store.save(&snapshot).expect("save");
        fs::write(store.key_path(RECORDS_KEY), "{corrupt").expect("write");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.messages, snapshot.messages);
        assert!(loaded.records.is_empty());
        assert!(store.read_key::<Vec<CollectedRecord>>(RECORDS_KEY).is_err());
    }

    #[test]
    fn failing_memory_store_rejects_saves() {
        let store = MemoryStore::failing();
        assert!(store.save(&sample_snapshot()).is_err());
        assert_eq!(store.save_count(), 0);
    }
}
