//! Orchestration for a persisted chat session.
//!
//! Wraps the pure [`GuidedWalkEngine`] and hands a fresh snapshot to the
//! [`SnapshotStore`] after every state-changing operation. Store failures never
//! reach the caller: they are logged and the session continues memory-only.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::engine::{GuidedWalkEngine, ReviewError, Turn};
use crate::core::types::{CollectedRecord, FieldSchema, Message, Snapshot, Subject, WalkState};
use crate::io::store::{SnapshotStore, write_json};

/// Default file name for `folio export`.
pub const DEFAULT_EXPORT_FILE: &str = "portfolio-chat-structured.json";

pub struct ChatSession<S: SnapshotStore> {
    engine: GuidedWalkEngine,
    store: S,
    memory_only: bool,
}

impl<S: SnapshotStore> ChatSession<S> {
    /// Restore the last snapshot from `store`. An unreadable store starts an
    /// empty session that will still try to save.
    pub fn open(store: S, schema: FieldSchema, subjects: Vec<Subject>) -> Self {
        let snapshot = match store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = ?err, "failed to load chat snapshot, starting empty");
                Snapshot::default()
            }
        };
        debug!(
            messages = snapshot.messages.len(),
            records = snapshot.records.len(),
            "chat session opened"
        );
        Self {
            engine: GuidedWalkEngine::restore(schema, subjects, snapshot),
            store,
            memory_only: false,
        }
    }

    pub fn engine(&self) -> &GuidedWalkEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> WalkState {
        self.engine.state()
    }

    pub fn records(&self) -> &[CollectedRecord] {
        self.engine.records()
    }

    pub fn messages(&self) -> &[Message] {
        self.engine.messages()
    }

    /// True while the most recent save failed; data is then only kept for this
    /// session until a later save succeeds.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    pub fn greet(&mut self) -> Option<Message> {
        let greeting = self.engine.greet()?;
        self.persist();
        Some(greeting)
    }

    /// Start a walk over the engine's current catalog.
    pub fn start_walk(&mut self) -> WalkState {
        let subjects = self.engine.subjects().to_vec();
        let state = self.engine.start(subjects);
        self.persist();
        state
    }

    pub fn send(&mut self, text: &str) -> Turn {
        let before = self.engine.messages().len();
        let turn = self.engine.submit_reply(text);
        if self.engine.messages().len() != before {
            self.persist();
        }
        turn
    }

    pub fn edit(
        &mut self,
        subject_id: i64,
        field: &str,
        value: Option<&str>,
    ) -> Result<(), ReviewError> {
        self.engine.edit_record(subject_id, field, value)?;
        self.persist();
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.export_snapshot()
    }

    /// Write `{messages, records}` as pretty JSON to `path`.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        write_json(path, &self.snapshot())
    }

    fn persist(&mut self) {
        match self.store.save(&self.engine.export_snapshot()) {
            Ok(()) => {
                if self.memory_only {
                    info!("chat snapshot saved again, leaving memory-only mode");
                }
                self.memory_only = false;
            }
            Err(err) => {
                if !self.memory_only {
                    warn!(error = ?err, "failed to save chat snapshot, keeping data in memory only");
                }
                self.memory_only = true;
            }
        }
    }
}
