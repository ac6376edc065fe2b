//! Flat-file subscriber storage.
//!
//! Entries are kept as raw JSON objects so hand-edited files round-trip
//! unchanged. File access runs off the async runtime.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use folio::io::store::write_json;
use serde_json::Value;
use tracing::debug;

/// Load the stored list. A missing file is an empty list; a file that is not
/// a JSON array is an error so callers never overwrite it.
pub async fn load_subscribers(path: &Path) -> Result<Vec<Value>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no subscriber file, starting empty");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Replace the stored list (pretty JSON, temp file + rename).
pub async fn save_subscribers(path: &Path, list: Vec<Value>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_json(&path, &list))
        .await
        .map_err(|err| anyhow!("subscriber write task failed: {err}"))?
}

/// Address stored in an entry, if it has one.
pub fn entry_email(entry: &Value) -> Option<&str> {
    entry.get("email").and_then(Value::as_str)
}
