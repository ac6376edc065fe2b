//! Subject list loading with schema validation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::types::Subject;

/// JSON Schema for `subjects.json`.
pub const SUBJECTS_SCHEMA: &str = include_str!("../../schemas/subjects.schema.json");

/// Load and validate the subject list. A missing file is an empty list.
pub fn load_subjects(path: &Path) -> Result<Vec<Subject>> {
    if !path.exists() {
        debug!(path = %path.display(), "subjects file missing");
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read subjects {}", path.display()))?;
    parse_subjects(&contents).with_context(|| format!("load subjects {}", path.display()))
}

/// Parse subjects from JSON text, rejecting entries without an integer `id`
/// or a non-empty `title`, and lists that repeat an `id`.
pub fn parse_subjects(raw: &str) -> Result<Vec<Subject>> {
    let value: Value = serde_json::from_str(raw).context("parse subjects json")?;
    validate_schema(&value)?;
    let subjects: Vec<Subject> =
        serde_json::from_value(value).context("deserialize subjects")?;
    let mut seen = HashSet::new();
    if let Some(dup) = subjects.iter().find(|subject| !seen.insert(subject.id)) {
        return Err(anyhow!("duplicate subject id {} ({:?})", dup.id, dup.title));
    }
    debug!(count = subjects.len(), "subjects loaded");
    Ok(subjects)
}

fn validate_schema(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SUBJECTS_SCHEMA).context("parse subjects schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages: Vec<String> = compiled
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "subjects schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
