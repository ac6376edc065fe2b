//! Folio configuration stored under `.folio/config.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::FieldSchema;
use crate::io::store::write_atomic;

/// Folio configuration (TOML).
///
/// Edited by hand. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FolioConfig {
    /// Ordered field names asked for each project.
    pub fields: Vec<String>,

    /// Subject list, relative to the project root unless absolute.
    pub subjects_path: PathBuf,

    pub newsletter: NewsletterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NewsletterConfig {
    /// Subscription endpoint (e.g. `http://localhost:4000/subscribe`). When
    /// unset, subscriptions are only kept locally.
    pub endpoint: Option<String>,

    /// Request timeout for the endpoint in seconds.
    pub timeout_secs: u64,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
        }
    }
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            fields: FieldSchema::default().names().to_vec(),
            subjects_path: PathBuf::from(".folio/subjects.json"),
            newsletter: NewsletterConfig::default(),
        }
    }
}

impl FolioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(anyhow!("fields must be a non-empty array"));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.trim().is_empty() {
                return Err(anyhow!("fields must not contain blank names"));
            }
            if !seen.insert(field.as_str()) {
                return Err(anyhow!("duplicate field '{}'", field));
            }
        }
        if self.newsletter.timeout_secs == 0 {
            return Err(anyhow!("newsletter.timeout_secs must be > 0"));
        }
        if let Some(endpoint) = &self.newsletter.endpoint
            && endpoint.trim().is_empty()
        {
            return Err(anyhow!("newsletter.endpoint must not be blank"));
        }
        Ok(())
    }

    pub fn schema(&self) -> FieldSchema {
        FieldSchema::new(self.fields.iter().cloned())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FolioConfig::default()`.
pub fn load_config(path: &Path) -> Result<FolioConfig> {
    if !path.exists() {
        let cfg = FolioConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FolioConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FolioConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
