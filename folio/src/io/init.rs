//! Initialization helpers for `.folio/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::config::{FolioConfig, write_config};
use super::subjects::SUBJECTS_SCHEMA;

/// Canonical paths within `.folio/` for a project root.
#[derive(Debug, Clone)]
pub struct FolioPaths {
    pub root: PathBuf,
    pub folio_dir: PathBuf,
    pub config_path: PathBuf,
    pub subjects_schema_path: PathBuf,
}

impl FolioPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let folio_dir = root.join(".folio");
        Self {
            root: root.clone(),
            folio_dir: folio_dir.clone(),
            config_path: folio_dir.join("config.toml"),
            subjects_schema_path: folio_dir.join("subjects.schema.json"),
        }
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Overwrite existing files.
    pub force: bool,
}

/// Create `.folio/` with a default config, an empty subject list, and the
/// subject schema. Existing files are kept unless `force` is set.
pub fn init_folio(root: &Path, options: &InitOptions) -> Result<FolioPaths> {
    let paths = FolioPaths::new(root);
    fs::create_dir_all(&paths.folio_dir)
        .with_context(|| format!("create {}", paths.folio_dir.display()))?;

    let cfg = FolioConfig::default();
    if options.force || !paths.config_path.exists() {
        write_config(&paths.config_path, &cfg)?;
    }
    write_if_missing_or_force(&paths.subjects_schema_path, SUBJECTS_SCHEMA, options.force)?;
    write_if_missing_or_force(&paths.resolve(&cfg.subjects_path), "[]\n", options.force)?;

    info!(dir = %paths.folio_dir.display(), "initialized folio");
    Ok(paths)
}

fn write_if_missing_or_force(path: &Path, contents: &str, force: bool) -> Result<()> {
    if !force && path.exists() {
        return Ok(());
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
