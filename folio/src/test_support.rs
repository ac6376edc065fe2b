//! Test-only helpers for building subjects and scratch projects.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::Subject;
use crate::io::config::{FolioConfig, load_config, write_config};
use crate::io::init::{FolioPaths, InitOptions, init_folio};
use crate::io::store::DirStore;

/// Subjects with ids `1..=n` in the given title order.
pub fn subjects(titles: &[&str]) -> Vec<Subject> {
    titles
        .iter()
        .enumerate()
        .map(|(idx, title)| Subject::new(idx as i64 + 1, *title))
        .collect()
}

/// Initialized `.folio/` project in a temp directory.
pub struct TestProject {
    dir: TempDir,
    pub paths: FolioPaths,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let paths = init_folio(dir.path(), &InitOptions::default())?;
        Ok(Self { dir, paths })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> DirStore {
        DirStore::new(&self.paths.folio_dir)
    }

    pub fn config(&self) -> Result<FolioConfig> {
        load_config(&self.paths.config_path)
    }

    pub fn write_config(&self, cfg: &FolioConfig) -> Result<()> {
        write_config(&self.paths.config_path, cfg)
    }

    pub fn write_subjects(&self, subjects: &[Subject]) -> Result<()> {
        let cfg = self.config()?;
        let path = self.paths.resolve(&cfg.subjects_path);
        let payload = serde_json::to_string_pretty(subjects).context("serialize subjects")?;
        fs::write(&path, payload).with_context(|| format!("write {}", path.display()))
    }
}
