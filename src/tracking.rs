//! Persistent usage tracking.
//!
//! The catalog itself is rebuilt on every start; only execution counts and
//! the recent-command history survive, in a small JSON file
//! (~/.quicklaunch/tracking.json by default).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::catalog::{CatalogIndex, CommandId};
use crate::config::TrackingConfig;

/// Usage counts and recent history with atomic persistence.
#[derive(Debug, Clone)]
pub struct UsageStore {
    counts: HashMap<CommandId, u64>,
    /// Newest first
    recent: Vec<CommandId>,
    file_path: PathBuf,
    /// Whether there are unsaved changes
    dirty: bool,
}

/// On-disk format (owned, for deserialization)
#[derive(Debug, Default, Serialize, Deserialize)]
struct UsageData {
    #[serde(default)]
    counts: HashMap<CommandId, u64>,
    #[serde(default)]
    recent: Vec<CommandId>,
}

/// On-disk format (borrowed, for serialization without cloning)
#[derive(Serialize)]
struct UsageDataRef<'a> {
    counts: &'a HashMap<CommandId, u64>,
    recent: &'a [CommandId],
}

impl UsageStore {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            counts: HashMap::new(),
            recent: Vec::new(),
            file_path: path.into(),
            dirty: false,
        }
    }

    pub fn with_config(config: &TrackingConfig) -> Self {
        Self::with_path(config.resolved_path())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn counts(&self) -> &HashMap<CommandId, u64> {
        &self.counts
    }

    pub fn recent(&self) -> &[CommandId] {
        &self.recent
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Load from disk. A missing file leaves the store empty.
    #[instrument(name = "usage_load", skip(self), fields(path = %self.file_path.display()))]
    pub fn load(&mut self) -> Result<()> {
        if !self.file_path.exists() {
            info!("Usage file not found, starting fresh");
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read usage file: {}", self.file_path.display()))?;
        let data: UsageData =
            serde_json::from_str(&content).context("Failed to parse usage JSON")?;

        self.counts = data.counts;
        self.recent = data.recent;
        self.dirty = false;

        info!(entry_count = self.counts.len(), "Loaded usage data");
        Ok(())
    }

    /// Save to disk (temp file + rename). Does nothing when clean.
    #[instrument(name = "usage_save", skip(self), fields(path = %self.file_path.display()))]
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("No usage changes to save");
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string(&UsageDataRef {
            counts: &self.counts,
            recent: &self.recent,
        })
        .context("Failed to serialize usage data")?;

        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp usage file: {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.file_path).with_context(|| {
            format!("Failed to rename temp file to {}", self.file_path.display())
        })?;

        info!(
            entry_count = self.counts.len(),
            bytes = json.len(),
            "Saved usage data (atomic)"
        );
        self.dirty = false;
        Ok(())
    }

    /// Seed an index with the stored counts and history.
    pub fn apply_to(&self, index: &mut CatalogIndex) {
        index.load_tracking(self.counts.clone());
        index.restore_recent(self.recent.clone());
    }

    /// Take over the index's current counts and history, marking the store
    /// dirty when anything changed.
    pub fn capture(&mut self, index: &CatalogIndex) {
        let counts = index.tracking();
        let recent = index.recent();
        if counts != self.counts || recent != self.recent {
            self.counts = counts;
            self.recent = recent;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{fingerprint, RawDescriptor};

    fn index_with(names: &[&str]) -> CatalogIndex {
        let mut index = CatalogIndex::default();
        for name in names {
            index
                .register(RawDescriptor::new(*name).action(|| -> anyhow::Result<bool> { Ok(true) }))
                .unwrap();
        }
        index
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tracking.json");
        let line = fingerprint("Line", None, None);
        let arc = fingerprint("Arc", None, None);

        {
            let mut index = index_with(&["Line", "Arc"]);
            index.execute(&line);
            index.execute(&line);
            index.execute(&arc);

            let mut store = UsageStore::with_path(&path);
            store.capture(&index);
            assert!(store.is_dirty());
            store.save().unwrap();
            assert!(!store.is_dirty());
        }

        let mut store = UsageStore::with_path(&path);
        store.load().unwrap();
        assert_eq!(store.counts().get(&line), Some(&2));
        assert_eq!(store.counts().get(&arc), Some(&1));
        assert_eq!(store.recent(), &[arc, line]);

        let mut fresh = index_with(&["Line", "Arc"]);
        store.apply_to(&mut fresh);
        assert_eq!(fresh.get_by_id(&line).unwrap().usage_count, 2);
        assert_eq!(fresh.recent(), vec![arc, line]);
    }

    #[test]
    fn test_load_missing_file() {
        let mut store = UsageStore::with_path("/nonexistent/quicklaunch/tracking.json");
        assert!(store.load().is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, "not valid json").unwrap();

        let mut store = UsageStore::with_path(&path);
        assert!(store.load().is_err());
    }

    #[test]
    fn test_save_skipped_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");

        let mut store = UsageStore::with_path(&path);
        store.capture(&index_with(&["Unused"]));
        assert!(!store.is_dirty());
        store.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_file_format_uses_hex_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        let id = fingerprint("Line", None, None);

        let mut index = index_with(&["Line"]);
        index.execute(&id);
        let mut store = UsageStore::with_path(&path);
        store.capture(&index);
        store.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(&format!("\"{}\":1", id)));
    }
}
