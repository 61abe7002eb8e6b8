//! Checkpoint persistence for batch screening
//!
//! A checkpoint holds the manifest of a run (the requested structure ids)
//! and one entry per finished structure. Stores are written by a single
//! writer at a time; the coordinator serializes access with a mutex.

use chrono::{DateTime, Utc};
use cryptic_core::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::coordinator::Outcome;

/// Persisted outcome of one structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub structure_id: String,
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

impl CheckpointEntry {
    pub fn new(structure_id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            structure_id: structure_id.into(),
            outcome,
            recorded_at: Utc::now(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.outcome, Outcome::Done(_))
    }
}

/// Key-value store of structure id → outcome, plus the run manifest.
///
/// Lifecycle: opened before a batch starts, flushed after every checkpoint
/// interval, closed when the batch ends or is cancelled.
pub trait CheckpointStore: Send {
    /// Structure ids recorded for the run, if any.
    fn manifest(&self) -> Option<Vec<String>>;

    fn record_manifest(&mut self, structure_ids: &[String]) -> Result<()>;

    fn get(&self, structure_id: &str) -> Option<CheckpointEntry>;

    /// Insert or replace the entry for `entry.structure_id`.
    fn put(&mut self, entry: CheckpointEntry) -> Result<()>;

    /// Ids whose outcome is `Done`, sorted.
    fn list_completed(&self) -> Vec<String>;

    fn flush(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// Serializable checkpoint contents shared by both stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CheckpointState {
    #[serde(default)]
    manifest: Option<Vec<String>>,
    #[serde(default)]
    entries: BTreeMap<String, CheckpointEntry>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl CheckpointState {
    fn completed(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.is_done())
            .map(|e| e.structure_id.clone())
            .collect()
    }

    fn put(&mut self, entry: CheckpointEntry) {
        self.updated_at = Some(entry.recorded_at);
        self.entries.insert(entry.structure_id.clone(), entry);
    }
}

/// In-process checkpoint store.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: CheckpointState,
    flushes: usize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `flush` calls so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn manifest(&self) -> Option<Vec<String>> {
        self.state.manifest.clone()
    }

    fn record_manifest(&mut self, structure_ids: &[String]) -> Result<()> {
        self.state.manifest = Some(structure_ids.to_vec());
        Ok(())
    }

    fn get(&self, structure_id: &str) -> Option<CheckpointEntry> {
        self.state.entries.get(structure_id).cloned()
    }

    fn put(&mut self, entry: CheckpointEntry) -> Result<()> {
        self.state.put(entry);
        Ok(())
    }

    fn list_completed(&self) -> Vec<String> {
        self.state.completed()
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Whole-file JSON checkpoint.
///
/// `put` only updates memory; `flush` writes the full state to a sibling
/// temp file and renames it over the checkpoint, so a crash mid-write
/// leaves the previous checkpoint intact.
#[derive(Debug)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
    state: CheckpointState,
    dirty: bool,
}

impl JsonFileCheckpointStore {
    /// Open an existing checkpoint, or start an empty one at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let state: CheckpointState = serde_json::from_str(&content)?;
            info!(
                "Opened checkpoint {} ({} entries, {} done)",
                path.display(),
                state.entries.len(),
                state.completed().len()
            );
            state
        } else {
            debug!("Starting new checkpoint at {}", path.display());
            CheckpointState::default()
        };
        Ok(Self {
            path,
            state,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn manifest(&self) -> Option<Vec<String>> {
        self.state.manifest.clone()
    }

    fn record_manifest(&mut self, structure_ids: &[String]) -> Result<()> {
        self.state.manifest = Some(structure_ids.to_vec());
        self.dirty = true;
        self.flush()
    }

    fn get(&self, structure_id: &str) -> Option<CheckpointEntry> {
        self.state.entries.get(structure_id).cloned()
    }

    fn put(&mut self, entry: CheckpointEntry) -> Result<()> {
        self.state.put(entry);
        self.dirty = true;
        Ok(())
    }

    fn list_completed(&self) -> Vec<String> {
        self.state.completed()
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(&self.state)?)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        debug!(
            "Checkpoint written to {} ({} entries)",
            self.path.display(),
            self.state.entries.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::coordinator::{StructureFailure, StructureStage};

    fn failed(id: &str) -> CheckpointEntry {
        CheckpointEntry::new(
            id,
            Outcome::Failed(StructureFailure {
                stage: StructureStage::Pending,
                cause: "detector crashed".into(),
            }),
        )
    }

    #[test]
    fn test_memory_store_put_replaces() {
        let mut store = MemoryCheckpointStore::new();
        store.put(failed("A")).unwrap();
        store.put(failed("A")).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.list_completed().is_empty());
        assert!(store.get("A").is_some());
        assert!(store.get("B").is_none());
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.ckpt.json");

        {
            let mut store = JsonFileCheckpointStore::open(&path).unwrap();
            store.record_manifest(&["A".to_string(), "B".to_string()]).unwrap();
            store.put(failed("B")).unwrap();
            store.close().unwrap();
        }

        let store = JsonFileCheckpointStore::open(&path).unwrap();
        assert_eq!(store.manifest().unwrap(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(store.get("B").unwrap().outcome, failed("B").outcome);
        assert!(store.get("A").is_none());
        assert!(!dir.path().join("screen.ckpt.json.tmp").exists());
    }

    #[test]
    fn test_unflushed_puts_not_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.json");
        let mut store = JsonFileCheckpointStore::open(&path).unwrap();
        store.put(failed("A")).unwrap();
        assert!(!path.exists());
        store.flush().unwrap();
        assert!(path.exists());
    }
}
