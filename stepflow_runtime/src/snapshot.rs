//! JSON snapshots of the workflow store.
//!
//! The snapshot file is the persistence collaborator for the CLI: the
//! whole store is loaded before a command runs and written back after a
//! mutating command. Workflow graphs are restored through
//! [`DependencyGraph::load`], so edges are not re-admitted one by one.
//!
//! Overlapping invocations coordinate through [`StoreLock`], an advisory
//! lock on a sibling `.lock` file held from load until save.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

use serde::{Deserialize, Serialize};
use stepflow_core::{Dependency, DependencyGraph, Step, WorkflowId};

use crate::error::{Result, ServiceError};
use crate::store::{WorkflowRecord, WorkflowStore};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Export format for the whole store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: String,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub workflows: Vec<WorkflowSnapshot>,
}

/// One workflow as stored on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub workflow_id: WorkflowId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl WorkflowSnapshot {
    fn capture(record: &WorkflowRecord) -> Self {
        Self {
            workflow_id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            steps: record.graph.steps().cloned().collect(),
            dependencies: record.graph.dependencies(),
        }
    }

    fn restore(self) -> Result<WorkflowRecord> {
        let graph = DependencyGraph::load(self.steps, self.dependencies)?;
        if !graph.is_acyclic() {
            tracing::warn!(workflow = %self.workflow_id, "restored workflow contains dependency cycles");
        }
        Ok(WorkflowRecord::with_graph(self.workflow_id, self.name, graph).with_description(self.description))
    }
}

/// Captures every workflow in the store, sorted by identifier.
pub fn export_store(store: &WorkflowStore) -> StoreSnapshot {
    let workflows = store
        .ids()
        .iter()
        .filter_map(|id| store.with_workflow(id, WorkflowSnapshot::capture).ok())
        .collect();

    StoreSnapshot {
        version: SNAPSHOT_VERSION.to_string(),
        exported_at: chrono::Utc::now(),
        workflows,
    }
}

/// Rebuilds a store from a snapshot.
pub fn import_store(snapshot: StoreSnapshot) -> Result<WorkflowStore> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(ServiceError::UnsupportedSnapshot(snapshot.version));
    }

    let store = WorkflowStore::new();
    for workflow in snapshot.workflows {
        store.insert_record(workflow.restore()?)?;
    }

    Ok(store)
}

/// Advisory lock on a snapshot file, released on drop.
///
/// The lock lives on `<store>.lock` rather than the snapshot itself,
/// because saving replaces the snapshot file.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Blocks until no other holder has the lock, then takes it exclusively.
    pub fn exclusive(store_path: &Path) -> Result<Self> {
        let lock = Self::open(store_path)?;
        FileExt::lock_exclusive(&lock.file)?;
        tracing::debug!(path = %lock.path.display(), "exclusive store lock acquired");
        Ok(lock)
    }

    /// Blocks until no exclusive holder remains, then takes a shared lock.
    pub fn shared(store_path: &Path) -> Result<Self> {
        let lock = Self::open(store_path)?;
        FileExt::lock_shared(&lock.file)?;
        tracing::debug!(path = %lock.path.display(), "shared store lock acquired");
        Ok(lock)
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(store_path: &Path) -> Result<Self> {
        let path = lock_path(store_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(Self { file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    store_path.with_file_name(name)
}

/// Writes the store to a JSON file.
///
/// The snapshot is written to a uniquely named file in the destination
/// directory and then renamed over it, so readers never see a partial
/// snapshot and concurrent writers never share a temporary file.
pub fn save_to_file(store: &WorkflowStore, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&export_store(store))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;

    tracing::debug!(path = %path.display(), workflows = store.len(), "snapshot saved");
    Ok(())
}

/// Loads a store from a JSON file. A missing file yields an empty store.
pub fn load_from_file(path: &Path) -> Result<WorkflowStore> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(WorkflowStore::new());
        }
        Err(err) => return Err(err.into()),
    };

    let snapshot: StoreSnapshot = serde_json::from_str(&json)?;
    import_store(snapshot)
}
