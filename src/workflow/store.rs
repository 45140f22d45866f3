//! Workflow run persistence

use std::path::{Path, PathBuf};

use super::run::WorkflowRun;
use crate::{Error, Result};

/// Manage workflow run files under `<base_dir>/runs/<id>.yaml`
pub struct StateStore {
    base_dir: PathBuf,
}

impl StateStore {
    /// Create a new state store
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn runs_dir(&self) -> PathBuf {
        self.base_dir.join("runs")
    }

    /// Path of a run's state file
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.runs_dir().join(format!("{}.yaml", id))
    }

    /// Save run state
    pub fn save(&self, run: &WorkflowRun) -> Result<PathBuf> {
        let path = self.path_for(&run.id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(run)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Load run state by ID
    pub fn load(&self, id: &str) -> Result<WorkflowRun> {
        load_file(&self.path_for(id))
    }

    /// List all runs, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<WorkflowRun>> {
        let dir = self.runs_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "yaml").unwrap_or(false) {
                match load_file(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
                }
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    /// Most recently started run for a builder
    pub fn find_latest(&self, builder_id: &str) -> Result<Option<WorkflowRun>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|run| run.builder_id == builder_id))
    }

    /// Remove all but the newest `keep` runs
    pub fn cleanup(&self, keep: usize) -> Result<usize> {
        let mut removed = 0;
        for run in self.list()?.into_iter().skip(keep) {
            if std::fs::remove_file(self.path_for(&run.id)).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn load_file(path: &Path) -> Result<WorkflowRun> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::State(format!("Failed to read run state {:?}: {}", path, e)))?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::State(format!("Failed to parse run state {:?}: {}", path, e)))
}
