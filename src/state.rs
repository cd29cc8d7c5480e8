use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{ExecuteReport, StateEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Everything linuxhost manages on one host, as last read back
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HostState {
    /// Target the entries belong to (`user@host` or `local`)
    #[serde(default)]
    pub host: Option<String>,

    /// Managed resources in first-managed order
    #[serde(default)]
    pub entries: Vec<StateEntry>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            host: None,
            entries: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// A state file on disk together with where it lives
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    pub state: HostState,
}

// ============================================================================
// Load / Save
// ============================================================================

impl StateFile {
    /// Load state from `path`, or start empty if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                state: HostState::default(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: HostState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded {} state entries from {}",
            state.entries.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    /// Stamp `last_updated` and write the file, creating its directory
    pub fn save(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.state.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self.state).context("Failed to serialize state")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// Entry Helpers
// ============================================================================

impl HostState {
    /// Refuse to mix resources of two hosts in one state file.
    ///
    /// An empty state adopts `target`.
    pub fn bind_host(&mut self, target: &str) -> Result<()> {
        match &self.host {
            Some(host) if host != target && !self.entries.is_empty() => bail!(
                "State file belongs to '{host}' but the manifest targets '{target}'; \
                 use a separate state directory per host"
            ),
            _ => {
                self.host = Some(target.to_string());
                Ok(())
            }
        }
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&StateEntry> {
        self.entries
            .iter()
            .find(|e| e.resource_type == resource_type && e.id == id)
    }

    /// Insert or replace the entry for `resource_type.id`
    pub fn upsert(&mut self, resource_type: &str, id: &str, state: Value) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.resource_type == resource_type && e.id == id)
        {
            Some(entry) => entry.state = state,
            None => self.entries.push(StateEntry {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
                state,
            }),
        }
    }

    pub fn remove(&mut self, resource_type: &str, id: &str) -> Option<StateEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.resource_type == resource_type && e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Fold an execution report into the stored entries.
    ///
    /// Successful steps store what was read back; deletions and vanished
    /// resources drop their entry. Failed and skipped steps keep whatever
    /// was stored before.
    pub fn record(&mut self, report: &ExecuteReport) {
        for entry in &report.vanished {
            log::info!("{} no longer exists, dropping it from state", entry.address());
            self.remove(&entry.resource_type, &entry.id);
        }
        if !report.applied {
            return;
        }
        for outcome in &report.outcomes {
            if !outcome.result.is_success() {
                continue;
            }
            match &outcome.new_state {
                Some(state) => self.upsert(&outcome.resource_type, &outcome.id, state.clone()),
                None if outcome.result == declarative::ApplyResult::Removed => {
                    self.remove(&outcome.resource_type, &outcome.id);
                }
                None => {}
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
