//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Stored state of one managed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub resource_type: String,
    pub id: String,
    /// Last state read back from the system
    pub state: Value,
}

impl StateEntry {
    /// `type.id`, the address used for targeting.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.id)
    }
}

/// One attribute that differs between live and desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    /// Rendered live value, `None` when unset
    pub from: Option<String>,
    /// Rendered desired value, `None` when unset
    pub to: Option<String>,
    /// This change alone forces delete and re-create
    pub forces_replace: bool,
}

/// Outcome of comparing a live resource with its desired definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Change {
    #[default]
    NoChange,
    /// Converge in place
    Update(Vec<FieldChange>),
    /// Delete, then create
    Replace(Vec<FieldChange>),
}

/// Collects field differences and decides between update and replace.
///
/// ```
/// use declarative::ChangeSet;
///
/// let change = ChangeSet::new()
///     .update("shell", Some("/bin/sh"), Some("/bin/bash"))
///     .update("uid", Some(&1000), Some(&1000))
///     .finish();
/// assert_eq!(change.fields().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ChangeSet {
    fields: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push<T: PartialEq + fmt::Display + ?Sized>(
        mut self,
        field: &str,
        from: Option<&T>,
        to: Option<&T>,
        forces_replace: bool,
    ) -> Self {
        if from != to {
            self.fields.push(FieldChange {
                field: field.to_string(),
                from: from.map(ToString::to_string),
                to: to.map(ToString::to_string),
                forces_replace,
            });
        }
        self
    }

    /// Record a field that can be changed in place.
    pub fn update<T: PartialEq + fmt::Display + ?Sized>(
        self,
        field: &str,
        from: Option<&T>,
        to: Option<&T>,
    ) -> Self {
        self.push(field, from, to, false)
    }

    /// Record a field whose change requires a new resource.
    pub fn replace<T: PartialEq + fmt::Display + ?Sized>(
        self,
        field: &str,
        from: Option<&T>,
        to: Option<&T>,
    ) -> Self {
        self.push(field, from, to, true)
    }

    pub fn finish(self) -> Change {
        if self.fields.is_empty() {
            Change::NoChange
        } else if self.fields.iter().any(|f| f.forces_replace) {
            Change::Replace(self.fields)
        } else {
            Change::Update(self.fields)
        }
    }
}

impl Change {
    pub fn fields(&self) -> &[FieldChange] {
        match self {
            Change::NoChange => &[],
            Change::Update(fields) | Change::Replace(fields) => fields,
        }
    }
}

/// What the plan will do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoChange,
    Create,
    Update,
    Replace,
    Delete,
}

impl Action {
    /// Plan symbol: `+`, `~`, `±`, `-`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::NoChange => "○",
            Action::Create => "+",
            Action::Update => "~",
            Action::Replace => "±",
            Action::Delete => "-",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Action::NoChange)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::NoChange => "no change",
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
        };
        f.write_str(text)
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified in place
    Modified,
    /// Resource was deleted and created again
    Replaced,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

/// Result of one plan step, with the state to store afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub resource_type: String,
    pub id: String,
    pub action: Action,
    pub result: ApplyResult,
    /// State read back after the step. `None` after a delete, or when the
    /// step failed and the prior state should be kept.
    pub new_state: Option<Value>,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.replaced += other.replaced;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs within a stage
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changeset_update_vs_replace() {
        let change = ChangeSet::new()
            .update("state", Some("down"), Some("up"))
            .finish();
        assert!(matches!(change, Change::Update(ref f) if f.len() == 1));

        let change = ChangeSet::new()
            .update("state", Some("down"), Some("up"))
            .replace("vid", Some(&100u16), Some(&200u16))
            .finish();
        match change {
            Change::Replace(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1].from.as_deref(), Some("100"));
                assert_eq!(fields[1].to.as_deref(), Some("200"));
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn test_changeset_equal_fields_are_dropped() {
        let change = ChangeSet::new()
            .update::<str>("shell", None, None)
            .replace("name", Some("a"), Some("a"))
            .finish();
        assert_eq!(change, Change::NoChange);
        assert!(change.fields().is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Replaced);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });
        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_entry_address() {
        let entry = StateEntry {
            resource_type: "user".into(),
            id: "alice".into(),
            state: Value::Null,
        };
        assert_eq!(entry.address(), "user.alice");
    }
}
