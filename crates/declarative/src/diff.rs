//! Diff computation for planned resources

use crate::planner::{ExecutionPlan, PlanStep};
use crate::types::{Action, FieldChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A planned change to one resource, detached from the resource itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    pub action: Action,
    /// Field differences (empty for creates and deletes)
    pub fields: Vec<FieldChange>,
}

impl ResourceDiff {
    /// Create a diff from a plan step, returning None if no changes needed
    pub fn from_step(step: &PlanStep) -> Option<Self> {
        if !step.action.is_change() {
            return None;
        }
        Some(Self {
            resource_id: step.resource.id(),
            resource_type: step.resource.resource_type().to_string(),
            description: step.resource.description(),
            action: step.action,
            fields: step.changes.clone(),
        })
    }

    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.resource_id)
    }
}

/// Compute diffs for every changing step of a plan
pub fn compute_diffs(plan: &ExecutionPlan) -> Vec<ResourceDiff> {
    plan.steps.iter().filter_map(ResourceDiff::from_step).collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify in place
    pub modifications: usize,
    /// Number of resources to delete and re-create
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::Replace => summary.replacements += 1,
                Action::NoChange => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type, in type order
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<&str, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.resource_type.as_str()).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(resource_type: &str, id: &str, action: Action) -> ResourceDiff {
        ResourceDiff {
            resource_id: id.into(),
            resource_type: resource_type.into(),
            description: String::new(),
            action,
            fields: Vec::new(),
        }
    }

    #[test]
    fn test_summary_by_action() {
        let diffs = vec![
            diff("user", "alice", Action::Create),
            diff("user", "bob", Action::Update),
            diff("interface", "br0", Action::Replace),
            diff("group", "old", Action::Delete),
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(
            summary,
            DiffSummary {
                additions: 1,
                removals: 1,
                modifications: 1,
                replacements: 1,
            }
        );
        assert_eq!(summary.total(), 4);
        assert!(!DiffSummary::default().has_changes());
    }

    #[test]
    fn test_group_by_type_is_sorted() {
        let diffs = vec![
            diff("user", "alice", Action::Create),
            diff("group", "devs", Action::Create),
            diff("user", "bob", Action::Delete),
        ];
        let groups = group_by_type(&diffs);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["group", "user"]);
        assert_eq!(groups["user"].len(), 2);
        assert_eq!(groups["user"][1].address(), "user.bob");
    }
}
