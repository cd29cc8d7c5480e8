//! Execution planner - decides what happens to every resource

use crate::resource::{BoxedResource, Resource};
use crate::types::{Action, Change, FieldChange, StateEntry};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;

/// One resource and what the plan will do with it.
#[derive(Debug)]
pub struct PlanStep {
    pub action: Action,
    pub resource: BoxedResource,
    /// Live state found during planning (absent for creates)
    pub prior: Option<Value>,
    pub changes: Vec<FieldChange>,
}

impl PlanStep {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource.resource_type(), self.resource.id())
    }
}

/// Planned steps plus stored entries whose resource no longer exists.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    /// In state and gone from the system; dropped without any command
    pub vanished: Vec<StateEntry>,
}

fn find_entry<'a>(state: &'a [StateEntry], resource: &dyn Resource) -> Option<&'a StateEntry> {
    let id = resource.id();
    state
        .iter()
        .find(|e| e.resource_type == resource.resource_type() && e.id == id)
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare desired resources with stored state and the live system.
    ///
    /// Stored entries are refreshed with [`Resource::read`] first. Entries
    /// with no desired resource are turned back into resources with
    /// `rehydrate` and planned for deletion.
    pub fn build<F>(desired: Vec<BoxedResource>, state: &[StateEntry], rehydrate: F) -> Result<Self>
    where
        F: Fn(&StateEntry) -> Result<BoxedResource>,
    {
        let mut plan = Self::new();
        let mut claimed = HashSet::new();

        for resource in desired {
            let entry = find_entry(state, resource.as_ref());
            let live = match entry {
                Some(entry) => {
                    claimed.insert(entry.address());
                    resource
                        .read(&entry.state)
                        .with_context(|| format!("Failed to read {}", entry.address()))?
                }
                None => None,
            };

            let step = match live {
                None => PlanStep {
                    action: Action::Create,
                    resource,
                    prior: None,
                    changes: Vec::new(),
                },
                Some(live) => {
                    let change = resource.compare(&live)?;
                    let (action, changes) = match change {
                        Change::NoChange => (Action::NoChange, Vec::new()),
                        Change::Update(fields) => (Action::Update, fields),
                        Change::Replace(fields) => (Action::Replace, fields),
                    };
                    PlanStep {
                        action,
                        resource,
                        prior: Some(live),
                        changes,
                    }
                }
            };
            plan.steps.push(step);
        }

        for entry in state {
            if claimed.contains(&entry.address()) {
                continue;
            }
            let resource = rehydrate(entry)?;
            match resource
                .read(&entry.state)
                .with_context(|| format!("Failed to read {}", entry.address()))?
            {
                Some(live) => plan.steps.push(PlanStep {
                    action: Action::Delete,
                    resource,
                    prior: Some(live),
                    changes: Vec::new(),
                }),
                None => plan.vanished.push(entry.clone()),
            }
        }

        Ok(plan)
    }

    /// Plan the deletion of every stored resource.
    pub fn destroy<F>(state: &[StateEntry], rehydrate: F) -> Result<Self>
    where
        F: Fn(&StateEntry) -> Result<BoxedResource>,
    {
        Self::build(Vec::new(), state, rehydrate)
    }

    /// Filter plan to only include steps matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            steps: self
                .steps
                .into_iter()
                .filter(|s| predicate(s.resource.as_ref()))
                .collect(),
            vanished: self.vanished,
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.id"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, id) = parse_target(t);
                self.filter(|r| matches_filter(r, &resource_type, id.as_deref()))
            }
        }
    }

    /// Steps that change something.
    pub fn changes(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| s.action.is_change())
    }

    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.steps.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parse a target string like "type.id" into (type, id)
///
/// Only the first dot separates; ids may contain dots (`eth0.100`).
pub fn parse_target(target: &str) -> (String, Option<String>) {
    match target.split_once('.') {
        Some((resource_type, id)) => (resource_type.to_string(), Some(id.to_string())),
        None => (target.to_string(), None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: &str, id: Option<&str>) -> bool {
    if resource.resource_type() != resource_type {
        return false;
    }
    match id {
        Some(id) => resource.id() == id,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeSet;
    use serde_json::json;

    /// A resource whose live state is scripted by the test.
    #[derive(Debug)]
    struct Fake {
        kind: &'static str,
        id: String,
        desired: u64,
        live: Option<u64>,
        replace_on_change: bool,
    }

    impl Fake {
        fn boxed(id: &str, desired: u64, live: Option<u64>) -> BoxedResource {
            Box::new(Fake {
                kind: "fake",
                id: id.into(),
                desired,
                live,
                replace_on_change: false,
            })
        }
    }

    impl Resource for Fake {
        fn id(&self) -> String {
            self.id.clone()
        }
        fn description(&self) -> String {
            format!("Fake {}", self.id)
        }
        fn resource_type(&self) -> &'static str {
            self.kind
        }
        fn create(&self) -> Result<Value> {
            Ok(json!(self.desired))
        }
        fn read(&self, _prior: &Value) -> Result<Option<Value>> {
            Ok(self.live.map(|v| json!(v)))
        }
        fn compare(&self, live: &Value) -> Result<Change> {
            let live = live.as_u64();
            let changes = if self.replace_on_change {
                ChangeSet::new().replace("value", live.as_ref(), Some(&self.desired))
            } else {
                ChangeSet::new().update("value", live.as_ref(), Some(&self.desired))
            };
            Ok(changes.finish())
        }
        fn update(&self, _prior: &Value) -> Result<Value> {
            Ok(json!(self.desired))
        }
        fn delete(&self, _prior: &Value) -> Result<()> {
            Ok(())
        }
    }

    fn entry(id: &str, value: u64) -> StateEntry {
        StateEntry {
            resource_type: "fake".into(),
            id: id.into(),
            state: json!(value),
        }
    }

    fn actions(plan: &ExecutionPlan) -> Vec<(String, Action)> {
        plan.steps
            .iter()
            .map(|s| (s.resource.id(), s.action))
            .collect()
    }

    #[test]
    fn test_build_actions() {
        let desired = vec![
            Fake::boxed("new", 1, None),
            Fake::boxed("same", 2, Some(2)),
            Fake::boxed("drifted", 3, Some(9)),
            Fake::boxed("vanished", 4, None),
        ];
        let state = vec![entry("same", 2), entry("drifted", 3), entry("vanished", 4)];

        let plan = ExecutionPlan::build(desired, &state, |e| {
            Ok(Fake::boxed(&e.id, 0, Some(0)))
        })
        .unwrap();

        assert_eq!(
            actions(&plan),
            vec![
                ("new".to_string(), Action::Create),
                ("same".to_string(), Action::NoChange),
                ("drifted".to_string(), Action::Update),
                ("vanished".to_string(), Action::Create),
            ]
        );
        assert_eq!(plan.steps[2].changes[0].from.as_deref(), Some("9"));
        assert_eq!(plan.change_count(), 3);
    }

    #[test]
    fn test_orphans_are_deleted_or_forgotten() {
        let state = vec![entry("live-orphan", 1), entry("gone-orphan", 2)];
        let plan = ExecutionPlan::build(Vec::new(), &state, |e| {
            let live = if e.id == "live-orphan" { Some(1) } else { None };
            Ok(Fake::boxed(&e.id, 0, live))
        })
        .unwrap();

        assert_eq!(actions(&plan), vec![("live-orphan".to_string(), Action::Delete)]);
        assert_eq!(plan.vanished.len(), 1);
        assert_eq!(plan.vanished[0].id, "gone-orphan");
    }

    #[test]
    fn test_replace_action() {
        let resource: BoxedResource = Box::new(Fake {
            kind: "fake",
            id: "r".into(),
            desired: 2,
            live: Some(1),
            replace_on_change: true,
        });
        let plan =
            ExecutionPlan::build(vec![resource], &[entry("r", 1)], |_| anyhow::bail!("unused"))
                .unwrap();
        assert_eq!(plan.steps[0].action, Action::Replace);
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("user"), ("user".to_string(), None));
        assert_eq!(
            parse_target("interface.eth0.100"),
            ("interface".to_string(), Some("eth0.100".to_string()))
        );
    }

    #[test]
    fn test_filter_by_target() {
        let desired = vec![Fake::boxed("a", 1, None), Fake::boxed("b", 1, None)];
        let plan = ExecutionPlan::build(desired, &[], |_| anyhow::bail!("unused")).unwrap();

        let filtered = plan.filter_by_target(Some("fake.b"));
        assert_eq!(actions(&filtered), vec![("b".to_string(), Action::Create)]);

        let none = filtered.filter_by_target(Some("user"));
        assert!(none.is_empty());
    }
}
