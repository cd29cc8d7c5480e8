//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! reading live state, and converging systems to match the desired state.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be created, read, updated
//!   and deleted (users, interfaces, certificates)
//! - **StateEntry**: What was last read back for a managed resource
//! - **ExecutionPlan**: One step per resource, with the action to take
//! - **Executor**: Applies a plan stage by stage with parallelism
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     execute_simple, BoxedResource, Change, ChangeSet, ExecuteOptions, ExecutionPlan,
//!     TypedResource,
//! };
//!
//! #[derive(Debug)]
//! struct Motd(String);
//!
//! impl TypedResource for Motd {
//!     type State = String;
//!
//!     fn id(&self) -> String { "motd".into() }
//!     fn description(&self) -> String { "Message of the day".into() }
//!     fn resource_type(&self) -> &'static str { "file" }
//!
//!     fn create(&self) -> anyhow::Result<String> { Ok(self.0.clone()) }
//!     fn read(&self, prior: &String) -> anyhow::Result<Option<String>> {
//!         Ok(Some(prior.clone()))
//!     }
//!     fn compare(&self, live: &String) -> anyhow::Result<Change> {
//!         Ok(ChangeSet::new().update("text", Some(live), Some(&self.0)).finish())
//!     }
//!     fn update(&self, _prior: &String) -> anyhow::Result<String> { Ok(self.0.clone()) }
//!     fn delete(&self, _prior: &String) -> anyhow::Result<()> { Ok(()) }
//! }
//!
//! let desired: Vec<BoxedResource> = vec![Box::new(Motd("hello".into()))];
//! let plan = ExecutionPlan::build(desired, &[], |_| anyhow::bail!("nothing stored"))?;
//! let report = execute_simple(plan, &ExecuteOptions::default())?;
//! assert_eq!(report.summary.created, 1);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{ExecuteReport, execute, execute_simple};
pub use planner::{ExecutionPlan, PlanStep, parse_target};
pub use resource::{BoxedResource, Resource, TypedResource};
pub use types::{
    Action, ApplyResult, Change, ChangeSet, ExecuteOptions, ExecuteSummary, FieldChange, Outcome,
    StateEntry,
};
