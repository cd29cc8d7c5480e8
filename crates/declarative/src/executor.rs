//! Execution engine - applies a plan stage by stage
//!
//! Deletions run first, highest stage first, so dependents go before what
//! they depend on. Creates, updates and replaces then run lowest stage
//! first. Within a stage, parallelizable resources run on a rayon pool.
//! Once any step fails, later stages are skipped.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::planner::{ExecutionPlan, PlanStep};
use crate::resource::Resource;
use crate::types::{Action, ApplyResult, ExecuteOptions, ExecuteSummary, Outcome, StateEntry};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything the caller needs to report and persist an apply.
#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    /// One per step that ran or was skipped, including no-change steps
    pub outcomes: Vec<Outcome>,
    /// Stored entries whose resource disappeared on its own
    pub vanished: Vec<StateEntry>,
    /// False for dry runs and declined confirmations
    pub applied: bool,
}

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs)
/// * `progress` - Progress callback, shared with worker threads
/// * `confirm` - Confirmation callback, asked once before any change
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total_changes = plan.change_count();
    let ExecutionPlan { steps, vanished } = plan;

    if opts.dry_run {
        return Ok(ExecuteReport {
            vanished,
            ..Default::default()
        });
    }

    if total_changes > 0
        && !confirm.confirm(&format!("Apply {total_changes} change(s)?"))?
    {
        return Ok(ExecuteReport {
            summary: ExecuteSummary {
                skipped: total_changes,
                ..Default::default()
            },
            vanished,
            ..Default::default()
        });
    }

    let mut report = ExecuteReport {
        vanished,
        applied: true,
        ..Default::default()
    };

    let (unchanged, changing): (Vec<_>, Vec<_>) =
        steps.into_iter().partition(|s| s.action == Action::NoChange);
    for step in &unchanged {
        report.outcomes.push(outcome(step, ApplyResult::NoChange, step.prior.clone()));
    }

    let (deletes, applies): (Vec<_>, Vec<_>) =
        changing.into_iter().partition(|s| s.action == Action::Delete);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create apply thread pool")?;

    let mut stages: Vec<(String, Vec<PlanStep>)> = Vec::new();
    for (stage, batch) in by_stage(deletes).into_iter().rev() {
        stages.push((format!("Deleting (stage {stage})"), batch));
    }
    for (stage, batch) in by_stage(applies) {
        stages.push((format!("Applying (stage {stage})"), batch));
    }

    let mut failed = false;
    for (label, batch) in stages {
        let outcomes = if failed {
            batch
                .iter()
                .map(|step| {
                    let result = ApplyResult::Skipped {
                        reason: "an earlier stage failed".to_string(),
                    };
                    progress.on_resource_complete(&step.address(), &result);
                    outcome(step, result, None)
                })
                .collect()
        } else {
            progress.on_batch_start(batch.len(), &label);
            let outcomes = run_batch(&pool, &batch, progress);
            progress.on_batch_complete();
            outcomes
        };

        failed |= outcomes.iter().any(|o| !o.result.is_success());
        report.outcomes.extend(outcomes);
    }

    for outcome in &report.outcomes {
        report.summary.add_result(&outcome.result);
    }
    Ok(report)
}

fn by_stage(steps: Vec<PlanStep>) -> BTreeMap<u8, Vec<PlanStep>> {
    let mut stages: BTreeMap<u8, Vec<PlanStep>> = BTreeMap::new();
    for step in steps {
        stages.entry(step.resource.stage()).or_default().push(step);
    }
    stages
}

/// Run one stage: parallel steps on the pool, then the rest in order.
fn run_batch<P: ProgressCallback>(
    pool: &rayon::ThreadPool,
    batch: &[PlanStep],
    progress: &P,
) -> Vec<Outcome> {
    let (parallel, sequential): (Vec<&PlanStep>, Vec<&PlanStep>) =
        batch.iter().partition(|s| s.resource.can_parallelize());

    let mut outcomes: Vec<Outcome> = pool.install(|| {
        parallel
            .par_iter()
            .map(|step| run_step(step, progress))
            .collect()
    });
    outcomes.extend(sequential.into_iter().map(|step| run_step(step, progress)));
    outcomes
}

fn run_step<P: ProgressCallback>(step: &PlanStep, progress: &P) -> Outcome {
    let address = step.address();
    progress.on_resource_start(&address, step.action);
    log::info!("{} {address}", step.action);

    let result = apply_step(step.action, step.resource.as_ref(), step.prior.as_ref());
    let out = match result {
        Ok((result, state)) => outcome(step, result, state),
        Err(e) => {
            log::debug!("{address} failed: {e:#}");
            outcome(
                step,
                ApplyResult::Failed {
                    error: format!("{e:#}"),
                },
                None,
            )
        }
    };
    progress.on_resource_complete(&address, &out.result);
    out
}

fn apply_step(
    action: Action,
    resource: &dyn Resource,
    prior: Option<&Value>,
) -> Result<(ApplyResult, Option<Value>)> {
    let prior = || {
        prior.with_context(|| {
            format!(
                "No live state for {}.{}",
                resource.resource_type(),
                resource.id()
            )
        })
    };

    match action {
        Action::NoChange => Ok((ApplyResult::NoChange, prior().ok().cloned())),
        Action::Create => Ok((ApplyResult::Created, Some(resource.create()?))),
        Action::Update => Ok((ApplyResult::Modified, Some(resource.update(prior()?)?))),
        Action::Replace => {
            resource.delete(prior()?)?;
            Ok((ApplyResult::Replaced, Some(resource.create()?)))
        }
        Action::Delete => {
            resource.delete(prior()?)?;
            Ok((ApplyResult::Removed, None))
        }
    }
}

fn outcome(step: &PlanStep, result: ApplyResult, new_state: Option<Value>) -> Outcome {
    Outcome {
        resource_type: step.resource.resource_type().to_string(),
        id: step.resource.id(),
        action: step.action,
        result,
        new_state,
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoDecline, NoProgress};
    use crate::resource::BoxedResource;
    use crate::types::{Change, FieldChange};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    #[derive(Debug)]
    struct Recorder {
        id: String,
        stage: u8,
        fail: bool,
        journal: Journal,
    }

    impl Recorder {
        fn record(&self, verb: &str) {
            let mut journal = match self.journal.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            journal.push(format!("{verb} {}", self.id));
        }
    }

    impl Resource for Recorder {
        fn id(&self) -> String {
            self.id.clone()
        }
        fn description(&self) -> String {
            self.id.clone()
        }
        fn resource_type(&self) -> &'static str {
            "recorder"
        }
        fn stage(&self) -> u8 {
            self.stage
        }
        fn create(&self) -> Result<Value> {
            self.record("create");
            if self.fail {
                anyhow::bail!("create failed");
            }
            Ok(json!({"id": self.id}))
        }
        fn read(&self, prior: &Value) -> Result<Option<Value>> {
            Ok(Some(prior.clone()))
        }
        fn compare(&self, _live: &Value) -> Result<Change> {
            Ok(Change::NoChange)
        }
        fn update(&self, prior: &Value) -> Result<Value> {
            self.record("update");
            Ok(prior.clone())
        }
        fn delete(&self, _prior: &Value) -> Result<()> {
            self.record("delete");
            Ok(())
        }
        fn can_parallelize(&self) -> bool {
            false
        }
    }

    fn step(journal: &Journal, id: &str, stage: u8, action: Action, fail: bool) -> PlanStep {
        let resource: BoxedResource = Box::new(Recorder {
            id: id.into(),
            stage,
            fail,
            journal: Arc::clone(journal),
        });
        PlanStep {
            action,
            resource,
            prior: (action != Action::Create).then(|| json!({"id": id})),
            changes: Vec::<FieldChange>::new(),
        }
    }

    fn journal_of(journal: &Journal) -> Vec<String> {
        match journal.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[test]
    fn test_stage_ordering() {
        let journal = Journal::default();
        let plan = ExecutionPlan {
            steps: vec![
                step(&journal, "user", 1, Action::Create, false),
                step(&journal, "group", 0, Action::Create, false),
                step(&journal, "old-group", 0, Action::Delete, false),
                step(&journal, "old-user", 1, Action::Delete, false),
                step(&journal, "stable", 0, Action::NoChange, false),
            ],
            vanished: Vec::new(),
        };

        let report = execute_simple(plan, &ExecuteOptions::default()).unwrap();
        assert_eq!(
            journal_of(&journal),
            vec!["delete old-user", "delete old-group", "create group", "create user"]
        );
        assert!(report.applied);
        assert_eq!(report.summary.created, 2);
        assert_eq!(report.summary.removed, 2);
        assert_eq!(report.summary.no_change, 1);

        let stable = report.outcomes.iter().find(|o| o.id == "stable").unwrap();
        assert_eq!(stable.new_state, Some(json!({"id": "stable"})));
    }

    #[test]
    fn test_replace_deletes_then_creates() {
        let journal = Journal::default();
        let plan = ExecutionPlan {
            steps: vec![step(&journal, "br0", 0, Action::Replace, false)],
            vanished: Vec::new(),
        };
        let report = execute_simple(plan, &ExecuteOptions::default()).unwrap();
        assert_eq!(journal_of(&journal), vec!["delete br0", "create br0"]);
        assert_eq!(report.summary.replaced, 1);
    }

    #[test]
    fn test_failure_skips_later_stages() {
        let journal = Journal::default();
        let plan = ExecutionPlan {
            steps: vec![
                step(&journal, "group", 0, Action::Create, true),
                step(&journal, "user", 1, Action::Create, false),
            ],
            vanished: Vec::new(),
        };
        let report = execute_simple(plan, &ExecuteOptions::default()).unwrap();

        assert_eq!(journal_of(&journal), vec!["create group"]);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        let failed = report.outcomes.iter().find(|o| o.id == "group").unwrap();
        assert!(failed.new_state.is_none());
        assert!(matches!(&failed.result, ApplyResult::Failed { error } if error.contains("create failed")));
    }

    #[test]
    fn test_declined_and_dry_run_do_nothing() {
        let journal = Journal::default();
        let plan = ExecutionPlan {
            steps: vec![step(&journal, "x", 0, Action::Create, false)],
            vanished: Vec::new(),
        };
        let report =
            execute(plan, &ExecuteOptions::default(), &NoProgress, &mut AutoDecline).unwrap();
        assert!(!report.applied);
        assert_eq!(report.summary.skipped, 1);

        let plan = ExecutionPlan {
            steps: vec![step(&journal, "x", 0, Action::Create, false)],
            vanished: Vec::new(),
        };
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = execute_simple(plan, &opts).unwrap();
        assert!(!report.applied);
        assert!(journal_of(&journal).is_empty());
    }
}
