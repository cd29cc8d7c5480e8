//! Apply with terminal confirmation, progress and summary

use anyhow::Result;
use colored::Colorize;
use declarative::{ConfirmCallback, ExecuteOptions, ExecuteReport, ExecuteSummary, ExecutionPlan};
use dialoguer::Confirm;

use super::differ::display_plan;
use crate::progress::ApplyProgress;

/// Options for `apply` and `destroy`
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Show the plan, change nothing
    pub dry_run: bool,
    /// Parallel jobs within a stage
    pub jobs: usize,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Hide progress bars
    pub quiet: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            quiet: false,
        }
    }
}

/// Asks on the terminal unless `--yes` was given
struct DialoguerConfirm {
    yes: bool,
}

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        let confirmed = Confirm::new().with_prompt(prompt).default(true).interact()?;
        Ok(confirmed)
    }
}

/// Show the plan, confirm, execute and print the summary
pub fn apply(plan: ExecutionPlan, opts: &ApplyOptions) -> Result<ExecuteReport> {
    display_plan(&plan);
    let has_changes = plan.has_changes();

    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs,
    };
    let progress = ApplyProgress::new(opts.quiet);
    let mut confirm = DialoguerConfirm { yes: opts.yes };
    let report = declarative::execute(plan, &exec_opts, &progress, &mut confirm)?;

    if !has_changes {
        return Ok(report);
    }
    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if !report.applied {
        println!();
        println!("  {} Aborted", "✗".red());
    } else {
        print_summary(&report.summary);
    }
    Ok(report)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Host converged successfully!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.replaced, "replaced"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
    ];
    for (count, what) in lines {
        if count > 0 {
            println!("    • {count} resources {what}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{BoxedResource, Change, ChangeSet, TypedResource};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Note {
        text: &'static str,
        written: Mutex<Vec<String>>,
    }

    impl TypedResource for Note {
        type State = String;

        fn id(&self) -> String {
            "note".into()
        }
        fn description(&self) -> String {
            "A note".into()
        }
        fn resource_type(&self) -> &'static str {
            "note"
        }
        fn create(&self) -> Result<String> {
            self.written.lock().unwrap().push(self.text.to_string());
            Ok(self.text.to_string())
        }
        fn read(&self, prior: &String) -> Result<Option<String>> {
            Ok(Some(prior.clone()))
        }
        fn compare(&self, live: &String) -> Result<Change> {
            Ok(ChangeSet::new()
                .update("text", Some(live.as_str()), Some(self.text))
                .finish())
        }
        fn update(&self, _prior: &String) -> Result<String> {
            Ok(self.text.to_string())
        }
        fn delete(&self, _prior: &String) -> Result<()> {
            Ok(())
        }
    }

    fn plan() -> ExecutionPlan {
        let desired: Vec<BoxedResource> = vec![Box::new(Note {
            text: "hi",
            written: Mutex::new(Vec::new()),
        })];
        ExecutionPlan::build(desired, &[], |_| anyhow::bail!("nothing stored")).unwrap()
    }

    #[test]
    fn test_apply_with_yes() {
        let opts = ApplyOptions {
            yes: true,
            quiet: true,
            ..Default::default()
        };
        let report = apply(plan(), &opts).unwrap();
        assert!(report.applied);
        assert_eq!(report.summary.created, 1);
    }

    #[test]
    fn test_dry_run_applies_nothing() {
        let opts = ApplyOptions {
            dry_run: true,
            quiet: true,
            ..Default::default()
        };
        let report = apply(plan(), &opts).unwrap();
        assert!(!report.applied);
        assert!(report.outcomes.is_empty());
    }
}
