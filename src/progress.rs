//! Progress indicators for the apply engine.

use colored::Colorize;
use declarative::{Action, ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// A bar of `len` steps labelled `label`.
pub fn bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb
}

/// Result glyph shown next to a finished resource
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created
        | ApplyResult::Modified
        | ApplyResult::Replaced
        | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// Terminal progress for [`declarative::execute`]: one bar per stage.
///
/// Failures are printed above the bar as they happen.
pub struct ApplyProgress {
    current: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            current: Mutex::new(None),
            quiet,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pb) = guard.as_ref() {
            f(pb);
        }
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_batch_start(&self, count: usize, label: &str) {
        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            bar(count as u64, label)
        };
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(pb);
    }

    fn on_resource_start(&self, address: &str, action: Action) {
        self.with_bar(|pb| pb.set_message(format!("{} {address}", action.symbol())));
    }

    fn on_resource_complete(&self, address: &str, result: &ApplyResult) {
        self.with_bar(|pb| {
            if let ApplyResult::Failed { error } = result {
                pb.println(format!(
                    "  {} {address}: {}",
                    "✗".red(),
                    error.lines().next().unwrap_or_default()
                ));
            }
            pb.set_message(format!("{} {address}", result_symbol(result)));
            pb.inc(1);
        });
    }

    fn on_batch_complete(&self) {
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}
