//! Plan display

use colored::{ColoredString, Colorize};
use declarative::{
    Action, DiffSummary, ExecutionPlan, FieldChange, ResourceDiff, compute_diffs, group_by_type,
};

use crate::resource::{ca_certificate, group, interface, ip_address, user};

const RULE: &str = "─────────────────────────────────────────────────────";

fn type_title(resource_type: &str) -> &str {
    match resource_type {
        group::TYPE => "Groups",
        user::TYPE => "Users",
        interface::TYPE => "Interfaces",
        ip_address::TYPE => "IP addresses",
        ca_certificate::TYPE => "CA certificates",
        other => other,
    }
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
        Action::NoChange => action.symbol().dimmed(),
    }
}

/// `field: from → to`, with unset values shown as `(unset)`
fn field_line(field: &FieldChange) -> String {
    let from = field.from.as_deref().unwrap_or("(unset)");
    let to = field.to.as_deref().unwrap_or("(unset)");
    let marker = if field.forces_replace {
        " (forces replacement)"
    } else {
        ""
    };
    format!("{}: {from} → {to}{marker}", field.field)
}

fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "{} to add, {} to change, {} to replace, {} to destroy",
        summary.additions, summary.modifications, summary.replacements, summary.removals
    )
}

fn display_diff(diff: &ResourceDiff) {
    println!(
        "│   {} {:<30} {}",
        symbol(diff.action),
        diff.resource_id,
        diff.description.dimmed()
    );
    for field in &diff.fields {
        println!("│       {}", field_line(field).dimmed());
    }
}

/// Print the plan box: changes grouped by type, then the stored entries
/// that are gone from the host.
pub fn display_plan(plan: &ExecutionPlan) {
    let diffs = compute_diffs(plan);
    if diffs.is_empty() && plan.vanished.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!("┌─ {} ─────────────────────────────────────────┐", "Execution Plan".bold());
    println!("│");

    for (resource_type, type_diffs) in group_by_type(&diffs) {
        println!("│ {}", type_title(resource_type).bold());
        for diff in type_diffs {
            display_diff(diff);
        }
        println!("│");
    }

    if !plan.vanished.is_empty() {
        println!("│ {}", "Gone from host (dropped from state)".bold());
        for entry in &plan.vanished {
            println!("│   {} {}", "○".dimmed(), entry.address());
        }
        println!("│");
    }

    println!("├{RULE}┤");
    println!(
        "│ Summary: {}",
        summary_line(&DiffSummary::from_diffs(&diffs)).bold()
    );
    println!("└{RULE}┘");
}
