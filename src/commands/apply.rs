//! `linuxhost apply` - converge the host to the manifest

use anyhow::{Result, bail};

use super::Session;
use crate::Context;
use crate::engine::{self, ApplyOptions};
use crate::ui;

pub fn run(
    ctx: &Context,
    target: Option<&str>,
    yes: bool,
    dry_run: bool,
    jobs: usize,
) -> Result<()> {
    let mut session = Session::open(ctx)?;
    if !ctx.quiet {
        ui::info(&format!("Reading {}...", session.host.target()));
    }
    let plan = session.plan(target)?;

    let opts = ApplyOptions {
        dry_run,
        jobs,
        yes,
        quiet: ctx.quiet,
    };
    let report = engine::apply(plan, &opts)?;
    if dry_run {
        return Ok(());
    }

    session.state.state.record(&report);
    session.state.save()?;
    log::debug!("State saved to {}", session.state.path().display());

    if !report.summary.is_success() {
        bail!(
            "{} resource(s) failed; successful changes were saved to state",
            report.summary.failed
        );
    }
    Ok(())
}
