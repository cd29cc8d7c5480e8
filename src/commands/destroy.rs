//! `linuxhost destroy` - delete everything in state

use anyhow::{Result, bail};

use super::Session;
use crate::Context;
use crate::engine::{self, ApplyOptions};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, yes: bool, jobs: usize) -> Result<()> {
    let mut session = Session::open(ctx)?;
    if session.state.state.entries.is_empty() {
        ui::info("Nothing in state to destroy");
        return Ok(());
    }

    let plan = session.destroy_plan(target)?;
    let opts = ApplyOptions {
        dry_run: false,
        jobs,
        yes,
        quiet: ctx.quiet,
    };
    let report = engine::apply(plan, &opts)?;

    session.state.state.record(&report);
    session.state.save()?;

    if !report.summary.is_success() {
        bail!("{} resource(s) could not be deleted", report.summary.failed);
    }
    Ok(())
}
