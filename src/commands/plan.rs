//! `linuxhost plan` - preview what apply would change

use anyhow::Result;

use super::Session;
use crate::Context;
use crate::engine::display_plan;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    if !ctx.quiet {
        ui::info(&format!("Reading {}...", session.host.target()));
    }
    let plan = session.plan(target)?;
    display_plan(&plan);

    if plan.has_changes() && !ctx.quiet {
        println!();
        ui::dim("Run 'linuxhost apply' to make these changes");
    }
    Ok(())
}
