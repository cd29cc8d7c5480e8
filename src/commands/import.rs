//! `linuxhost import` - adopt an existing object into state

use anyhow::Result;

use super::Session;
use crate::Context;
use crate::resource;
use crate::ui;

pub fn run(ctx: &Context, resource_type: &str, key: &str) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let (id, state) = resource::import(&session.host, resource_type, key)?;

    let address = format!("{resource_type}.{id}");
    if session.state.state.get(resource_type, &id).is_some() {
        ui::warn(&format!("{address} is already managed; replacing its stored state"));
    }
    session.state.state.upsert(resource_type, &id, state);
    session.state.save()?;

    ui::success(&format!("Imported {address}"));
    Ok(())
}
