//! `linuxhost refresh` - re-read every stored resource

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;

use super::Session;
use crate::Context;
use crate::ui;

/// What a refresh did to the stored entries
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub unchanged: usize,
    pub drifted: usize,
    pub vanished: usize,
}

pub fn run(ctx: &Context) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let summary = refresh(&mut session)?;
    session.state.save()?;

    if ctx.quiet {
        return Ok(());
    }
    println!();
    ui::success(&format!(
        "Refreshed {} resource(s) on {}",
        summary.unchanged + summary.drifted + summary.vanished,
        session.host.target()
    ));
    if summary.drifted > 0 {
        println!("    • {} {}", summary.drifted, "drifted, state updated".yellow());
    }
    if summary.vanished > 0 {
        println!("    • {} {}", summary.vanished, "gone, dropped from state".red());
    }
    Ok(())
}

/// Replace each stored state with what the host reports now
pub fn refresh(session: &mut Session) -> Result<RefreshSummary> {
    let mut summary = RefreshSummary::default();
    let entries = session.state.state.entries.clone();

    for entry in &entries {
        let resource = session.rehydrate(entry)?;
        let live = resource
            .read(&entry.state)
            .with_context(|| format!("Failed to read {}", entry.address()))?;

        match live {
            Some(state) if state == entry.state => summary.unchanged += 1,
            Some(state) => {
                log::info!("{} drifted", entry.address());
                session
                    .state
                    .state
                    .upsert(&entry.resource_type, &entry.id, state);
                summary.drifted += 1;
            }
            None => {
                log::info!("{} no longer exists", entry.address());
                session.state.state.remove(&entry.resource_type, &entry.id);
                summary.vanished += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Manifest;
    use crate::resource::testing;
    use crate::state::StateFile;
    use hostkit::accounts::groups;
    use hostkit::backend::MockExecutor;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_refresh_updates_drift_and_drops_vanished() {
        let dir = TempDir::new().unwrap();
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, "devs:x:2000:alice\nops:x:3000:\n");

        let mut state = StateFile::load(&dir.path().join("state.json")).unwrap();
        state.state.upsert("group", "devs", json!({"gid": 2000, "name": "devs", "members": []}));
        state.state.upsert("group", "ops", json!({"gid": 3000, "name": "ops", "members": []}));
        state.state.upsert("group", "qa", json!({"gid": 4000, "name": "qa", "members": []}));

        let mut session = Session {
            manifest: Manifest::default(),
            host: testing::host(&mock),
            state,
        };
        let summary = refresh(&mut session).unwrap();
        assert_eq!(
            summary,
            RefreshSummary {
                unchanged: 1,
                drifted: 1,
                vanished: 1,
            }
        );

        let devs = session.state.state.get("group", "devs").unwrap();
        assert_eq!(devs.state["members"], json!(["alice"]));
        assert!(session.state.state.get("group", "qa").is_none());
        assert!(mock.mutations().is_empty());
    }
}
