//! Subcommands.
//!
//! Every command except `completions` opens a [`Session`]: the validated
//! manifest, a handle to the host it names, and the state file bound to
//! that host.

pub mod apply;
pub mod destroy;
pub mod facts;
pub mod import;
pub mod plan;
pub mod refresh;

use anyhow::Result;
use declarative::{ExecutionPlan, StateEntry};
use hostkit::Host;
use std::sync::Arc;

use crate::Context;
use crate::config::Manifest;
use crate::paths;
use crate::resource;
use crate::state::StateFile;

/// Load the manifest and open the host it describes
pub fn connect(ctx: &Context) -> Result<(Manifest, Arc<Host>)> {
    let path = match &ctx.config {
        Some(path) => path.clone(),
        None => paths::manifest_file()?,
    };
    let manifest = Manifest::load(&path)?;
    let host = Arc::new(manifest.connection.open()?);
    log::info!("Connected to {}", host.target());
    Ok((manifest, host))
}

pub struct Session {
    pub manifest: Manifest,
    pub host: Arc<Host>,
    pub state: StateFile,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let (manifest, host) = connect(ctx)?;
        let mut state = StateFile::load(&paths::state_file()?)?;
        state.state.bind_host(&host.target())?;
        Ok(Self {
            manifest,
            host,
            state,
        })
    }

    /// Refresh stored entries and plan the manifest against them
    pub fn plan(&self, target: Option<&str>) -> Result<ExecutionPlan> {
        let desired = resource::desired(&self.manifest, &self.host)?;
        let plan = ExecutionPlan::build(desired, &self.state.state.entries, |entry| {
            self.rehydrate(entry)
        })?;
        Ok(plan.filter_by_target(target))
    }

    /// Plan deleting every stored entry
    pub fn destroy_plan(&self, target: Option<&str>) -> Result<ExecutionPlan> {
        let plan = ExecutionPlan::destroy(&self.state.state.entries, |entry| self.rehydrate(entry))?;
        Ok(plan.filter_by_target(target))
    }

    pub fn rehydrate(&self, entry: &StateEntry) -> Result<declarative::BoxedResource> {
        resource::rehydrate(entry, &self.host)
    }
}
