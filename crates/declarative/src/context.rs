//! Progress and confirmation callbacks
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific terminal UI.

use crate::types::{Action, ApplyResult};
use anyhow::Result;

/// Progress callback for execution operations
///
/// Methods take `&self` because resources within a stage are applied from
/// several worker threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a stage of `count` resources starts
    fn on_batch_start(&self, count: usize, label: &str);

    /// Called when starting to apply a single resource
    fn on_resource_start(&self, address: &str, action: Action);

    /// Called when a resource application completes
    fn on_resource_complete(&self, address: &str, result: &ApplyResult);

    /// Called when a stage completes
    fn on_batch_complete(&self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&self, _count: usize, _label: &str) {}
    fn on_resource_start(&self, _address: &str, _action: Action) {}
    fn on_resource_complete(&self, _address: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
