//! Execution engine for linuxhost
//!
//! Planning and execution live in the `declarative` crate. This module adds
//! the terminal side:
//! 1. Displaying - the plan box with per-field changes
//! 2. Confirming - a dialoguer prompt unless `--yes`
//! 3. Reporting - progress bars per stage and the final summary

pub mod differ;
pub mod executor;

pub use differ::display_plan;
pub use executor::{ApplyOptions, apply};
