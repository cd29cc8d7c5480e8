//! Local backend, for managing the machine the tool runs on.

use crate::backend::{Executor, finish};
use crate::error::{Error, Result};
use std::process::Command;

/// Executor that runs commands through `sh -c`.
pub struct LocalExecutor {
    shell: String,
}

impl LocalExecutor {
    /// Create a new LocalExecutor using `/bin/sh`.
    pub fn new() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for LocalExecutor {
    fn execute(&self, command: &str) -> Result<String> {
        log::debug!("local: {command}");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| Error::Transport {
                command: command.to_string(),
                message: format!("failed to execute {}: {e}", self.shell),
                output: String::new(),
            })?;

        finish(command, &output)
    }

    fn target(&self) -> String {
        "localhost".to_string()
    }
}
