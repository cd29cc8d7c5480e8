//! SSH backend using the system `ssh` client.
//!
//! Authentication is left to `ssh` itself (agent or identity file). The
//! client runs in batch mode so a missing key fails instead of prompting.

use crate::backend::{Executor, finish};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::Command;

/// Connection settings for [`SshExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub identity_file: Option<PathBuf>,
    /// Extra `-o` options, e.g. `StrictHostKeyChecking=accept-new`
    pub options: Vec<String>,
}

impl SshConfig {
    /// Settings for `host` on port 22 with the current user.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            identity_file: None,
            options: Vec::new(),
        }
    }

    /// `user@host` or `host`.
    pub fn destination(&self) -> String {
        match &self.username {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// Arguments passed to `ssh` before the remote command.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(self.destination());
        args
    }
}

/// Executor that sends each command over a fresh `ssh` invocation.
pub struct SshExecutor {
    config: SshConfig,
    ssh_path: String,
}

impl SshExecutor {
    /// Create a new SshExecutor.
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            ssh_path: "ssh".to_string(),
        }
    }

    /// Use a specific `ssh` binary.
    pub fn with_ssh_path(mut self, path: impl Into<String>) -> Self {
        self.ssh_path = path.into();
        self
    }
}

impl Executor for SshExecutor {
    fn execute(&self, command: &str) -> Result<String> {
        log::debug!("ssh {}: {}", self.config.destination(), command);

        let output = Command::new(&self.ssh_path)
            .args(self.config.args())
            .arg(command)
            .output()
            .map_err(|e| Error::Transport {
                command: command.to_string(),
                message: format!("failed to execute {}: {e}", self.ssh_path),
                output: String::new(),
            })?;

        finish(command, &output)
    }

    fn target(&self) -> String {
        self.config.destination()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_minimal() {
        let config = SshConfig::new("10.0.0.2");
        assert_eq!(
            config.args(),
            vec!["-p", "22", "-o", "BatchMode=yes", "10.0.0.2"]
        );
    }

    #[test]
    fn test_args_full() {
        let config = SshConfig {
            host: "router".into(),
            port: 2222,
            username: Some("ops".into()),
            identity_file: Some(PathBuf::from("/home/ops/.ssh/id_ed25519")),
            options: vec!["StrictHostKeyChecking=accept-new".into()],
        };
        assert_eq!(
            config.args(),
            vec![
                "-p",
                "2222",
                "-o",
                "BatchMode=yes",
                "-i",
                "/home/ops/.ssh/id_ed25519",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "ops@router",
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_transport_error() {
        let executor = SshExecutor::new(SshConfig::new("localhost"))
            .with_ssh_path("/nonexistent/ssh-binary");
        let err = executor.execute("true").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Transport);
    }
}
