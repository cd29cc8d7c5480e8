//! Command executors.
//!
//! The [`Executor`] trait is the only way this crate talks to a host. It
//! takes a complete shell command string (including any `sudo` prefix) and
//! returns the combined stdout and stderr text.
//!
//! - [`ssh::SshExecutor`] runs commands through the system `ssh` client
//! - [`local::LocalExecutor`] runs commands through `sh -c` on this machine
//! - [`MockExecutor`] replays scripted output for tests
//!
//! # Testing
//!
//! ```
//! use hostkit::backend::{Executor, MockExecutor};
//!
//! let mock = MockExecutor::new();
//! mock.respond("hostname", "web-01\n");
//!
//! assert_eq!(mock.execute("hostname").unwrap(), "web-01\n");
//! assert_eq!(mock.commands(), vec!["hostname".to_string()]);
//! ```

pub mod local;
pub mod ssh;

use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::process::Output;
use std::sync::{Arc, Mutex, MutexGuard};

/// Runs one shell command on a host and returns its combined output.
///
/// On failure the returned [`Error::Transport`] carries whatever output was
/// produced. Callers must treat that output as diagnostic text only and
/// never parse it as state.
pub trait Executor: Send + Sync {
    /// Execute a command and block until it finishes.
    fn execute(&self, command: &str) -> Result<String>;

    /// Human-readable name of the target (for logs and prompts).
    fn target(&self) -> String;
}

/// Turn a finished process into the executor contract.
///
/// stdout comes first, then stderr. Interleaving is not preserved.
pub(crate) fn finish(command: &str, output: &Output) -> Result<String> {
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(text)
    } else {
        Err(Error::Transport {
            command: command.to_string(),
            message: match output.status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            },
            output: text,
        })
    }
}

/// A scripted reply for [`MockExecutor`].
#[derive(Debug, Clone)]
enum Reply {
    Ok(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    replies: HashMap<String, VecDeque<Reply>>,
    log: Vec<String>,
}

/// In-memory executor for tests.
///
/// Replies are queued per exact command string. Each call pops the next
/// reply; the last reply for a command stays in place and is repeated.
/// Commands without a scripted reply succeed with empty output. Clones share
/// the same script and log.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

impl MockExecutor {
    /// Create a new empty mock executor.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queue a successful reply for `command`.
    pub fn respond(&self, command: impl Into<String>, output: impl Into<String>) -> &Self {
        self.lock()
            .replies
            .entry(command.into())
            .or_default()
            .push_back(Reply::Ok(output.into()));
        self
    }

    /// Queue a failing reply for `command`.
    pub fn fail(&self, command: impl Into<String>, output: impl Into<String>) -> &Self {
        self.lock()
            .replies
            .entry(command.into())
            .or_default()
            .push_back(Reply::Fail(output.into()));
        self
    }

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Executed commands that start with `sudo` (i.e. the mutating ones).
    pub fn mutations(&self) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .filter(|c| {
                c.starts_with("sudo ")
                    && !c.starts_with("sudo ps ")
                    && !c.starts_with("sudo bash -c 'cat ")
            })
            .cloned()
            .collect()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, command: &str) -> Result<String> {
        let mut state = self.lock();
        state.log.push(command.to_string());

        let reply = match state.replies.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            None => Ok(String::new()),
            Some(Reply::Ok(output)) => Ok(output),
            Some(Reply::Fail(output)) => Err(Error::Transport {
                command: command.to_string(),
                message: "exit status 1".to_string(),
                output,
            }),
        }
    }

    fn target(&self) -> String {
        "mock".to_string()
    }
}
