//! Error types for host operations.
//!
//! Every error maps onto one [`ErrorCategory`] so callers can render a
//! structured diagnostic (a short title plus a detail string that carries
//! the remote command output when there is one).

use thiserror::Error;

/// Categories of host errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Command execution failed or the connection was lost
    Transport,
    /// Command output did not have the expected shape
    Parse,
    /// Live state disagrees with what an operation just did
    Reconciliation,
    /// A record points at something that does not exist
    UnresolvedReference,
    /// Desired state is contradictory before anything runs
    Validation,
    /// Local IO failure (reading a certificate source file, etc.)
    Io,
}

impl ErrorCategory {
    /// Remote commands are never retried automatically.
    ///
    /// A retried `useradd` or `ip link add` may have already taken effect.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Short diagnostic title for this category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Remote command failed",
            Self::Parse => "Unexpected command output",
            Self::Reconciliation => "Host state did not converge",
            Self::UnresolvedReference => "Unresolved reference",
            Self::Validation => "Invalid desired state",
            Self::Io => "Local IO error",
        }
    }

    /// Actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transport => "Check connectivity and sudo rights on the host, then re-run",
            Self::Parse => "Compare the command output with the expected iproute2/passwd/PEM format",
            Self::Reconciliation => "Inspect the host manually; another actor may be changing it",
            Self::UnresolvedReference => "Create the referenced group or interface first",
            Self::Validation => "Fix the resource definition in the manifest",
            Self::Io => "Check the local path and its permissions",
        }
    }
}

/// Errors that can occur while reading or converging host state.
#[derive(Debug, Error)]
pub enum Error {
    /// A command exited non-zero or could not be started
    #[error("command `{command}` failed: {message}")]
    Transport {
        /// The command string that was sent
        command: String,
        /// Underlying cause (exit status, spawn error)
        message: String,
        /// Partial combined output, diagnostic only
        output: String,
    },

    /// Command output could not be parsed
    #[error("failed to parse {source_name}: {message}")]
    Parse {
        /// What was being parsed (e.g. "/etc/passwd")
        source_name: String,
        /// What went wrong
        message: String,
    },

    /// The resource did not appear after it was created
    #[error("{resource_type} '{id}' was not found after creation")]
    NotCreated {
        /// Kind of resource
        resource_type: String,
        /// Identity that was looked up
        id: String,
    },

    /// The resource is still present after it was deleted
    #[error("{resource_type} '{id}' remains present after deletion")]
    StillPresent {
        /// Kind of resource
        resource_type: String,
        /// Identity that was looked up
        id: String,
    },

    /// Live records are inconsistent with each other
    #[error("inconsistent host state: {message}")]
    Inconsistent {
        /// Description of the inconsistency
        message: String,
    },

    /// A user's GID has no group entry
    #[error("user '{username}' has primary gid {gid} but no group has that gid")]
    UnresolvedGid {
        /// Owner of the dangling reference
        username: String,
        /// The GID that could not be resolved
        gid: i64,
    },

    /// Desired state is overdefined or otherwise invalid
    #[error("{title}: {message}")]
    Validation {
        /// Short title (e.g. "Group overdefined")
        title: String,
        /// Explanation
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport { .. } => ErrorCategory::Transport,
            Error::Parse { .. } => ErrorCategory::Parse,
            Error::NotCreated { .. } | Error::StillPresent { .. } | Error::Inconsistent { .. } => {
                ErrorCategory::Reconciliation
            }
            Error::UnresolvedGid { .. } => ErrorCategory::UnresolvedReference,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error is worth retrying. Always false, see [`ErrorCategory::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Short diagnostic title.
    pub fn title(&self) -> String {
        match self {
            Error::Validation { title, .. } => title.clone(),
            Error::NotCreated { .. } => "Failed finding resource after creation".to_string(),
            Error::StillPresent { .. } => "Failed to delete".to_string(),
            other => other.category().description().to_string(),
        }
    }

    /// Diagnostic detail, including remote output where available.
    pub fn detail(&self) -> String {
        match self {
            Error::Transport {
                command,
                message,
                output,
            } => {
                let output = output.trim();
                if output.is_empty() {
                    format!("`{command}`: {message}")
                } else {
                    format!("`{command}`: {message}\n{output}")
                }
            }
            Error::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Shorthand for a parse error.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(title: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, Error>;
