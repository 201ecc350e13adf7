// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring, starting or running a watch session.
///
/// Configuration and watch initialization errors abort startup. Trigger errors are
/// reported to the log and otherwise swallowed by the session.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Configuration could not be extracted from one of the layered sources.
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// A watch pattern is empty or not a valid glob.
    #[error("invalid watch pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The working directory cannot be resolved.
    #[error("invalid working directory {path}: {source}")]
    InvalidCwd {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The underlying file system watcher failed to start.
    #[error("failed to watch {path}: {source}")]
    WatchInit {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Updating the target file's timestamp failed.
    #[error("failed to touch {path}: {source}")]
    Trigger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WatchError {
    /// Whether this error belongs to the configuration class (bad patterns, bad sources, bad cwd).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WatchError::Config(_) | WatchError::InvalidPattern { .. } | WatchError::InvalidCwd { .. }
        )
    }
}
