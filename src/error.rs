use std::path::PathBuf;

use thiserror::Error;

/// Failures with a meaning callers can act on. Everything else travels as
/// `anyhow::Error` with context attached at the call site.
#[derive(Debug, Error)]
pub(crate) enum PoolError {
    #[error("workspace '{0}' not found")]
    WorkspaceNotFound(String),
    #[error("remote '{0}' not found")]
    RemoteNotFound(String),
    #[error("clone at '{0}' not found")]
    CloneNotFound(String),
    #[error("workspace '{0}' already exists")]
    WorkspaceExists(String),
    #[error("remote '{0}' already exists")]
    RemoteExists(String),
    #[error("clone at '{0}' is already registered")]
    CloneExists(String),
    #[error("clone is already in use by workspace '{0}'")]
    CloneInUse(String),
    #[error("invalid workspace name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("config file {path} is not valid JSON: {source}")]
    CorruptConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("lock file {path} does not contain a process id")]
    CorruptLock { path: PathBuf },
    #[error("unexpected `{tool}` output: {line}")]
    UnexpectedOutput { tool: String, line: String },
}
