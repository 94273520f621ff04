//! Advisory per-workspace session lock: a `.lock` file in the workspace
//! notes directory holding the pid of the process that attached. It guards
//! against a second process starting the same workspace, nothing more.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::SESSION_LOCK_FILE_NAME;
use crate::error::PoolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LockCheck {
    pub(crate) held: bool,
    pub(crate) pid: u32,
}

pub(crate) fn lock_path(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join(SESSION_LOCK_FILE_NAME)
}

pub(crate) fn create_lock(workspace_dir: &Path, pid: u32) -> Result<()> {
    let path = lock_path(workspace_dir);
    fs::write(&path, pid.to_string())
        .with_context(|| format!("failed to write lock file {}", path.display()))
}

/// Removing an absent lock is the steady state, not an error.
pub(crate) fn remove_lock(workspace_dir: &Path) -> Result<()> {
    let path = lock_path(workspace_dir);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to remove lock file {}", path.display()))
        }
    }
}

/// Reads the lock and probes whether the recorded process still exists.
/// A dead owner yields `held: false` with the stale pid; the caller decides
/// whether to clean the artifact up.
pub(crate) fn check_lock(workspace_dir: &Path) -> Result<LockCheck> {
    check_lock_with(workspace_dir, process_exists)
}

pub(crate) fn check_lock_with<F>(workspace_dir: &Path, alive: F) -> Result<LockCheck>
where
    F: Fn(u32) -> bool,
{
    let path = lock_path(workspace_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LockCheck { held: false, pid: 0 });
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read lock file {}", path.display()));
        }
    };

    // A garbled payload must fail loudly; ignoring it could let two
    // processes attach to the same workspace.
    let pid: u32 = raw
        .trim()
        .parse()
        .map_err(|_| PoolError::CorruptLock { path: path.clone() })?;

    Ok(LockCheck {
        held: alive(pid),
        pid,
    })
}

/// Non-destructive existence probe: signal 0 delivers nothing, it only
/// reports whether the pid is live.
#[cfg(unix)]
pub(crate) fn process_exists(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
pub(crate) fn process_exists(_pid: u32) -> bool {
    // No cheap probe available; err on the side of treating the lock as
    // live so we never attach twice.
    true
}
