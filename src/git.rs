use anyhow::{Context, Result};
use std::path::Path;

use crate::process::{run_capture, run_checked, run_stream};

/// Clone with progress streamed straight to the user's terminal. A stalled
/// network clone blocks the invocation; there is deliberately no timeout.
pub(crate) fn clone(url: &str, dest: &Path) -> Result<()> {
    let dest = dest
        .to_str()
        .with_context(|| format!("clone path is not valid UTF-8: {}", dest.display()))?;
    run_stream("git", &["clone", "--progress", url, dest], None)
        .with_context(|| format!("failed to clone {url}"))
}

pub(crate) fn current_branch(repo: &Path) -> Result<String> {
    let repo_str = path_arg(repo)?;
    let output = run_checked(
        "git",
        &["-C", repo_str, "rev-parse", "--abbrev-ref", "HEAD"],
        None,
    )
    .with_context(|| format!("failed to read current branch of {}", repo.display()))?;
    Ok(output.stdout.trim().to_string())
}

pub(crate) fn remote_url(repo: &Path) -> Result<String> {
    let repo_str = path_arg(repo)?;
    let output = run_checked("git", &["-C", repo_str, "remote", "get-url", "origin"], None)
        .with_context(|| format!("failed to read remote URL of {}", repo.display()))?;
    Ok(output.stdout.trim().to_string())
}

pub(crate) fn is_repository(path: &Path) -> bool {
    let Some(path_str) = path.to_str() else {
        return false;
    };
    run_capture("git", &["-C", path_str, "rev-parse", "--git-dir"], None)
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}
