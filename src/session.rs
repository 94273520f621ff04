//! Thin wrapper around the tmux CLI. Session names are derived
//! deterministically from workspace names so existence checks are
//! idempotent. Failures are surfaced verbatim and never retried.

use anyhow::{Context, Result, bail};
use std::env;
use std::path::Path;

use crate::config::WorkspaceStatus;
use crate::constants::SESSION_PREFIX;
use crate::error::PoolError;
use crate::process::{best_error_line, binary_available, run_capture, run_checked, run_stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    None,
    Detached,
    Attached,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Detached => write!(f, "detached"),
            Self::Attached => write!(f, "attached"),
        }
    }
}

pub(crate) fn session_name(workspace: &str) -> String {
    format!("{SESSION_PREFIX}{workspace}")
}

pub(crate) fn tmux_available() -> bool {
    binary_available("tmux")
}

pub(crate) fn exists(session: &str) -> Result<bool> {
    let output = run_capture("tmux", &["has-session", "-t", session], None)?;
    if output.status.success() {
        return Ok(true);
    }
    // Exit code 1 means the session does not exist; anything else is a
    // real tmux failure.
    if output.status.code() == Some(1) {
        return Ok(false);
    }
    bail!(
        "failed to check tmux session '{session}': {}",
        best_error_line(&output.stderr)
    );
}

pub(crate) fn state(session: &str) -> Result<SessionState> {
    if !exists(session)? {
        return Ok(SessionState::None);
    }
    // Unfiltered listing on purpose: the -f filter flag is too recent to
    // rely on, so the matching happens here instead.
    let output = run_checked(
        "tmux",
        &["list-sessions", "-F", "#{session_name}:#{session_attached}"],
        None,
    )
    .with_context(|| format!("failed to query state of tmux session '{session}'"))?;
    parse_state_for(&output.stdout, session).map_err(Into::into)
}

/// Scans `name:N` lines (N is the attached-client count) for the given
/// session. Zero clients means detached; no matching line means the
/// session vanished between the existence check and this query.
pub(crate) fn parse_state_for(raw: &str, session: &str) -> Result<SessionState, PoolError> {
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let unexpected = || PoolError::UnexpectedOutput {
            tool: "tmux".to_string(),
            line: line.to_string(),
        };
        let (name, count) = line.rsplit_once(':').ok_or_else(unexpected)?;
        if name != session {
            continue;
        }
        let attached: u32 = count.trim().parse().map_err(|_| unexpected())?;
        return Ok(if attached > 0 {
            SessionState::Attached
        } else {
            SessionState::Detached
        });
    }
    Ok(SessionState::None)
}

pub(crate) fn create(session: &str, working_dir: &Path) -> Result<()> {
    let dir = working_dir
        .to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", working_dir.display()))?;
    run_checked(
        "tmux",
        &["new-session", "-d", "-s", session, "-c", dir],
        None,
    )
    .with_context(|| format!("failed to create tmux session '{session}'"))?;
    Ok(())
}

/// Blocks until the user detaches. Inside an existing tmux client we
/// switch instead of nesting.
pub(crate) fn attach(session: &str) -> Result<()> {
    if env::var_os("TMUX").is_some() {
        run_stream("tmux", &["switch-client", "-t", session], None)
    } else {
        run_stream("tmux", &["attach-session", "-t", session], None)
    }
}

/// Sends `text` followed by Enter, used to auto-launch the work agent in a
/// freshly created session.
pub(crate) fn send_input(session: &str, text: &str) -> Result<()> {
    run_checked("tmux", &["send-keys", "-t", session, text, "C-m"], None)
        .with_context(|| format!("failed to send input to tmux session '{session}'"))?;
    Ok(())
}

pub(crate) fn kill(session: &str) -> Result<()> {
    run_checked("tmux", &["kill-session", "-t", session], None)
        .with_context(|| format!("failed to kill tmux session '{session}'"))?;
    Ok(())
}

pub(crate) fn rename(old: &str, new: &str) -> Result<()> {
    run_checked("tmux", &["rename-session", "-t", old, new], None)
        .with_context(|| format!("failed to rename tmux session '{old}' to '{new}'"))?;
    Ok(())
}

pub(crate) fn list() -> Result<Vec<String>> {
    let output = run_capture("tmux", &["list-sessions", "-F", "#{session_name}"], None)?;
    if !output.status.success() {
        // A server that has never started reports an error rather than an
        // empty list.
        if output.stderr.contains("no server running") {
            return Ok(Vec::new());
        }
        bail!(
            "failed to list tmux sessions: {}",
            best_error_line(&output.stderr)
        );
    }
    Ok(parse_session_list(&output.stdout))
}

pub(crate) fn parse_session_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn set_status_line(session: &str, status_left: &str) -> Result<()> {
    let options: [(&str, &str); 4] = [
        ("status-left-length", "80"),
        ("status-left", status_left),
        ("status-style", "bg=colour235,fg=colour136"),
        ("status-interval", "5"),
    ];
    for (option, value) in options {
        run_checked("tmux", &["set-option", "-t", session, option, value], None)
            .with_context(|| format!("failed to set tmux option {option}"))?;
    }
    Ok(())
}

/// Reconciles persisted workspace status against the live session state.
/// The multiplexer is the source of truth for liveness: a workspace marked
/// active without a session has really stopped, and one marked idle with
/// an attached session is really active.
pub(crate) fn effective_status(stored: WorkspaceStatus, live: SessionState) -> WorkspaceStatus {
    match (stored, live) {
        (WorkspaceStatus::Archived, _) => WorkspaceStatus::Archived,
        (WorkspaceStatus::Active, SessionState::None) => WorkspaceStatus::Idle,
        (WorkspaceStatus::Idle, SessionState::Attached) => WorkspaceStatus::Active,
        (stored, _) => stored,
    }
}
