//! One function per subcommand. Every command that mutates state runs a
//! single lock/load/mutate/save cycle under the config lock; `start` runs
//! two, one on each side of the blocking attach, so other commands are
//! never stalled behind an interactive session.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Cli, Commands};
use crate::config::{
    Config, ConfigLock, Workspace, WorkspaceStatus, config_lock_path, expand_tilde,
    validate_workspace_name,
};
use crate::constants::{
    CONFIG_LOCK_TIMEOUT_MS, LIST_PATH_MAX_CHARS, LIST_URL_MAX_CHARS, TRUNCATE_ELLIPSIS_CHARS,
};
use crate::error::PoolError;
use crate::lock;
use crate::process::progress;
use crate::session::{self, SessionState};
use crate::template;
use crate::git;
use crate::workspace::WorkspaceDirs;

pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Create {
            name,
            remote,
            path,
            summary,
            new_clone,
            take_from,
        } => cmd_create(
            &name,
            remote.as_deref(),
            path.as_deref(),
            summary.as_deref(),
            new_clone,
            take_from.as_deref(),
        ),
        Commands::Start { name } => cmd_start(&name),
        Commands::Stop { name } => cmd_stop(&name),
        Commands::Archive { name } => cmd_archive(&name),
        Commands::Rename { old, new } => cmd_rename(&old, &new),
        Commands::List { archived } => cmd_list(archived),
        Commands::Info { name } => cmd_info(&name),
        Commands::Cd { name } => cmd_cd(&name),
        Commands::AddRemote {
            name,
            url,
            clone_dir,
        } => cmd_add_remote(&name, &url, &clone_dir),
        Commands::Remotes => cmd_remotes(),
        Commands::NewClone { remote } => cmd_new_clone(&remote),
        Commands::ImportClone {
            remote,
            path,
            force,
        } => cmd_import_clone(&remote, &path, force),
        Commands::Clones { remote } => cmd_clones(remote.as_deref()),
    }
}

fn lock_config() -> Result<ConfigLock> {
    ConfigLock::acquire(
        &config_lock_path()?,
        Duration::from_millis(CONFIG_LOCK_TIMEOUT_MS),
    )
}

fn workspace_dirs(cfg: &Config) -> WorkspaceDirs {
    WorkspaceDirs::new(expand_tilde(&cfg.settings.workspace_dir))
}

fn absolutize(path: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    let cwd = env::current_dir().context("failed to determine current directory")?;
    Ok(cwd.join(expanded))
}

fn path_str(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}

// Create

/// How the new workspace gets a repository to work in.
enum CloneSource {
    Auto,
    Fresh,
    TakeFrom(String),
}

fn cmd_create(
    name: &str,
    remote: Option<&str>,
    path: Option<&str>,
    summary: Option<&str>,
    new_clone: bool,
    take_from: Option<&str>,
) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;

    validate_workspace_name(name)?;
    if cfg.workspaces.contains_key(name) {
        return Err(PoolError::WorkspaceExists(name.to_string()).into());
    }
    let dirs = workspace_dirs(&cfg);
    if dirs.exists(name) {
        bail!(
            "workspace directory {} already exists; remove it or pick another name",
            dirs.path(name).display()
        );
    }

    // A clone made this invocation, reported on rollback so it can be
    // imported instead of re-cloned.
    let mut fresh_clone: Option<String> = None;

    if let Some(raw) = path {
        let repo = absolutize(raw)?;
        if !git::is_repository(&repo) {
            bail!("{} is not a git repository", repo.display());
        }
        cfg.add_workspace(name, &path_str(&repo)?)?;
    } else {
        let remote_name = resolve_remote_name(&cfg, remote)?;
        let source = if new_clone {
            CloneSource::Fresh
        } else if let Some(donor) = take_from {
            CloneSource::TakeFrom(donor.to_string())
        } else {
            CloneSource::Auto
        };
        let clone_path = resolve_clone(&mut cfg, &remote_name, source, &mut fresh_clone)?;
        cfg.add_workspace(name, "")?;
        cfg.assign_clone(&clone_path, name)?;
        cfg.workspace_mut(name)?.clone_path = Some(clone_path);
    }

    let repo_dir = cfg.workspace(name)?.repo_dir().to_string();
    let staged = (|| -> Result<()> {
        materialize_workspace(&dirs, name, summary, &repo_dir)?;
        cfg.save()
    })();
    if let Err(err) = staged {
        if let Err(cleanup_err) = dirs.remove(name) {
            progress(&format!("rollback incomplete: {cleanup_err:#}"));
        }
        if !repo_dir.is_empty()
            && let Err(cleanup_err) = template::remove_onboarding(Path::new(&repo_dir))
        {
            progress(&format!("rollback incomplete: {cleanup_err:#}"));
        }
        if let Some(clone_path) = fresh_clone {
            progress(&format!(
                "the fresh clone at {clone_path} was kept; register it with `paddock import-clone`"
            ));
        }
        return Err(err);
    }

    println!("Created workspace '{name}'");
    if let Some(clone_path) = &cfg.workspace(name)?.clone_path {
        println!("  Clone: {clone_path}");
    }
    println!("\nStart it with: paddock start {name}");
    Ok(())
}

/// Filesystem half of create: the notes directory, the optional summary
/// and the onboarding document in the checkout. The checkout may be
/// missing on disk (a clone deleted out from under the pool); the
/// onboarding document is then left for the next start to regenerate.
pub(crate) fn materialize_workspace(
    dirs: &WorkspaceDirs,
    name: &str,
    summary: Option<&str>,
    repo_dir: &str,
) -> Result<()> {
    let ws_dir = dirs.create(name)?;
    if let Some(summary) = summary {
        dirs.write_summary(name, summary)?;
    }
    if !repo_dir.is_empty() && Path::new(repo_dir).is_dir() {
        template::generate_onboarding(name, &ws_dir, Path::new(repo_dir))?;
    }
    Ok(())
}

/// An explicit remote name wins; otherwise a sole registered remote is
/// unambiguous enough to use without one.
fn resolve_remote_name(cfg: &Config, remote: Option<&str>) -> Result<String> {
    if let Some(remote) = remote {
        cfg.remote(remote)?;
        return Ok(remote.to_string());
    }
    match cfg.remotes.len() {
        0 => bail!("no remotes registered; add one with `paddock add-remote <name> <url> --clone-dir <dir>`"),
        1 => Ok(cfg.remotes.keys().next().cloned().unwrap_or_default()),
        _ => {
            let names: Vec<&str> = cfg.remotes.keys().map(String::as_str).collect();
            bail!(
                "multiple remotes registered ({}); pick one with --remote",
                names.join(", ")
            );
        }
    }
}

fn resolve_clone(
    cfg: &mut Config,
    remote_name: &str,
    source: CloneSource,
    fresh_clone: &mut Option<String>,
) -> Result<String> {
    match source {
        CloneSource::Auto => {
            if let Some(clone) = cfg.find_free_clone(remote_name) {
                return Ok(clone.path.clone());
            }
            let idle: Vec<String> = cfg
                .find_idle_clones(remote_name)
                .iter()
                .map(|clone| clone.in_use_by.clone())
                .collect();
            let mut hints = format!(
                "no free clone of '{remote_name}'; clone a new one with --new-clone"
            );
            if !idle.is_empty() {
                hints.push_str(&format!(
                    ", or take one from an idle workspace with --take-from ({})",
                    idle.join(", ")
                ));
            }
            bail!(hints);
        }
        CloneSource::Fresh => {
            let clone_path = make_clone(cfg, remote_name)?;
            *fresh_clone = Some(clone_path.clone());
            Ok(clone_path)
        }
        CloneSource::TakeFrom(donor) => {
            let donor_ws = cfg.workspace(&donor)?;
            if donor_ws.status != WorkspaceStatus::Idle {
                bail!(
                    "workspace '{donor}' is {}; only idle workspaces can give up their clone",
                    donor_ws.status
                );
            }
            let Some(clone_path) = donor_ws.clone_path.clone() else {
                bail!("workspace '{donor}' has no clone to take");
            };
            let clone = cfg.clone_record(&clone_path)?;
            if clone.remote_name != remote_name {
                bail!(
                    "clone at {clone_path} belongs to remote '{}', not '{remote_name}'",
                    clone.remote_name
                );
            }
            if session::tmux_available() && session::exists(&session::session_name(&donor))? {
                bail!("workspace '{donor}' still has a live session; stop it first");
            }
            cfg.free_clone(&clone_path)?;
            cfg.workspace_mut(&donor)?.clone_path = None;
            progress(&format!("took clone {clone_path} from workspace '{donor}'"));
            Ok(clone_path)
        }
    }
}

/// Clones the remote into the next numbered directory under its clone base
/// and registers the result in the pool.
fn make_clone(cfg: &mut Config, remote_name: &str) -> Result<String> {
    let remote = cfg.remote(remote_name)?.clone();
    let base = expand_tilde(&remote.clone_base_dir);
    std::fs::create_dir_all(&base)
        .with_context(|| format!("failed to create {}", base.display()))?;
    let ordinal = cfg.next_clone_ordinal(remote_name);
    let dest = base.join(ordinal.to_string());
    if dest.exists() {
        bail!(
            "{} already exists but is not in the pool; import it with `paddock import-clone`",
            dest.display()
        );
    }

    progress(&format!("cloning {} into {}", remote.url, dest.display()));
    git::clone(&remote.url, &dest)?;

    let dest_str = path_str(&dest)?;
    cfg.add_clone(&dest_str, remote_name)?;
    match git::current_branch(&dest) {
        Ok(branch) => {
            if let Some(record) = cfg.clones.get_mut(&dest_str) {
                record.current_branch = branch;
            }
        }
        Err(err) => progress(&format!("could not read clone branch: {err:#}")),
    }
    Ok(dest_str)
}

// Start / stop

fn cmd_start(name: &str) -> Result<()> {
    if !session::tmux_available() {
        bail!("tmux is not installed or not on PATH");
    }

    let session_id;
    let ws_dir;
    {
        let _guard = lock_config()?;
        let mut cfg = Config::load()?;
        let ws = cfg.workspace(name)?.clone();
        if ws.status == WorkspaceStatus::Archived {
            bail!("workspace '{name}' is archived");
        }
        let repo_dir = ws.repo_dir().to_string();
        if repo_dir.is_empty() {
            bail!("workspace '{name}' has no repository; recreate it with --remote or --path");
        }

        let dirs = workspace_dirs(&cfg);
        ws_dir = dirs.create(name)?;

        session_id = session::session_name(name);
        let exists = session::exists(&session_id)?;

        // A live session means the lock holder is this workspace's own
        // session and re-attaching is fine. Without a session, a held lock
        // belongs to another process mid-start.
        if !exists && cfg.settings.require_session_lock {
            let check = lock::check_lock(&ws_dir)?;
            if check.held {
                bail!(
                    "workspace '{name}' is already being started elsewhere (pid {})",
                    check.pid
                );
            }
            if check.pid != 0 {
                progress(&format!("removing stale session lock (pid {})", check.pid));
                lock::remove_lock(&ws_dir)?;
            }
        }

        // Re-assert clone ownership; fails if an idle period let another
        // workspace take the clone.
        if let Some(clone_path) = ws.clone_path.clone()
            && cfg.clones.contains_key(&clone_path)
        {
            cfg.assign_clone(&clone_path, name)?;
        }

        if !exists {
            progress(&format!("creating session {session_id}"));
            session::create(&session_id, Path::new(&repo_dir))?;
            session::set_status_line(&session_id, &format!(" [{name}] "))?;
            template::generate_onboarding(name, &ws_dir, Path::new(&repo_dir))?;
            if cfg.settings.auto_start_agent {
                session::send_input(&session_id, &cfg.settings.agent_command)?;
            }
        }

        lock::create_lock(&ws_dir, std::process::id())?;
        cfg.update_workspace_status(name, WorkspaceStatus::Active, std::process::id())?;
        cfg.save()?;

        println!("Workspace: {name}");
        println!("Summary:   {}", dirs.summary(name));
        let continuation = dirs.continuation(name);
        if !continuation.is_empty() {
            println!("\nContinue from:\n{continuation}");
        }
    }

    // Blocks until the user detaches; the config lock is not held here.
    let attach_result = session::attach(&session_id);

    {
        let _guard = lock_config()?;
        let mut cfg = Config::load()?;
        lock::remove_lock(&ws_dir)?;
        if cfg.workspaces.contains_key(name) {
            cfg.update_workspace_status(name, WorkspaceStatus::Idle, 0)?;
            cfg.save()?;
        }
    }

    attach_result
}

fn cmd_stop(name: &str) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;
    if cfg.workspace(name)?.status == WorkspaceStatus::Archived {
        bail!("workspace '{name}' is archived");
    }

    if session::tmux_available() {
        let session_id = session::session_name(name);
        if session::exists(&session_id)? {
            progress(&format!("killing session {session_id}"));
            session::kill(&session_id)?;
        } else {
            progress(&format!("no live session for workspace '{name}'"));
        }
    }

    let dirs = workspace_dirs(&cfg);
    if dirs.exists(name) {
        lock::remove_lock(&dirs.path(name))?;
    }

    release_workspace(&mut cfg, name)?;
    cfg.save()?;

    println!("Stopped workspace '{name}'; its clone is free for other workspaces");
    println!("Resume with: paddock start {name}");
    Ok(())
}

/// Frees the workspace's clone and marks it idle. The workspace keeps its
/// clone path so a later start can re-assert ownership, which fails only
/// if another workspace claimed the clone in between. Idempotent. Only a
/// clone this workspace still owns is freed; one reassigned while the
/// workspace sat idle belongs to its new owner and is left alone.
pub(crate) fn release_workspace(cfg: &mut Config, name: &str) -> Result<()> {
    let ws = cfg.workspace(name)?;
    if ws.status == WorkspaceStatus::Archived {
        bail!("workspace '{name}' is archived");
    }
    if let Some(clone_path) = ws.clone_path.clone()
        && cfg
            .clones
            .get(&clone_path)
            .is_some_and(|clone| clone.in_use_by == name)
    {
        cfg.free_clone(&clone_path)?;
    }
    cfg.update_workspace_status(name, WorkspaceStatus::Idle, 0)?;
    Ok(())
}

// Archive / rename

fn cmd_archive(name: &str) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;
    let ws = cfg.workspace(name)?.clone();
    if ws.status == WorkspaceStatus::Active {
        bail!("workspace '{name}' is active; stop it before archiving");
    }
    if session::tmux_available() && session::exists(&session::session_name(name))? {
        bail!("workspace '{name}' still has a live session; stop it before archiving");
    }

    let dirs = workspace_dirs(&cfg);
    let archived_to = dirs.archive(name)?;

    let repo_dir = ws.repo_dir();
    if !repo_dir.is_empty()
        && let Err(err) = template::remove_onboarding(Path::new(repo_dir))
    {
        progress(&format!("could not remove onboarding document: {err:#}"));
    }

    archive_workspace(&mut cfg, name)?;
    cfg.save()?;

    println!("Archived workspace '{name}'");
    println!("  Notes moved to {}", archived_to.display());
    Ok(())
}

/// Config-side half of archiving: refuses active workspaces, frees the
/// clone and flips the status. Directory moves are the caller's job.
pub(crate) fn archive_workspace(cfg: &mut Config, name: &str) -> Result<()> {
    let ws = cfg.workspace(name)?;
    if ws.status == WorkspaceStatus::Active {
        bail!("workspace '{name}' is active; stop it before archiving");
    }
    if let Some(clone_path) = ws.clone_path.clone()
        && cfg
            .clones
            .get(&clone_path)
            .is_some_and(|clone| clone.in_use_by == name)
        && let Err(err) = cfg.free_clone(&clone_path)
    {
        progress(&format!("could not free clone: {err}"));
    }
    cfg.update_workspace_status(name, WorkspaceStatus::Archived, 0)?;
    Ok(())
}

fn cmd_rename(old: &str, new: &str) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;
    cfg.workspace(old)?;
    validate_workspace_name(new)?;
    if cfg.workspaces.contains_key(new) {
        return Err(PoolError::WorkspaceExists(new.to_string()).into());
    }
    let dirs = workspace_dirs(&cfg);
    if dirs.exists(new) {
        bail!(
            "workspace directory {} already exists",
            dirs.path(new).display()
        );
    }

    let old_session = session::session_name(old);
    let new_session = session::session_name(new);
    let session_live = session::tmux_available() && session::exists(&old_session)?;
    if session_live {
        session::rename(&old_session, &new_session)?;
    }

    if let Err(err) = dirs.rename(old, new) {
        // Undo the session rename so the name stays consistent with the
        // config we are about to leave untouched.
        if session_live && let Err(undo_err) = session::rename(&new_session, &old_session) {
            progress(&format!("could not undo session rename: {undo_err:#}"));
        }
        return Err(err);
    }

    cfg.rename_workspace(old, new)?;

    let ws = cfg.workspace(new)?.clone();
    let repo_dir = ws.repo_dir();
    if !repo_dir.is_empty() && template::has_onboarding(Path::new(repo_dir)) {
        // Regenerate so the onboarding document points at the moved notes.
        if let Err(err) = template::generate_onboarding(new, &dirs.path(new), Path::new(repo_dir)) {
            progress(&format!("could not refresh onboarding document: {err:#}"));
        }
    }

    cfg.save()?;
    println!("Renamed workspace '{old}' to '{new}'");
    Ok(())
}

// Inspection

fn cmd_list(include_archived: bool) -> Result<()> {
    let cfg = Config::load()?;
    if cfg.workspaces.is_empty() {
        println!("No workspaces. Create one with: paddock create <name>");
        return Ok(());
    }

    // One list-sessions call up front; per-workspace state queries only
    // for sessions that actually exist.
    let live_sessions = if session::tmux_available() {
        session::list()?
    } else {
        Vec::new()
    };
    let mut rows: Vec<&Workspace> = cfg
        .workspaces
        .values()
        .filter(|ws| include_archived || ws.status != WorkspaceStatus::Archived)
        .collect();
    rows.sort_by(|a, b| b.last_active.cmp(&a.last_active));

    println!(
        "{:<20} {:<10} {:<14} {}",
        "NAME", "STATUS", "LAST ACTIVE", "REPO"
    );
    for ws in rows {
        let session_id = session::session_name(&ws.name);
        let live = if live_sessions.contains(&session_id) {
            session::state(&session_id)?
        } else {
            SessionState::None
        };
        let status = session::effective_status(ws.status, live);
        println!(
            "{:<20} {:<10} {:<14} {}",
            ws.name,
            status.to_string(),
            format_time_ago(ws.last_active),
            truncate(ws.repo_dir(), LIST_PATH_MAX_CHARS),
        );
    }
    Ok(())
}

fn cmd_info(name: &str) -> Result<()> {
    let cfg = Config::load()?;
    let ws = cfg.workspace(name)?;
    let dirs = workspace_dirs(&cfg);

    let live = if session::tmux_available() {
        session::state(&session::session_name(name))?
    } else {
        SessionState::None
    };
    let status = session::effective_status(ws.status, live);

    println!("Workspace:    {name}");
    println!("Status:       {status} (session {live})");
    println!(
        "Created:      {} ({})",
        ws.created_at.format("%Y-%m-%d %H:%M UTC"),
        format_time_ago(ws.created_at)
    );
    println!(
        "Last active:  {} ({})",
        ws.last_active.format("%Y-%m-%d %H:%M UTC"),
        format_time_ago(ws.last_active)
    );
    match &ws.clone_path {
        Some(clone_path) => {
            println!("Clone:        {clone_path}");
            if let Ok(clone) = cfg.clone_record(clone_path) {
                println!("Remote:       {}", clone.remote_name);
                if !clone.current_branch.is_empty() {
                    println!("Branch:       {}", clone.current_branch);
                }
            }
        }
        None => {
            if !ws.repo_path.is_empty() {
                println!("Repository:   {} (unmanaged)", ws.repo_path);
            } else {
                println!("Repository:   none");
            }
        }
    }
    println!("Notes:        {}", dirs.path(name).display());

    if dirs.exists(name) {
        let check = lock::check_lock(&dirs.path(name))?;
        if check.held {
            println!("Session lock: held by pid {}", check.pid);
        } else if check.pid != 0 {
            println!("Session lock: stale (pid {})", check.pid);
        }
        println!("\nSummary:\n  {}", dirs.summary(name));
        let continuation = dirs.continuation(name);
        if !continuation.is_empty() {
            println!("\nContinue from:\n{continuation}");
        }
        println!("\nContext:\n{}", dirs.context_preview(name));
    }
    Ok(())
}

/// Prints a machine-readable marker line so a shell wrapper can `cd` into
/// the workspace's repository. Nothing else goes to stdout.
fn cmd_cd(name: &str) -> Result<()> {
    let cfg = Config::load()?;
    let ws = cfg.workspace(name)?;
    let repo_dir = ws.repo_dir();
    if repo_dir.is_empty() {
        bail!("workspace '{name}' has no repository");
    }
    println!("CD:{repo_dir}");
    Ok(())
}

// Remotes and clone pool

fn cmd_add_remote(name: &str, url: &str, clone_dir: &str) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;

    let base = absolutize(clone_dir)?;
    std::fs::create_dir_all(&base)
        .with_context(|| format!("failed to create clone directory {}", base.display()))?;

    cfg.add_remote(name, url, &path_str(&base)?)?;
    cfg.save()?;

    println!("Registered remote '{name}'");
    println!("  URL:       {url}");
    println!("  Clone dir: {}", base.display());
    println!("\nNext steps:");
    println!("  paddock import-clone {name} <path>   # reuse an existing clone");
    println!("  paddock new-clone {name}             # make a fresh clone");
    Ok(())
}

fn cmd_remotes() -> Result<()> {
    let cfg = Config::load()?;
    if cfg.remotes.is_empty() {
        println!("No remotes. Register one with: paddock add-remote <name> <url> --clone-dir <dir>");
        return Ok(());
    }
    println!(
        "{:<15} {:<50} {:<8} {}",
        "NAME", "URL", "CLONES", "FREE"
    );
    for remote in cfg.remotes.values() {
        let clones = cfg.clones_for_remote(&remote.name);
        let free = clones
            .iter()
            .filter(|clone| clone.in_use_by.is_empty())
            .count();
        println!(
            "{:<15} {:<50} {:<8} {}",
            remote.name,
            truncate(&remote.url, LIST_URL_MAX_CHARS),
            clones.len(),
            free,
        );
    }
    Ok(())
}

fn cmd_new_clone(remote: &str) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;
    let clone_path = make_clone(&mut cfg, remote)?;
    cfg.save()?;
    println!("Added clone {clone_path} to the pool");
    Ok(())
}

fn cmd_import_clone(remote: &str, path: &str, force: bool) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;
    let remote_record = cfg.remote(remote)?.clone();

    let repo = absolutize(path)?;
    if !git::is_repository(&repo) {
        bail!("{} is not a git repository", repo.display());
    }
    let origin = git::remote_url(&repo)?;
    if origin != remote_record.url && !force {
        bail!(
            "origin URL {origin} does not match remote '{remote}' ({}); pass --force to import anyway",
            remote_record.url
        );
    }

    let repo_str = path_str(&repo)?;
    cfg.add_clone(&repo_str, remote)?;
    match git::current_branch(&repo) {
        Ok(branch) => {
            if let Some(record) = cfg.clones.get_mut(&repo_str) {
                record.current_branch = branch;
            }
        }
        Err(err) => progress(&format!("could not read clone branch: {err:#}")),
    }
    cfg.save()?;

    println!("Imported clone {repo_str} into the pool");
    Ok(())
}

fn cmd_clones(remote: Option<&str>) -> Result<()> {
    let _guard = lock_config()?;
    let mut cfg = Config::load()?;
    if let Some(remote) = remote {
        cfg.remote(remote)?;
    }

    let paths: Vec<String> = cfg
        .clones
        .values()
        .filter(|clone| remote.is_none_or(|name| clone.remote_name == name))
        .map(|clone| clone.path.clone())
        .collect();
    if paths.is_empty() {
        println!("No clones in the pool. Add one with: paddock new-clone <remote>");
        return Ok(());
    }

    // Branches drift underneath us; refresh the cache while we are here.
    let mut refreshed = false;
    for path in &paths {
        let dir = Path::new(path);
        if !dir.is_dir() {
            continue;
        }
        if let Ok(branch) = git::current_branch(dir)
            && let Some(record) = cfg.clones.get_mut(path)
            && record.current_branch != branch
        {
            record.current_branch = branch;
            refreshed = true;
        }
    }
    if refreshed {
        cfg.save()?;
    }

    println!(
        "{:<50} {:<12} {:<20} {}",
        "PATH", "REMOTE", "BRANCH", "IN USE BY"
    );
    for path in &paths {
        let clone = cfg.clone_record(path)?;
        let owner = if clone.in_use_by.is_empty() {
            "(free)"
        } else {
            &clone.in_use_by
        };
        println!(
            "{:<50} {:<12} {:<20} {}",
            truncate(&clone.path, LIST_PATH_MAX_CHARS),
            clone.remote_name,
            clone.current_branch,
            owner,
        );
    }
    Ok(())
}

// Formatting helpers

pub(crate) fn format_time_ago(then: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", elapsed.num_days())
}

pub(crate) fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value
        .chars()
        .take(max_chars.saturating_sub(TRUNCATE_ELLIPSIS_CHARS))
        .collect();
    format!("{kept}...")
}
