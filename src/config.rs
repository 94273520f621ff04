use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_LOCK_FILE_NAME, DEFAULT_AGENT_COMMAND,
    WORKSPACES_DIR_NAME,
};
use crate::error::PoolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WorkspaceStatus {
    Active,
    Idle,
    Archived,
}

impl std::fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Idle => write!(f, "idle"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// A named upstream repository plus the directory its numbered clones live
/// under. Remotes are permanent: there is deliberately no removal path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Remote {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) clone_base_dir: String,
}

/// One on-disk working copy, ownable by at most one workspace at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CloneRecord {
    pub(crate) path: String,
    pub(crate) remote_name: String,
    pub(crate) created_at: DateTime<Utc>,
    /// Workspace name, empty when the clone is free.
    #[serde(default)]
    pub(crate) in_use_by: String,
    /// Cached, refreshed opportunistically when the clone is listed.
    #[serde(default)]
    pub(crate) current_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Workspace {
    pub(crate) name: String,
    /// Absent for unmanaged workspaces registered against a raw path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) clone_path: Option<String>,
    /// Raw repository path for unmanaged workspaces.
    #[serde(default)]
    pub(crate) repo_path: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_active: DateTime<Utc>,
    pub(crate) status: WorkspaceStatus,
    #[serde(default)]
    pub(crate) session_pid: u32,
}

impl Workspace {
    /// The repository directory this workspace works in, managed or not.
    pub(crate) fn repo_dir(&self) -> &str {
        match &self.clone_path {
            Some(path) => path,
            None => &self.repo_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Settings {
    pub(crate) workspace_dir: String,
    pub(crate) auto_start_agent: bool,
    pub(crate) require_session_lock: bool,
    pub(crate) agent_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            workspace_dir: home
                .join(CONFIG_DIR_NAME)
                .join(WORKSPACES_DIR_NAME)
                .to_string_lossy()
                .to_string(),
            auto_start_agent: true,
            require_session_lock: true,
            agent_command: DEFAULT_AGENT_COMMAND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) workspaces: BTreeMap<String, Workspace>,
    #[serde(default)]
    pub(crate) remotes: BTreeMap<String, Remote>,
    /// Keyed by absolute clone path.
    #[serde(default)]
    pub(crate) clones: BTreeMap<String, CloneRecord>,
    #[serde(default)]
    pub(crate) settings: Settings,
}

pub(crate) fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("failed to determine home directory")?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub(crate) fn config_lock_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("failed to determine home directory")?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_LOCK_FILE_NAME))
}

impl Config {
    pub(crate) fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Absent file is a fresh install, not an error. An unparseable file is
    /// surfaced as `CorruptConfig` and never replaced with defaults.
    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config file {}", path.display()));
            }
        };

        let config: Config = serde_json::from_str(&raw).map_err(|source| PoolError::CorruptConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub(crate) fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub(crate) fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, data)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    // Workspaces

    pub(crate) fn workspace(&self, name: &str) -> Result<&Workspace, PoolError> {
        self.workspaces
            .get(name)
            .ok_or_else(|| PoolError::WorkspaceNotFound(name.to_string()))
    }

    pub(crate) fn workspace_mut(&mut self, name: &str) -> Result<&mut Workspace, PoolError> {
        self.workspaces
            .get_mut(name)
            .ok_or_else(|| PoolError::WorkspaceNotFound(name.to_string()))
    }

    pub(crate) fn add_workspace(&mut self, name: &str, repo_path: &str) -> Result<(), PoolError> {
        validate_workspace_name(name)?;
        if self.workspaces.contains_key(name) {
            return Err(PoolError::WorkspaceExists(name.to_string()));
        }
        let now = Utc::now();
        self.workspaces.insert(
            name.to_string(),
            Workspace {
                name: name.to_string(),
                clone_path: None,
                repo_path: repo_path.to_string(),
                created_at: now,
                last_active: now,
                status: WorkspaceStatus::Idle,
                session_pid: 0,
            },
        );
        Ok(())
    }

    pub(crate) fn update_workspace_status(
        &mut self,
        name: &str,
        status: WorkspaceStatus,
        pid: u32,
    ) -> Result<(), PoolError> {
        let ws = self.workspace_mut(name)?;
        ws.status = status;
        ws.last_active = Utc::now();
        ws.session_pid = pid;
        Ok(())
    }

    /// Re-keys a workspace and repoints every clone back-reference. The
    /// caller is responsible for renaming the on-disk directory and the
    /// live session.
    pub(crate) fn rename_workspace(&mut self, old: &str, new: &str) -> Result<(), PoolError> {
        validate_workspace_name(new)?;
        if self.workspaces.contains_key(new) {
            return Err(PoolError::WorkspaceExists(new.to_string()));
        }
        let mut ws = self
            .workspaces
            .remove(old)
            .ok_or_else(|| PoolError::WorkspaceNotFound(old.to_string()))?;
        ws.name = new.to_string();
        self.workspaces.insert(new.to_string(), ws);

        for clone in self.clones.values_mut() {
            if clone.in_use_by == old {
                clone.in_use_by = new.to_string();
            }
        }
        Ok(())
    }

    // Remotes

    pub(crate) fn remote(&self, name: &str) -> Result<&Remote, PoolError> {
        self.remotes
            .get(name)
            .ok_or_else(|| PoolError::RemoteNotFound(name.to_string()))
    }

    pub(crate) fn add_remote(
        &mut self,
        name: &str,
        url: &str,
        clone_base_dir: &str,
    ) -> Result<(), PoolError> {
        if self.remotes.contains_key(name) {
            return Err(PoolError::RemoteExists(name.to_string()));
        }
        self.remotes.insert(
            name.to_string(),
            Remote {
                name: name.to_string(),
                url: url.to_string(),
                clone_base_dir: clone_base_dir.to_string(),
            },
        );
        Ok(())
    }

    // Clone pool

    pub(crate) fn clone_record(&self, path: &str) -> Result<&CloneRecord, PoolError> {
        self.clones
            .get(path)
            .ok_or_else(|| PoolError::CloneNotFound(path.to_string()))
    }

    pub(crate) fn add_clone(&mut self, path: &str, remote_name: &str) -> Result<(), PoolError> {
        if self.clones.contains_key(path) {
            return Err(PoolError::CloneExists(path.to_string()));
        }
        self.clones.insert(
            path.to_string(),
            CloneRecord {
                path: path.to_string(),
                remote_name: remote_name.to_string(),
                created_at: Utc::now(),
                in_use_by: String::new(),
                current_branch: String::new(),
            },
        );
        Ok(())
    }

    pub(crate) fn clones_for_remote(&self, remote_name: &str) -> Vec<&CloneRecord> {
        self.clones
            .values()
            .filter(|clone| clone.remote_name == remote_name)
            .collect()
    }

    pub(crate) fn find_free_clone(&self, remote_name: &str) -> Option<&CloneRecord> {
        self.clones
            .values()
            .find(|clone| clone.remote_name == remote_name && clone.in_use_by.is_empty())
    }

    /// Clones whose owning workspace exists and is idle, i.e. reclaimable
    /// without disturbing a live session. Clones owned by an active or a
    /// missing workspace are excluded.
    pub(crate) fn find_idle_clones(&self, remote_name: &str) -> Vec<&CloneRecord> {
        self.clones
            .values()
            .filter(|clone| clone.remote_name == remote_name && !clone.in_use_by.is_empty())
            .filter(|clone| {
                self.workspaces
                    .get(&clone.in_use_by)
                    .is_some_and(|ws| ws.status == WorkspaceStatus::Idle)
            })
            .collect()
    }

    pub(crate) fn assign_clone(&mut self, path: &str, workspace: &str) -> Result<(), PoolError> {
        let clone = self
            .clones
            .get_mut(path)
            .ok_or_else(|| PoolError::CloneNotFound(path.to_string()))?;
        if !clone.in_use_by.is_empty() && clone.in_use_by != workspace {
            return Err(PoolError::CloneInUse(clone.in_use_by.clone()));
        }
        clone.in_use_by = workspace.to_string();
        Ok(())
    }

    pub(crate) fn free_clone(&mut self, path: &str) -> Result<(), PoolError> {
        let clone = self
            .clones
            .get_mut(path)
            .ok_or_else(|| PoolError::CloneNotFound(path.to_string()))?;
        clone.in_use_by.clear();
        Ok(())
    }

    /// Ordinals only grow: gaps left by renumbered or abandoned clones are
    /// never refilled. Non-numeric final path segments count as ordinal 0.
    pub(crate) fn next_clone_ordinal(&self, remote_name: &str) -> u32 {
        let max = self
            .clones
            .values()
            .filter(|clone| clone.remote_name == remote_name)
            .filter_map(|clone| {
                Path::new(&clone.path)
                    .file_name()
                    .and_then(|segment| segment.to_str())
                    .and_then(|segment| segment.parse::<u32>().ok())
            })
            .max()
            .unwrap_or(0);
        max + 1
    }
}

/// Names become directory names, session names and branch-adjacent labels,
/// so anything path- or shell-hostile is rejected outright rather than
/// rewritten.
pub(crate) fn validate_workspace_name(name: &str) -> Result<(), PoolError> {
    let invalid = |reason: &str| PoolError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }
    const SHELL_HOSTILE: [char; 7] = [':', '*', '?', '"', '<', '>', '|'];
    if name.contains(SHELL_HOSTILE) {
        return Err(invalid("must not contain shell metacharacters"));
    }
    if name.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    Ok(())
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Serializes whole load-mutate-save cycles across processes. Held for the
/// duration of one command's config transaction, never across a blocking
/// session attach. The OS drops the flock if the holder dies.
#[derive(Debug)]
pub(crate) struct ConfigLock {
    _file: File,
}

impl ConfigLock {
    pub(crate) fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open config lock {}", path.display()))?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(ConfigLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => {
                    bail!(
                        "another paddock command holds the config lock at {}",
                        path.display()
                    );
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}
