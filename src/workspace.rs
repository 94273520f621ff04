//! On-disk workspace notes directories: one directory per workspace under
//! the configured workspace root, holding the context/decisions/continuation
//! note files, a research subdirectory and the session lock artifact.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    ARCHIVE_DIR_NAME, CONTEXT_PREVIEW_MAX_CHARS, NOTE_FILES, RESEARCH_DIR_NAME,
};

pub(crate) struct WorkspaceDirs {
    base: PathBuf,
}

impl WorkspaceDirs {
    pub(crate) fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.path(name).is_dir()
    }

    /// Creates the notes directory, the research subdirectory and the empty
    /// note files. Idempotent over an existing directory.
    pub(crate) fn create(&self, name: &str) -> Result<PathBuf> {
        let dir = self.path(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create workspace directory {}", dir.display()))?;
        let research = dir.join(RESEARCH_DIR_NAME);
        fs::create_dir_all(&research)
            .with_context(|| format!("failed to create {}", research.display()))?;
        for file in NOTE_FILES {
            let path = dir.join(file);
            if !path.exists() {
                fs::write(&path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }
        Ok(dir)
    }

    /// Rollback helper for a create that failed partway.
    pub(crate) fn remove(&self, name: &str) -> Result<()> {
        let dir = self.path(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
        }
        Ok(())
    }

    pub(crate) fn rename(&self, old: &str, new: &str) -> Result<()> {
        let from = self.path(old);
        let to = self.path(new);
        fs::rename(&from, &to).with_context(|| {
            format!(
                "failed to rename workspace directory {} to {}",
                from.display(),
                to.display()
            )
        })
    }

    /// Moves the directory aside into the archive area; archived
    /// workspaces keep their notes but leave the active namespace.
    pub(crate) fn archive(&self, name: &str) -> Result<PathBuf> {
        let archive_dir = self.base.join(ARCHIVE_DIR_NAME);
        fs::create_dir_all(&archive_dir)
            .with_context(|| format!("failed to create {}", archive_dir.display()))?;
        let from = self.path(name);
        let to = archive_dir.join(name);
        fs::rename(&from, &to).with_context(|| {
            format!(
                "failed to archive workspace directory {} to {}",
                from.display(),
                to.display()
            )
        })?;
        Ok(to)
    }

    pub(crate) fn summary(&self, name: &str) -> String {
        match read_note(&self.path(name).join("summary.txt")) {
            Some(text) => text,
            None => "(no summary)".to_string(),
        }
    }

    pub(crate) fn write_summary(&self, name: &str, summary: &str) -> Result<()> {
        let path = self.path(name).join("summary.txt");
        fs::write(&path, summary)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub(crate) fn continuation(&self, name: &str) -> String {
        read_note(&self.path(name).join("continuation.md")).unwrap_or_default()
    }

    pub(crate) fn context_preview(&self, name: &str) -> String {
        let Some(text) = read_note(&self.path(name).join("context.md")) else {
            return "(no context yet)".to_string();
        };
        if text.chars().count() > CONTEXT_PREVIEW_MAX_CHARS {
            let head: String = text.chars().take(CONTEXT_PREVIEW_MAX_CHARS).collect();
            format!("{head}...")
        } else {
            text
        }
    }
}

fn read_note(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
