//! Onboarding document dropped into a repository when a workspace starts.
//! It tells the agent running inside the session where the workspace notes
//! live and how to keep them current.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::constants::{ONBOARDING_DIR_NAME, ONBOARDING_FILE_NAME};

pub(crate) fn generate_onboarding(workspace: &str, workspace_dir: &Path, repo: &Path) -> Result<()> {
    let dir = repo.join(ONBOARDING_DIR_NAME);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(ONBOARDING_FILE_NAME);
    let content = onboarding_content(workspace, workspace_dir);
    fs::write(&path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    ensure_gitignore(repo)?;
    Ok(())
}

pub(crate) fn has_onboarding(repo: &Path) -> bool {
    repo.join(ONBOARDING_DIR_NAME)
        .join(ONBOARDING_FILE_NAME)
        .is_file()
}

/// Removing the document from a repo that never had one is fine.
pub(crate) fn remove_onboarding(repo: &Path) -> Result<()> {
    let path = repo.join(ONBOARDING_DIR_NAME).join(ONBOARDING_FILE_NAME);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Appends the onboarding directory to the repo's .gitignore unless an
/// entry for it is already present. Creates the file when missing.
pub(crate) fn ensure_gitignore(repo: &Path) -> Result<()> {
    let entry = format!("{ONBOARDING_DIR_NAME}/");
    let path = repo.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let already_ignored = existing
        .lines()
        .map(str::trim)
        .any(|line| line == entry || line == ONBOARDING_DIR_NAME);
    if already_ignored {
        return Ok(());
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&entry);
    updated.push('\n');
    fs::write(&path, updated).with_context(|| format!("failed to update {}", path.display()))
}

fn onboarding_content(workspace: &str, workspace_dir: &Path) -> String {
    let dir = workspace_dir.display();
    format!(
        "# Workspace: {workspace}\n\
         \n\
         This repository is checked out for the `{workspace}` workspace.\n\
         Long-lived notes for this work live outside the repository at:\n\
         \n\
             {dir}\n\
         \n\
         ## Context protocol\n\
         \n\
         Read these files before doing anything else:\n\
         \n\
         - `{dir}/context.md` describes the task and its background.\n\
         - `{dir}/decisions.md` records decisions already made. Do not\n\
           relitigate them; append new decisions as you make them.\n\
         - `{dir}/continuation.md` says where the last session left off.\n\
         \n\
         Before the session ends, update `continuation.md` with the current\n\
         state and the concrete next step, and keep a one-line description\n\
         of the work in `{dir}/summary.txt`.\n\
         \n\
         Put research output, scratch files and anything else that should\n\
         outlive this checkout under `{dir}/research/`.\n"
    )
}
