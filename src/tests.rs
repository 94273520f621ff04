use crate::commands::{
    archive_workspace, format_time_ago, materialize_workspace, release_workspace, truncate,
};
use crate::config::{Config, ConfigLock, WorkspaceStatus, validate_workspace_name};
use crate::error::PoolError;
use crate::lock::{check_lock, check_lock_with, create_lock, process_exists, remove_lock};
use crate::session::{SessionState, effective_status, parse_session_list, parse_state_for};
use crate::template::{ensure_gitignore, generate_onboarding, has_onboarding, remove_onboarding};
use crate::workspace::WorkspaceDirs;
use chrono::{Duration, Utc};
use std::fs;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

fn pool_config() -> Config {
    let mut cfg = Config::default();
    cfg.add_remote("origin", "git@example.com:acme/repo.git", "/tmp/clones")
        .expect("add remote");
    cfg
}

fn config_with_clone(clone_path: &str) -> Config {
    let mut cfg = pool_config();
    cfg.add_clone(clone_path, "origin").expect("add clone");
    cfg
}

fn add_managed_workspace(cfg: &mut Config, name: &str, clone_path: &str) {
    cfg.add_workspace(name, "").expect("add workspace");
    cfg.assign_clone(clone_path, name).expect("assign clone");
    cfg.workspace_mut(name).expect("workspace").clone_path = Some(clone_path.to_string());
}

#[test]
fn workspace_name_validation_rejects_hostile_names() {
    for name in ["", "my workspace", "a/b", "a\\b", "a:b", "../x", "a..b", "a\tb"] {
        assert!(
            validate_workspace_name(name).is_err(),
            "expected {name:?} to be rejected"
        );
    }
}

#[test]
fn workspace_name_validation_accepts_reasonable_names() {
    for name in ["feature-123_x", "fix_auth", "spike.2024", "UPPER"] {
        assert!(
            validate_workspace_name(name).is_ok(),
            "expected {name:?} to be accepted"
        );
    }
}

#[test]
fn clone_has_single_owner() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    cfg.add_workspace("alpha", "").expect("add alpha");
    cfg.add_workspace("beta", "").expect("add beta");

    cfg.assign_clone("/tmp/clones/1", "alpha").expect("first assign");
    let err = cfg.assign_clone("/tmp/clones/1", "beta").unwrap_err();
    assert!(matches!(err, PoolError::CloneInUse(owner) if owner == "alpha"));

    // Re-asserting ownership by the same workspace is not a conflict.
    cfg.assign_clone("/tmp/clones/1", "alpha").expect("idempotent assign");

    cfg.free_clone("/tmp/clones/1").expect("free");
    cfg.assign_clone("/tmp/clones/1", "beta").expect("reassign after free");
}

#[test]
fn freeing_unknown_clone_fails() {
    let mut cfg = pool_config();
    let err = cfg.free_clone("/nowhere").unwrap_err();
    assert!(matches!(err, PoolError::CloneNotFound(_)));
}

#[test]
fn duplicate_clone_registration_fails() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    let err = cfg.add_clone("/tmp/clones/1", "origin").unwrap_err();
    assert!(matches!(err, PoolError::CloneExists(_)));
}

#[test]
fn clone_ordinals_only_grow() {
    let mut cfg = pool_config();
    assert_eq!(cfg.next_clone_ordinal("origin"), 1);

    cfg.add_clone("/tmp/clones/1", "origin").expect("add 1");
    cfg.add_clone("/tmp/clones/3", "origin").expect("add 3");
    // Non-numeric final segments do not participate in numbering.
    cfg.add_clone("/tmp/clones/imported-copy", "origin").expect("add named");
    assert_eq!(cfg.next_clone_ordinal("origin"), 4);

    // Freeing a clone does not make its number reusable.
    cfg.add_workspace("alpha", "").expect("add alpha");
    cfg.assign_clone("/tmp/clones/1", "alpha").expect("assign");
    cfg.free_clone("/tmp/clones/1").expect("free");
    assert_eq!(cfg.next_clone_ordinal("origin"), 4);
}

#[test]
fn ordinals_are_scoped_per_remote() {
    let mut cfg = pool_config();
    cfg.add_remote("fork", "git@example.com:acme/fork.git", "/tmp/forks")
        .expect("add fork");
    cfg.add_clone("/tmp/clones/7", "origin").expect("add origin clone");
    assert_eq!(cfg.next_clone_ordinal("fork"), 1);
    assert_eq!(cfg.next_clone_ordinal("origin"), 8);
}

#[test]
fn find_free_clone_skips_owned_clones() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    cfg.add_clone("/tmp/clones/2", "origin").expect("add 2");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");

    let free = cfg.find_free_clone("origin").expect("free clone");
    assert_eq!(free.path, "/tmp/clones/2");

    cfg.add_workspace("beta", "").expect("add beta");
    cfg.assign_clone("/tmp/clones/2", "beta").expect("assign 2");
    assert!(cfg.find_free_clone("origin").is_none());
}

#[test]
fn idle_clones_exclude_active_and_missing_owners() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    cfg.add_clone("/tmp/clones/2", "origin").expect("add 2");
    cfg.add_clone("/tmp/clones/3", "origin").expect("add 3");

    add_managed_workspace(&mut cfg, "idle-ws", "/tmp/clones/1");
    add_managed_workspace(&mut cfg, "active-ws", "/tmp/clones/2");
    cfg.update_workspace_status("active-ws", WorkspaceStatus::Active, 42)
        .expect("set active");
    // Clone 3 is owned by a workspace that no longer exists.
    cfg.assign_clone("/tmp/clones/3", "ghost").expect("assign ghost");

    let idle = cfg.find_idle_clones("origin");
    assert_eq!(idle.len(), 1);
    assert_eq!(idle[0].path, "/tmp/clones/1");
}

#[test]
fn config_round_trips_through_disk() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("config.json");

    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");
    cfg.settings.agent_command = "claude --resume".to_string();

    cfg.save_to(&path).expect("save");
    let loaded = Config::load_from(&path).expect("load");
    assert_eq!(cfg, loaded);
}

#[test]
fn missing_config_is_a_fresh_install() {
    let tmp = TempDir::new().expect("tempdir");
    let loaded = Config::load_from(&tmp.path().join("config.json")).expect("load");
    assert_eq!(loaded, Config::default());
}

#[test]
fn corrupt_config_is_not_silently_replaced() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("config.json");
    fs::write(&path, "{ not json").expect("write");

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PoolError>(),
        Some(PoolError::CorruptConfig { .. })
    ));
}

#[test]
fn session_lock_lifecycle() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path();

    let check = check_lock(dir).expect("check absent");
    assert!(!check.held);
    assert_eq!(check.pid, 0);

    create_lock(dir, std::process::id()).expect("create");
    let check = check_lock(dir).expect("check own pid");
    assert!(check.held);
    assert_eq!(check.pid, std::process::id());

    remove_lock(dir).expect("remove");
    remove_lock(dir).expect("remove again");
    assert!(!check_lock(dir).expect("check after remove").held);
}

#[test]
fn dead_owner_makes_lock_stale_not_fatal() {
    let tmp = TempDir::new().expect("tempdir");
    create_lock(tmp.path(), 1234).expect("create");

    let check = check_lock_with(tmp.path(), |_| false).expect("check");
    assert!(!check.held);
    assert_eq!(check.pid, 1234);

    let check = check_lock_with(tmp.path(), |_| true).expect("check");
    assert!(check.held);
}

#[test]
fn garbled_lock_file_fails_loudly() {
    let tmp = TempDir::new().expect("tempdir");
    fs::write(tmp.path().join(".lock"), "not-a-pid").expect("write");

    let err = check_lock(tmp.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PoolError>(),
        Some(PoolError::CorruptLock { .. })
    ));
}

#[test]
fn process_probe_rejects_impossible_pids() {
    assert!(!process_exists(0));
    assert!(!process_exists(u32::MAX));
    assert!(process_exists(std::process::id()));
}

#[test]
fn config_lock_is_exclusive() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("config.lock");

    let guard = ConfigLock::acquire(&path, StdDuration::from_millis(50)).expect("first acquire");
    let err = ConfigLock::acquire(&path, StdDuration::from_millis(50)).unwrap_err();
    assert!(err.to_string().contains("config lock"));

    drop(guard);
    ConfigLock::acquire(&path, StdDuration::from_millis(50)).expect("acquire after release");
}

#[test]
fn releasing_a_workspace_is_idempotent() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");
    cfg.update_workspace_status("alpha", WorkspaceStatus::Active, 42)
        .expect("set active");

    release_workspace(&mut cfg, "alpha").expect("release");
    let ws = cfg.workspace("alpha").expect("workspace");
    assert_eq!(ws.status, WorkspaceStatus::Idle);
    assert_eq!(ws.session_pid, 0);
    assert!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by.is_empty());
    // The workspace keeps its clone path for the next start.
    assert_eq!(ws.clone_path.as_deref(), Some("/tmp/clones/1"));

    release_workspace(&mut cfg, "alpha").expect("release again");
    assert!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by.is_empty());
}

#[test]
fn releasing_does_not_free_a_reassigned_clone() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");

    // Stopping alpha returns the clone to the pool.
    release_workspace(&mut cfg, "alpha").expect("release alpha");

    // A new workspace claims the freed clone and goes active.
    add_managed_workspace(&mut cfg, "bravo", "/tmp/clones/1");
    cfg.update_workspace_status("bravo", WorkspaceStatus::Active, 42)
        .expect("set bravo active");

    // A second stop of alpha must not pull the clone out from under bravo.
    release_workspace(&mut cfg, "alpha").expect("release alpha again");
    assert_eq!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by, "bravo");

    // Same guard when the stale holder is archived instead of stopped.
    archive_workspace(&mut cfg, "alpha").expect("archive alpha");
    assert_eq!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by, "bravo");
}

#[test]
fn releasing_an_archived_workspace_is_refused() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");
    archive_workspace(&mut cfg, "alpha").expect("archive");

    assert!(release_workspace(&mut cfg, "alpha").is_err());
    assert_eq!(
        cfg.workspace("alpha").expect("workspace").status,
        WorkspaceStatus::Archived
    );
}

#[test]
fn archive_refuses_active_workspace() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");
    cfg.update_workspace_status("alpha", WorkspaceStatus::Active, 42)
        .expect("set active");

    assert!(archive_workspace(&mut cfg, "alpha").is_err());
    assert_eq!(
        cfg.workspace("alpha").expect("workspace").status,
        WorkspaceStatus::Active
    );
    assert_eq!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by, "alpha");
}

#[test]
fn archive_frees_clone_and_flips_status() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");

    archive_workspace(&mut cfg, "alpha").expect("archive");
    assert_eq!(
        cfg.workspace("alpha").expect("workspace").status,
        WorkspaceStatus::Archived
    );
    assert!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by.is_empty());
}

#[test]
fn rename_rekeys_workspace_and_clone_back_references() {
    let mut cfg = config_with_clone("/tmp/clones/1");
    add_managed_workspace(&mut cfg, "alpha", "/tmp/clones/1");

    cfg.rename_workspace("alpha", "bravo").expect("rename");
    assert!(cfg.workspace("alpha").is_err());
    let ws = cfg.workspace("bravo").expect("renamed workspace");
    assert_eq!(ws.name, "bravo");
    assert_eq!(cfg.clone_record("/tmp/clones/1").expect("clone").in_use_by, "bravo");
}

#[test]
fn rename_refuses_collisions_and_bad_names() {
    let mut cfg = pool_config();
    cfg.add_workspace("alpha", "").expect("add alpha");
    cfg.add_workspace("bravo", "").expect("add bravo");

    assert!(matches!(
        cfg.rename_workspace("alpha", "bravo"),
        Err(PoolError::WorkspaceExists(_))
    ));
    assert!(matches!(
        cfg.rename_workspace("alpha", "has space"),
        Err(PoolError::InvalidName { .. })
    ));
    assert!(matches!(
        cfg.rename_workspace("missing", "charlie"),
        Err(PoolError::WorkspaceNotFound(_))
    ));
}

#[test]
fn parse_state_for_handles_attached_counts() {
    let target = "paddock-ws-alpha";
    assert_eq!(parse_state_for("", target).expect("empty"), SessionState::None);
    assert_eq!(
        parse_state_for("paddock-ws-alpha:0\n", target).expect("detached"),
        SessionState::Detached
    );
    assert_eq!(
        parse_state_for("paddock-ws-alpha:3", target).expect("attached"),
        SessionState::Attached
    );
    // Unrelated sessions in the listing are skipped, not misread.
    let listing = "scratch:2\npaddock-ws-alpha:0\npaddock-ws-bravo:1\n";
    assert_eq!(
        parse_state_for(listing, target).expect("mixed listing"),
        SessionState::Detached
    );
    assert_eq!(
        parse_state_for("scratch:2\n", target).expect("absent"),
        SessionState::None
    );
    assert!(parse_state_for("no colon here", target).is_err());
    assert!(parse_state_for("paddock-ws-alpha:not-a-number", target).is_err());
}

#[test]
fn parse_session_list_drops_blank_lines() {
    let raw = "paddock-ws-alpha\n\npaddock-ws-bravo\n";
    assert_eq!(
        parse_session_list(raw),
        vec!["paddock-ws-alpha".to_string(), "paddock-ws-bravo".to_string()]
    );
    assert!(parse_session_list("").is_empty());
}

#[test]
fn effective_status_reconciles_stored_and_live_state() {
    use crate::config::WorkspaceStatus::{Active, Archived, Idle};
    use crate::session::SessionState::{Attached, Detached, None as NoSession};

    // The multiplexer wins when it disagrees with the stored status.
    assert_eq!(effective_status(Active, NoSession), Idle);
    assert_eq!(effective_status(Idle, Attached), Active);

    assert_eq!(effective_status(Active, Attached), Active);
    assert_eq!(effective_status(Active, Detached), Active);
    assert_eq!(effective_status(Idle, Detached), Idle);
    assert_eq!(effective_status(Idle, NoSession), Idle);

    // Archived is sticky regardless of live state.
    assert_eq!(effective_status(Archived, Attached), Archived);
    assert_eq!(effective_status(Archived, NoSession), Archived);
}

#[test]
fn time_ago_buckets() {
    let now = Utc::now();
    assert_eq!(format_time_ago(now), "just now");
    assert_eq!(format_time_ago(now - Duration::minutes(5)), "5m ago");
    assert_eq!(format_time_ago(now - Duration::hours(3)), "3h ago");
    assert_eq!(format_time_ago(now - Duration::days(2)), "2d ago");
}

#[test]
fn truncate_keeps_short_values_intact() {
    assert_eq!(truncate("short", 50), "short");
    let long = "x".repeat(60);
    let truncated = truncate(&long, 50);
    assert_eq!(truncated.chars().count(), 50);
    assert!(truncated.ends_with("..."));
}

#[test]
fn workspace_dirs_create_is_idempotent() {
    let tmp = TempDir::new().expect("tempdir");
    let dirs = WorkspaceDirs::new(tmp.path());

    let ws_dir = dirs.create("alpha").expect("create");
    assert!(ws_dir.join("research").is_dir());
    for file in ["context.md", "decisions.md", "continuation.md", "summary.txt"] {
        assert!(ws_dir.join(file).is_file(), "missing {file}");
    }

    fs::write(ws_dir.join("summary.txt"), "keep me").expect("write summary");
    dirs.create("alpha").expect("create again");
    assert_eq!(
        fs::read_to_string(ws_dir.join("summary.txt")).expect("read"),
        "keep me"
    );
}

#[test]
fn workspace_dirs_archive_moves_notes_aside() {
    let tmp = TempDir::new().expect("tempdir");
    let dirs = WorkspaceDirs::new(tmp.path());
    dirs.create("alpha").expect("create");

    let archived = dirs.archive("alpha").expect("archive");
    assert!(!dirs.exists("alpha"));
    assert_eq!(archived, tmp.path().join("archived").join("alpha"));
    assert!(archived.join("context.md").is_file());
}

#[test]
fn workspace_dirs_rename_moves_directory() {
    let tmp = TempDir::new().expect("tempdir");
    let dirs = WorkspaceDirs::new(tmp.path());
    dirs.create("alpha").expect("create");
    dirs.write_summary("alpha", "the work").expect("write");

    dirs.rename("alpha", "bravo").expect("rename");
    assert!(!dirs.exists("alpha"));
    assert_eq!(dirs.summary("bravo"), "the work");
}

#[test]
fn note_readers_have_sensible_fallbacks() {
    let tmp = TempDir::new().expect("tempdir");
    let dirs = WorkspaceDirs::new(tmp.path());
    dirs.create("alpha").expect("create");

    assert_eq!(dirs.summary("alpha"), "(no summary)");
    assert_eq!(dirs.continuation("alpha"), "");
    assert_eq!(dirs.context_preview("alpha"), "(no context yet)");

    dirs.write_summary("alpha", "  fix auth  ").expect("write");
    assert_eq!(dirs.summary("alpha"), "fix auth");
}

#[test]
fn context_preview_is_truncated() {
    let tmp = TempDir::new().expect("tempdir");
    let dirs = WorkspaceDirs::new(tmp.path());
    let ws_dir = dirs.create("alpha").expect("create");

    fs::write(ws_dir.join("context.md"), "y".repeat(500)).expect("write context");
    let preview = dirs.context_preview("alpha");
    assert_eq!(preview.chars().count(), 203);
    assert!(preview.ends_with("..."));
}

#[test]
fn create_materializes_notes_and_onboarding() {
    let tmp = TempDir::new().expect("tempdir");
    let repo = tmp.path().join("repo");
    fs::create_dir_all(&repo).expect("mkdir repo");
    let dirs = WorkspaceDirs::new(tmp.path().join("notes"));

    let repo_str = repo.to_str().expect("utf-8 path");
    materialize_workspace(&dirs, "alpha", Some("fix auth"), repo_str).expect("materialize");

    assert!(dirs.exists("alpha"));
    assert_eq!(dirs.summary("alpha"), "fix auth");
    // The onboarding document exists before the first start.
    assert!(has_onboarding(&repo));

    // A workspace whose checkout is gone still gets its notes directory.
    materialize_workspace(&dirs, "bravo", None, "/does/not/exist").expect("materialize bravo");
    assert!(dirs.exists("bravo"));
}

#[test]
fn onboarding_document_lifecycle() {
    let tmp = TempDir::new().expect("tempdir");
    let repo = tmp.path().join("repo");
    let notes = tmp.path().join("notes/alpha");
    fs::create_dir_all(&repo).expect("mkdir repo");
    fs::create_dir_all(&notes).expect("mkdir notes");

    // Removing before anything exists is not an error.
    remove_onboarding(&repo).expect("remove absent");
    assert!(!has_onboarding(&repo));

    generate_onboarding("alpha", &notes, &repo).expect("generate");
    assert!(has_onboarding(&repo));
    let doc = fs::read_to_string(repo.join(".paddock/WORKSPACE.md")).expect("read doc");
    assert!(doc.contains("alpha"));
    assert!(doc.contains("continuation.md"));

    remove_onboarding(&repo).expect("remove");
    assert!(!has_onboarding(&repo));
}

#[test]
fn gitignore_entry_is_added_once() {
    let tmp = TempDir::new().expect("tempdir");
    let repo = tmp.path();
    fs::write(repo.join(".gitignore"), "target\n").expect("seed gitignore");

    ensure_gitignore(repo).expect("first");
    ensure_gitignore(repo).expect("second");

    let contents = fs::read_to_string(repo.join(".gitignore")).expect("read");
    assert_eq!(contents.matches(".paddock/").count(), 1);
    assert!(contents.starts_with("target\n"));
}

#[test]
fn gitignore_is_created_when_missing() {
    let tmp = TempDir::new().expect("tempdir");
    ensure_gitignore(tmp.path()).expect("ensure");
    let contents = fs::read_to_string(tmp.path().join(".gitignore")).expect("read");
    assert_eq!(contents, ".paddock/\n");
}
