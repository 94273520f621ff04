pub(crate) const CONFIG_DIR_NAME: &str = ".paddock";
pub(crate) const CONFIG_FILE_NAME: &str = "config.json";
pub(crate) const CONFIG_LOCK_FILE_NAME: &str = "config.lock";
pub(crate) const CONFIG_LOCK_TIMEOUT_MS: u64 = 5_000;

pub(crate) const SESSION_PREFIX: &str = "paddock-ws-";
pub(crate) const DEFAULT_AGENT_COMMAND: &str = "claude";

pub(crate) const WORKSPACES_DIR_NAME: &str = "workspaces";
pub(crate) const ARCHIVE_DIR_NAME: &str = "archived";
pub(crate) const SESSION_LOCK_FILE_NAME: &str = ".lock";
pub(crate) const RESEARCH_DIR_NAME: &str = "research";
pub(crate) const NOTE_FILES: [&str; 4] = [
    "context.md",
    "decisions.md",
    "continuation.md",
    "summary.txt",
];

pub(crate) const ONBOARDING_DIR_NAME: &str = ".paddock";
pub(crate) const ONBOARDING_FILE_NAME: &str = "WORKSPACE.md";

pub(crate) const CONTEXT_PREVIEW_MAX_CHARS: usize = 200;
pub(crate) const LIST_PATH_MAX_CHARS: usize = 50;
pub(crate) const LIST_URL_MAX_CHARS: usize = 50;
pub(crate) const TRUNCATE_ELLIPSIS_CHARS: usize = 3;
