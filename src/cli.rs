use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "paddock",
    version,
    about = "Named workspaces over a pool of shared git clones, one tmux session each"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Create a workspace and allocate a repository clone to it.
    #[command(alias = "c")]
    Create {
        name: String,
        /// Remote to allocate a clone from.
        #[arg(short = 'r', long)]
        remote: Option<String>,
        /// Use an existing repository path instead of a pooled clone.
        #[arg(long)]
        path: Option<String>,
        /// One-line description stored with the workspace notes.
        #[arg(short = 's', long)]
        summary: Option<String>,
        /// Clone a fresh copy even when a free clone is available.
        #[arg(long, conflicts_with = "take_from")]
        new_clone: bool,
        /// Take the clone currently assigned to this idle workspace.
        #[arg(long, value_name = "WORKSPACE")]
        take_from: Option<String>,
    },
    /// Start (or re-attach to) the workspace's tmux session.
    #[command(alias = "s")]
    Start { name: String },
    /// Kill the workspace's session and free its clone.
    Stop { name: String },
    /// Archive a workspace: free its clone and move its notes aside.
    Archive { name: String },
    /// Rename a workspace, its notes directory and any live session.
    Rename { old: String, new: String },
    /// Show workspaces with live status, most recently active first.
    #[command(alias = "ls")]
    List {
        /// Include archived workspaces.
        #[arg(short = 'a', long)]
        archived: bool,
    },
    /// Show one workspace in detail.
    Info { name: String },
    /// Print the workspace's repository path for shell integration.
    Cd { name: String },
    /// Register a remote repository clones can be made from.
    AddRemote {
        name: String,
        url: String,
        /// Directory new clones of this remote are placed in.
        #[arg(long, value_name = "DIR", required = true)]
        clone_dir: String,
    },
    /// List registered remotes and their clone counts.
    Remotes,
    /// Clone the remote into its clone directory and add it to the pool.
    NewClone { remote: String },
    /// Add an existing local clone of the remote to the pool.
    ImportClone {
        remote: String,
        path: String,
        /// Import even when the clone's origin URL does not match the remote.
        #[arg(long)]
        force: bool,
    },
    /// List pooled clones, optionally for a single remote.
    Clones { remote: Option<String> },
}
