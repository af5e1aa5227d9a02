use clap::{Args, Parser, Subcommand};
use gitfleet_core::app::{PruneOptions, RepoFilter};
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "gitfleet")]
#[command(about = "Keep a tree of cloned repositories in sync: status, update and branch pruning across all of them")]
pub struct CliArgs {
    /// Root directory holding <host>/<org>/<name> working trees (overrides config)
    #[arg(long, global = true)]
    pub root_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Clone a repository into <root>/<host>/<org>/<name>
    Clone {
        /// SSH or HTTPS remote URL
        url: String,
    },

    /// Show repositories with uncommitted changes, stashes or stale branches
    Status {
        #[command(flatten)]
        filter: FilterArgs,

        /// Also list clean repositories
        #[arg(long)]
        display_all: bool,
    },

    /// Fetch all remotes and pull every branch that is behind
    Update {
        #[command(flatten)]
        filter: FilterArgs,

        /// Only fetch, leave local branches alone
        #[arg(long)]
        fetch_only: bool,

        /// Prune remote-tracking refs while fetching
        #[arg(long)]
        prune: bool,
    },

    /// Delete local branches that are gone upstream or merged
    Prune {
        #[command(flatten)]
        filter: FilterArgs,

        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,

        /// Only branches whose upstream is gone
        #[arg(long)]
        gone_only: bool,

        /// Only branches merged into the default branch
        #[arg(long)]
        merged_only: bool,
    },

    /// Pick GitHub repositories through the gh CLI and clone them
    GhClone {
        /// User or organization to list (defaults to the authenticated user)
        owner: Option<String>,

        /// Maximum number of repositories to list
        #[arg(long, default_value_t = 1000)]
        limit: usize,

        /// Clone everything listed without the picker
        #[arg(long)]
        all: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print one key, or the whole file
    Get { key: Option<String> },
    /// Set one key
    Set { key: String, value: String },
}

/// Repository selection shared by the fan-out commands.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct FilterArgs {
    /// Only repositories on this host
    #[arg(long)]
    pub host: Option<String>,

    /// Only repositories of this organization
    #[arg(long)]
    pub org: Option<String>,

    /// Only repositories with this name
    #[arg(long)]
    pub repo: Option<String>,

    /// Only repositories at or under this path
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl FilterArgs {
    pub fn repo_filter(&self) -> RepoFilter {
        RepoFilter {
            host: self.host.clone(),
            organization: self.org.clone(),
            name: self.repo.clone(),
        }
    }
}

impl Command {
    pub fn prune_options(&self) -> Option<PruneOptions> {
        match *self {
            Command::Prune {
                dry_run,
                gone_only,
                merged_only,
                ..
            } => Some(PruneOptions::from_flags(gone_only, merged_only, dry_run)),
            _ => None,
        }
    }
}
