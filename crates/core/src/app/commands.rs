/// Operations that can be fanned out across a set of repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Refresh status of every repository
    Status,

    /// Fetch, then fast-forward (rebase) branches that are behind
    Update { fetch_only: bool, prune: bool },

    /// Delete stale local branches
    Prune(PruneOptions),
}

/// Which branches a prune run targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Branches whose upstream was deleted
    pub gone: bool,
    /// Branches fully merged into the default branch
    pub merged: bool,
    pub dry_run: bool,
}

impl PruneOptions {
    /// Options as given on the command line; with no policy selected, both apply.
    pub fn from_flags(gone_only: bool, merged_only: bool, dry_run: bool) -> Self {
        let both = !gone_only && !merged_only;
        Self {
            gone: gone_only || both,
            merged: merged_only || both,
            dry_run,
        }
    }
}
