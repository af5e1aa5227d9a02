//! Branch lifecycle decisions: which branches to pull and which to prune.

use super::commands::PruneOptions;
use crate::domain::{BranchInfo, RepositoryStatus};

/// Branch names from `git branch --merged <base>` output, with the
/// current-branch marker and indentation removed.
pub fn merged_branch_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("* ").unwrap_or(line).trim().to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Branches eligible for deletion, in listing order.
///
/// The checked-out branch and `default_branch` are never candidates. A
/// branch qualifies when `opts.gone` is set and its upstream is gone, or
/// when `opts.merged` is set and its name appears in `merged`.
pub fn prune_candidates(
    status: &RepositoryStatus,
    default_branch: &str,
    opts: PruneOptions,
    merged: &[String],
) -> Vec<String> {
    status
        .branches
        .iter()
        .filter(|branch| !branch.current && branch.name != default_branch)
        .filter(|branch| {
            (opts.gone && branch.remote_gone)
                || (opts.merged && merged.iter().any(|name| *name == branch.name))
        })
        .map(|branch| branch.name.clone())
        .collect()
}

/// A branch needs a pull only with a live upstream it is behind.
pub fn needs_pull(branch: &BranchInfo) -> bool {
    branch.has_live_upstream() && branch.behind > 0
}
