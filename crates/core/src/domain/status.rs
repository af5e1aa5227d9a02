use super::branch::BranchInfo;
use super::repo::Repository;
use serde::{Deserialize, Serialize};

/// Snapshot of one repository's working tree, branches and stashes.
///
/// The branch-derived flags are computed from `branches` on every call, so
/// they can never drift from the list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    pub repository: Repository,
    pub has_uncommitted_changes: bool,
    /// One porcelain status line per changed path.
    pub uncommitted_changes: Vec<String>,
    /// In listing order.
    pub branches: Vec<BranchInfo>,
    pub stash_count: usize,
}

impl RepositoryStatus {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            ..Self::default()
        }
    }

    /// Record porcelain status output; any non-blank output marks the tree dirty.
    pub fn set_uncommitted_changes(&mut self, porcelain: &str) {
        self.uncommitted_changes = porcelain
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim_end().to_string())
            .collect();
        self.has_uncommitted_changes = !self.uncommitted_changes.is_empty();
    }

    /// Record `git stash list` output: an empty first line means no stashes.
    pub fn set_stashes(&mut self, listing: &str) {
        let mut lines = listing.trim().lines();
        self.stash_count = match lines.next() {
            None | Some("") => 0,
            Some(_) => 1 + lines.filter(|line| !line.trim().is_empty()).count(),
        };
    }

    /// Name of the checked-out branch, if the listing marked one.
    pub fn current_branch(&self) -> Option<&str> {
        self.branches
            .iter()
            .find(|branch| branch.current)
            .map(|branch| branch.name.as_str())
    }

    pub fn has_branches_without_remote(&self) -> bool {
        self.branches.iter().any(|branch| branch.no_remote_tracking)
    }

    pub fn has_branches_with_remote_gone(&self) -> bool {
        self.branches.iter().any(|branch| branch.remote_gone)
    }

    pub fn has_branches_behind_remote(&self) -> bool {
        self.branches.iter().any(|branch| branch.behind > 0)
    }

    pub fn has_issues(&self) -> bool {
        self.has_uncommitted_changes
            || self.has_branches_without_remote()
            || self.has_branches_with_remote_gone()
            || self.has_branches_behind_remote()
    }

    /// Branches matching `predicate`, in listing order.
    pub fn branches_where<F>(&self, predicate: F) -> impl Iterator<Item = &BranchInfo>
    where
        F: Fn(&BranchInfo) -> bool,
    {
        self.branches.iter().filter(move |branch| predicate(*branch))
    }
}
