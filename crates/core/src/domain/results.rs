use super::branch::BranchInfo;
use super::repo::Repository;
use crate::error::GitError;
use std::collections::BTreeMap;

/// Outcome of updating one branch.
#[derive(Debug)]
pub struct BranchUpdateResult {
    pub branch: BranchInfo,
    pub error: Option<GitError>,
}

impl BranchUpdateResult {
    /// A pull ran for this branch and succeeded.
    pub fn was_updated(&self) -> bool {
        self.error.is_none() && self.branch.behind > 0
    }
}

/// Per-branch outcomes of one `update` run on a repository.
#[derive(Debug)]
pub struct UpdateResult {
    pub repository: Repository,
    /// Keyed by branch name. Empty for fetch-only runs.
    pub branches: BTreeMap<String, BranchUpdateResult>,
    /// Failure to check the originally checked-out branch back out.
    pub restore_error: Option<GitError>,
}

impl UpdateResult {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            branches: BTreeMap::new(),
            restore_error: None,
        }
    }

    pub fn record(&mut self, branch: BranchInfo, error: Option<GitError>) {
        self.branches
            .insert(branch.name.clone(), BranchUpdateResult { branch, error });
    }

    pub fn has_errors(&self) -> bool {
        self.restore_error.is_some() || self.branches.values().any(|r| r.error.is_some())
    }

    pub fn updated_count(&self) -> usize {
        self.branches.values().filter(|r| r.was_updated()).count()
    }
}

/// Branches removed (or, on a dry run, that would be removed) from one repository.
#[derive(Debug)]
pub struct PruneResult {
    pub repository: Repository,
    pub pruned_branches: Vec<String>,
    pub dry_run: bool,
    /// Set when status/default-branch lookup failed or a deletion aborted the run.
    pub error: Option<GitError>,
}

impl PruneResult {
    pub fn failed(repository: Repository, dry_run: bool, error: GitError) -> Self {
        Self {
            repository,
            pruned_branches: Vec::new(),
            dry_run,
            error: Some(error),
        }
    }
}
