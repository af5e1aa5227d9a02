use gitfleet_core::app::{merged_branch_names, needs_pull, prune_candidates, PruneOptions};
use gitfleet_core::ports::{CommandError, GitExecutor};
use gitfleet_core::{BranchInfo, GitError, PruneResult, Repository, RepositoryStatus, Result, UpdateResult};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A repository on disk bound to the executor that runs git inside it.
#[derive(Clone)]
pub struct LocalRepository {
    repo: Repository,
    executor: Arc<dyn GitExecutor>,
}

impl std::fmt::Debug for LocalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRepository").field("repo", &self.repo).finish()
    }
}

impl LocalRepository {
    pub fn new(repo: Repository, executor: Arc<dyn GitExecutor>) -> Self {
        Self { repo, executor }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn into_repository(self) -> Repository {
        self.repo
    }

    /// Clone `url` into `root_dir/host/org/name` and point this repository at it.
    ///
    /// The clone streams to the terminal.
    pub fn clone_to(&mut self, root_dir: &Path, url: &str, options: &[String]) -> Result<()> {
        // git resolves a relative target against its `-C` directory.
        let target = self.repo.target_path(root_dir);
        let target = std::path::absolute(&target)
            .map_err(|source| GitError::CreateDirFailed { path: target, source })?;
        if target.exists() {
            return Err(GitError::AlreadyExists { path: target });
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| GitError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let target_arg = target.to_string_lossy().into_owned();
        let mut args: Vec<&str> = vec!["clone"];
        args.extend(options.iter().map(String::as_str));
        args.push(url);
        args.push(&target_arg);

        info!(url, target = %target.display(), "cloning repository");
        self.executor
            .execute(&target, true, &args)
            .map_err(|source| GitError::CloneFailed {
                url: url.to_string(),
                source,
            })?;

        self.repo.path = target;
        Ok(())
    }

    /// Gather working tree changes, branches and stashes.
    pub fn status(&self) -> Result<RepositoryStatus> {
        if !self.repo.path.exists() {
            return Err(GitError::PathNotFound {
                path: self.repo.path.clone(),
            });
        }

        let (changes, (branches, stashes)) = rayon::join(
            || self.output("list uncommitted changes", &["status", "--porcelain"]),
            || {
                rayon::join(
                    || self.output("list branches", &["branch", "-vv"]),
                    || self.output("list stashes", &["stash", "list"]),
                )
            },
        );

        let mut status = RepositoryStatus::new(self.repo.clone());
        status.set_uncommitted_changes(&changes?);
        status.branches = parse_branch_listing(&branches?);
        status.set_stashes(&stashes?);
        Ok(status)
    }

    /// Fetch all remotes, then pull every tracked branch that is behind.
    ///
    /// Refuses to touch a dirty tree. With `fetch_only` nothing is checked
    /// out or pulled. The originally checked-out branch is restored at the
    /// end (by commit id when HEAD was detached); a failure to do so lands
    /// in [`UpdateResult::restore_error`].
    pub fn update(&self, fetch_only: bool, prune: bool) -> Result<UpdateResult> {
        let original = self.head_ref()?;

        let mut fetch_args = vec!["--all"];
        if prune {
            fetch_args.push("--prune");
        }
        self.fetch(&fetch_args)?;

        let status = self.status()?;
        if status.has_uncommitted_changes {
            return Err(GitError::UncommittedChanges);
        }

        let mut result = UpdateResult::new(self.repo.clone());
        if fetch_only {
            return Ok(result);
        }

        let mut head = original.clone();
        for branch in status.branches.into_iter().filter(|b| b.has_live_upstream()) {
            if !needs_pull(&branch) {
                result.record(branch, None);
                continue;
            }

            let previous = head.clone();
            if branch.name != head {
                if let Err(err) = self.checkout(&branch.name) {
                    result.record(branch, Some(err));
                    continue;
                }
                head = branch.name.clone();
            }

            match self.pull(&["--rebase"]) {
                Ok(()) => {
                    debug!(repo = %self.repo.full_name(), branch = %branch.name, "pulled");
                    result.record(branch, None);
                }
                Err(err) => {
                    if head != previous {
                        match self.checkout(&previous) {
                            Ok(()) => head = previous,
                            Err(restore) => warn!(
                                repo = %self.repo.full_name(),
                                branch = %branch.name,
                                error = %restore,
                                "could not switch back after failed pull"
                            ),
                        }
                    }
                    result.record(branch, Some(err));
                }
            }
        }

        if let Err(err) = self.checkout(&original) {
            result.restore_error = Some(err);
        }
        Ok(result)
    }

    /// Delete branches whose upstream is gone and/or that are merged into
    /// the default branch.
    ///
    /// Errors are carried inside the returned [`PruneResult`]. The first
    /// failed deletion stops the run.
    pub fn prune_branches(&self, opts: PruneOptions) -> PruneResult {
        let status = match self.status() {
            Ok(status) => status,
            Err(err) => return PruneResult::failed(self.repo.clone(), opts.dry_run, err),
        };
        let default_branch = match self.default_branch() {
            Ok(name) => name,
            Err(err) => return PruneResult::failed(self.repo.clone(), opts.dry_run, err),
        };

        let merged = if opts.merged {
            match self.output("list merged branches", &["branch", "--merged", &default_branch]) {
                Ok(listing) => merged_branch_names(&listing),
                Err(err) => return PruneResult::failed(self.repo.clone(), opts.dry_run, err),
            }
        } else {
            Vec::new()
        };

        let mut result = PruneResult {
            repository: self.repo.clone(),
            pruned_branches: prune_candidates(&status, &default_branch, opts, &merged),
            dry_run: opts.dry_run,
            error: None,
        };

        if opts.dry_run {
            return result;
        }

        for branch in &result.pruned_branches {
            if let Err(source) = self.run(&["branch", "-D", branch]) {
                result.error = Some(GitError::DeleteFailed {
                    branch: branch.clone(),
                    source,
                });
                break;
            }
            info!(repo = %self.repo.full_name(), branch = %branch, "deleted branch");
        }
        result
    }

    /// `main` if it exists, else `master`, else the checked-out branch.
    pub fn default_branch(&self) -> Result<String> {
        for candidate in ["main", "master"] {
            let refname = format!("refs/heads/{candidate}");
            if self.run(&["show-ref", "--verify", "--quiet", &refname]).is_ok() {
                return Ok(candidate.to_string());
            }
        }
        self.current_branch()
            .map_err(|err| GitError::DefaultBranchUndetermined { source: Box::new(err) })
    }

    pub fn checkout(&self, name: &str) -> Result<()> {
        self.run(&["checkout", name])
            .map(drop)
            .map_err(|source| GitError::CheckoutFailed {
                branch: name.to_string(),
                source,
            })
    }

    pub fn pull(&self, args: &[&str]) -> Result<()> {
        self.run(&prefixed("pull", args))
            .map(drop)
            .map_err(|source| GitError::PullFailed { source })
    }

    pub fn fetch(&self, args: &[&str]) -> Result<()> {
        self.run(&prefixed("fetch", args))
            .map(drop)
            .map_err(|source| GitError::FetchFailed { source })
    }

    pub fn current_branch(&self) -> Result<String> {
        let out = self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .map_err(|source| GitError::CurrentBranchFailed { source })?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    /// The checked-out branch name, or the commit id on a detached HEAD.
    fn head_ref(&self) -> Result<String> {
        let branch = self.current_branch()?;
        if branch != "HEAD" {
            return Ok(branch);
        }
        let out = self
            .run(&["rev-parse", "HEAD"])
            .map_err(|source| GitError::CurrentBranchFailed { source })?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    /// Remote branch names without the remote prefix, `HEAD` excluded.
    pub fn remote_branches(&self) -> Result<Vec<String>> {
        let listing = self.output("list remote branches", &["branch", "-r"])?;
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.contains("HEAD"))
            .map(|line| match line.split_once('/') {
                Some((_, name)) => name.to_string(),
                None => line.to_string(),
            })
            .collect())
    }

    fn run(&self, args: &[&str]) -> std::result::Result<Vec<u8>, CommandError> {
        self.executor.execute(&self.repo.path, false, args)
    }

    fn output(&self, action: &'static str, args: &[&str]) -> Result<String> {
        self.run(args)
            .map(|out| String::from_utf8_lossy(&out).into_owned())
            .map_err(|source| GitError::Command { action, source })
    }
}

/// Parse `url` and clone it into the `root_dir/host/org/name` layout.
pub fn clone_repository(
    executor: Arc<dyn GitExecutor>,
    root_dir: &Path,
    url: &str,
    options: &[String],
) -> Result<Repository> {
    let mut local = LocalRepository::new(gitfleet_core::parse_url(url)?, executor);
    local.clone_to(root_dir, url, options)?;
    Ok(local.into_repository())
}

fn prefixed<'a>(command: &'a str, args: &[&'a str]) -> Vec<&'a str> {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(command);
    all.extend_from_slice(args);
    all
}

/// Parse `git branch -vv` output, one line per task, keeping listing order.
pub fn parse_branch_listing(listing: &str) -> Vec<BranchInfo> {
    listing.par_lines().filter_map(BranchInfo::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGitExecutor;
    use tempfile::TempDir;

    fn repo_at(dir: &TempDir, mock: &MockGitExecutor) -> LocalRepository {
        let repo = Repository::new("github.com", "acme", "widget").with_path(dir.path());
        LocalRepository::new(repo, Arc::new(mock.clone()))
    }

    #[test]
    fn test_status_dirty_and_behind() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["status", "--porcelain"], " M src/lib.rs\n")
            .on(
                &["branch", "-vv"],
                "* main 1a2b3c [origin/main: behind 3] fix\n  topic 4d5e6f wip\n",
            )
            .on(&["stash", "list"], "");

        let status = repo_at(&dir, &mock).status().unwrap();

        assert!(status.has_uncommitted_changes);
        assert_eq!(status.uncommitted_changes, vec![" M src/lib.rs"]);
        assert!(status.has_branches_behind_remote());
        assert!(status.has_branches_without_remote());
        assert!(status.has_issues());
        assert_eq!(status.stash_count, 0);
        assert_eq!(status.branches[0].name, "main");
        assert_eq!(status.branches[1].name, "topic");
    }

    #[test]
    fn test_status_missing_path() {
        let mock = MockGitExecutor::new();
        let repo = Repository::new("github.com", "acme", "gone").with_path("/definitely/not/here/gitfleet");
        let err = LocalRepository::new(repo, Arc::new(mock.clone())).status().unwrap_err();

        assert!(matches!(err, GitError::PathNotFound { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_status_subcommand_failure_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.fail(&["stash", "list"], "fatal: bad stash");

        let err = repo_at(&dir, &mock).status().unwrap_err();
        assert!(err.to_string().contains("list stashes"));
        assert!(err.to_string().contains("bad stash"));
    }

    #[test]
    fn test_prune_dry_run_gone_only() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n").on(
            &["branch", "-vv"],
            "* main\n  feature [origin/feature]\n  old [origin/old: gone]\n",
        );

        let result = repo_at(&dir, &mock).prune_branches(PruneOptions::from_flags(true, false, true));

        assert!(result.error.is_none());
        assert!(result.dry_run);
        assert_eq!(result.pruned_branches, vec!["old"]);
        assert!(mock.calls_starting_with(&["branch", "-D"]).is_empty());
        assert!(mock.calls_starting_with(&["branch", "--merged"]).is_empty());
    }

    #[test]
    fn test_prune_deletes_gone_and_merged() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(
            &["branch", "-vv"],
            "* main 1 [origin/main] a\n  done 2 [origin/done] b\n  old 3 [origin/old: gone] c\n  wip 4 d\n",
        )
        .on(&["branch", "--merged"], "* main\n  done\n");

        let result = repo_at(&dir, &mock).prune_branches(PruneOptions::from_flags(false, false, false));

        assert!(result.error.is_none());
        assert_eq!(result.pruned_branches, vec!["done", "old"]);
        let deletes: Vec<_> = mock
            .calls_starting_with(&["branch", "-D"])
            .into_iter()
            .map(|c| c.args[2].clone())
            .collect();
        assert_eq!(deletes, vec!["done", "old"]);
        assert_eq!(mock.calls_starting_with(&["branch", "--merged", "main"]).len(), 1);
    }

    #[test]
    fn test_prune_stops_at_first_delete_failure() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(
            &["branch", "-vv"],
            "* main\n  a [origin/a: gone]\n  b [origin/b: gone]\n",
        )
        .fail(&["branch", "-D", "a"], "error: cannot lock ref");

        let result = repo_at(&dir, &mock).prune_branches(PruneOptions::from_flags(true, false, false));

        assert_eq!(result.pruned_branches, vec!["a", "b"]);
        match result.error {
            Some(GitError::DeleteFailed { ref branch, .. }) => assert_eq!(branch, "a"),
            ref other => panic!("unexpected: {other:?}"),
        }
        assert!(mock.calls_starting_with(&["branch", "-D", "b"]).is_empty());
    }

    #[test]
    fn test_prune_without_main_or_master_uses_current_branch() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.fail(&["show-ref"], "")
            .on(&["rev-parse", "--abbrev-ref", "HEAD"], "develop\n")
            .on(
                &["branch", "-vv"],
                "* develop 1 [origin/develop] x\n  shipped 2 [origin/shipped] y\n",
            )
            .on(&["branch", "--merged", "develop"], "* develop\n  shipped\n");

        let result = repo_at(&dir, &mock).prune_branches(PruneOptions::from_flags(false, true, true));

        assert!(result.error.is_none());
        assert_eq!(result.pruned_branches, vec!["shipped"]);
    }

    #[test]
    fn test_default_branch_order() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.fail(&["show-ref", "--verify", "--quiet", "refs/heads/main"], "");
        assert_eq!(repo_at(&dir, &mock).default_branch().unwrap(), "master");

        let mock = MockGitExecutor::new();
        mock.fail(&["show-ref"], "").fail(&["rev-parse"], "fatal: not a git repository");
        let err = repo_at(&dir, &mock).default_branch().unwrap_err();
        assert!(matches!(err, GitError::DefaultBranchUndetermined { .. }));
    }

    #[test]
    fn test_update_fetch_only_touches_no_branch() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n")
            .on(&["branch", "-vv"], "* main 1 [origin/main: behind 2] x\n");

        let result = repo_at(&dir, &mock).update(true, true).unwrap();

        assert!(result.branches.is_empty());
        assert!(!result.has_errors());
        assert_eq!(mock.calls_starting_with(&["fetch", "--all", "--prune"]).len(), 1);
        assert!(mock.calls_starting_with(&["checkout"]).is_empty());
        assert!(mock.calls_starting_with(&["pull"]).is_empty());
    }

    #[test]
    fn test_update_refuses_dirty_tree() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n").on(&["status", "--porcelain"], "?? new.txt\n");

        let err = repo_at(&dir, &mock).update(false, false).unwrap_err();
        assert!(err.is_uncommitted_changes());
        assert!(mock.calls_starting_with(&["pull"]).is_empty());
    }

    #[test]
    fn test_update_pulls_behind_branches_and_restores() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n").on(
            &["branch", "-vv"],
            "* main 1 [origin/main: behind 1] a\n  dev 2 [origin/dev: behind 4] b\n  \
             same 3 [origin/same] c\n  old 4 [origin/old: gone] d\n  local 5 e\n",
        );

        let result = repo_at(&dir, &mock).update(false, false).unwrap();

        assert!(!result.has_errors());
        assert_eq!(result.branches.len(), 3);
        assert_eq!(result.updated_count(), 2);
        assert!(!result.branches.contains_key("old"));
        assert!(!result.branches.contains_key("local"));

        let lines: Vec<_> = mock
            .command_lines()
            .into_iter()
            .filter(|l| l.starts_with("checkout") || l.starts_with("pull"))
            .collect();
        assert_eq!(
            lines,
            vec!["pull --rebase", "checkout dev", "pull --rebase", "checkout main"]
        );
    }

    #[test]
    fn test_update_restores_after_pull_failure() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n")
            .on(
                &["branch", "-vv"],
                "* main 1 [origin/main] a\n  dev 2 [origin/dev: behind 1] b\n",
            )
            .fail(&["pull"], "CONFLICT (content)");

        let result = repo_at(&dir, &mock).update(false, false).unwrap();

        assert!(result.has_errors());
        assert!(matches!(
            result.branches["dev"].error,
            Some(GitError::PullFailed { .. })
        ));
        assert!(result.restore_error.is_none());
        let checkouts: Vec<_> = mock
            .command_lines()
            .into_iter()
            .filter(|l| l.starts_with("checkout"))
            .collect();
        assert_eq!(checkouts, vec!["checkout dev", "checkout main", "checkout main"]);
    }

    #[test]
    fn test_update_surfaces_restore_failure() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n")
            .on(&["branch", "-vv"], "* main 1 [origin/main] a\n  dev 2 [origin/dev: behind 1] b\n")
            .fail(&["checkout", "main"], "error: pathspec");

        let result = repo_at(&dir, &mock).update(false, false).unwrap();

        assert!(result.branches["dev"].was_updated());
        assert!(matches!(result.restore_error, Some(GitError::CheckoutFailed { .. })));
        assert!(result.has_errors());
    }

    #[test]
    fn test_update_restores_detached_head_by_commit() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse", "--abbrev-ref", "HEAD"], "HEAD\n")
            .on(&["rev-parse", "HEAD"], "1a2b3c4d5e\n")
            .on(
                &["branch", "-vv"],
                "* (HEAD detached at 1a2b3c) 1a2b3c msg\n  dev 2 [origin/dev: behind 1] b\n",
            );

        let result = repo_at(&dir, &mock).update(false, false).unwrap();

        assert!(!result.has_errors());
        assert!(result.branches["dev"].was_updated());
        let checkouts: Vec<_> = mock
            .command_lines()
            .into_iter()
            .filter(|l| l.starts_with("checkout"))
            .collect();
        assert_eq!(checkouts, vec!["checkout dev", "checkout 1a2b3c4d5e"]);
    }

    #[test]
    fn test_update_continues_when_switch_back_fails() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n")
            .on(
                &["branch", "-vv"],
                "* main 1 [origin/main] a\n  dev 2 [origin/dev: behind 1] b\n  ops 3 [origin/ops: behind 2] c\n",
            )
            .fail(&["pull"], "CONFLICT (content)")
            .fail(&["checkout", "main"], "error: pathspec 'main'");

        let result = repo_at(&dir, &mock).update(false, false).unwrap();

        assert!(matches!(result.branches["dev"].error, Some(GitError::PullFailed { .. })));
        assert!(matches!(result.branches["ops"].error, Some(GitError::PullFailed { .. })));
        assert!(matches!(result.restore_error, Some(GitError::CheckoutFailed { .. })));
        assert!(result.has_errors());

        let checkouts: Vec<_> = mock
            .command_lines()
            .into_iter()
            .filter(|l| l.starts_with("checkout"))
            .collect();
        assert_eq!(
            checkouts,
            vec!["checkout dev", "checkout main", "checkout ops", "checkout dev", "checkout main"]
        );
    }

    #[test]
    fn test_update_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n").fail(&["fetch"], "Could not resolve host");

        let err = repo_at(&dir, &mock).update(false, false).unwrap_err();
        assert!(matches!(err, GitError::FetchFailed { .. }));
        assert!(err.to_string().contains("Could not resolve host"));
    }

    #[test]
    fn test_clone_into_layout() {
        let root = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        let mut repo = LocalRepository::new(
            Repository::new("github.com", "acme", "widget"),
            Arc::new(mock.clone()),
        );

        repo.clone_to(root.path(), "git@github.com:acme/widget.git", &["--depth=1".to_string()])
            .unwrap();

        let target = root.path().join("github.com").join("acme").join("widget");
        assert_eq!(repo.repository().path, target);
        assert!(target.parent().unwrap().is_dir());

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].stream);
        assert_eq!(calls[0].args[..3], ["clone", "--depth=1", "git@github.com:acme/widget.git"]);
    }

    #[test]
    fn test_clone_refuses_existing_target() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("github.com/acme/widget")).unwrap();
        let mock = MockGitExecutor::new();
        let mut repo = LocalRepository::new(
            Repository::new("github.com", "acme", "widget"),
            Arc::new(mock.clone()),
        );

        let err = repo.clone_to(root.path(), "git@github.com:acme/widget.git", &[]).unwrap_err();
        assert!(matches!(err, GitError::AlreadyExists { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_clone_repository_parses_url() {
        let root = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();

        let repo = clone_repository(
            Arc::new(mock.clone()),
            root.path(),
            "https://gitlab.com/tools/cli.git",
            &[],
        )
        .unwrap();
        assert_eq!(repo.full_name(), "gitlab.com/tools/cli");
        assert_eq!(repo.path, root.path().join("gitlab.com/tools/cli"));

        let err = clone_repository(Arc::new(mock.clone()), root.path(), "ftp://x/y/z", &[]).unwrap_err();
        assert!(matches!(err, GitError::UnsupportedUrlFormat { .. }));
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_remote_branches_strip_remote_and_head() {
        let dir = TempDir::new().unwrap();
        let mock = MockGitExecutor::new();
        mock.on(
            &["branch", "-r"],
            "  origin/HEAD -> origin/main\n  origin/main\n  origin/feature/x\n",
        );

        let branches = repo_at(&dir, &mock).remote_branches().unwrap();
        assert_eq!(branches, vec!["main", "feature/x"]);
    }
}
