//! Fan an operation out over many repositories and gather the results back
//! in input order.

use crate::git::LocalRepository;
use anyhow::{Context, Result};
use gitfleet_core::app::{Operation, PruneOptions, RunSummary};
use gitfleet_core::ports::GitExecutor;
use gitfleet_core::{PruneResult, Repository, RepositoryStatus, UpdateResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one operation on one repository.
#[derive(Debug)]
pub struct Outcome<T> {
    pub repository: Repository,
    pub result: gitfleet_core::Result<T>,
}

/// Everything one orchestrated run produced, in input order.
#[derive(Debug)]
pub enum Report {
    Status(Vec<Outcome<RepositoryStatus>>),
    Update {
        fetch_only: bool,
        outcomes: Vec<Outcome<UpdateResult>>,
    },
    Prune {
        dry_run: bool,
        results: Vec<PruneResult>,
    },
}

impl Report {
    /// Failed repositories had the operation itself error out. Repositories
    /// with issues need attention: a status with issues, an update skipped
    /// for a dirty tree, or branches that were (or would be) pruned.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        match self {
            Report::Status(outcomes) => {
                for outcome in outcomes {
                    match &outcome.result {
                        Err(_) => summary.record_failure(),
                        Ok(status) if status.has_issues() => summary.record_issue(),
                        Ok(_) => summary.record_clean(),
                    }
                }
            }
            Report::Update { outcomes, .. } => {
                for outcome in outcomes {
                    match &outcome.result {
                        Err(err) if err.is_uncommitted_changes() => summary.record_issue(),
                        Err(_) => summary.record_failure(),
                        Ok(update) if update.has_errors() => summary.record_failure(),
                        Ok(_) => summary.record_clean(),
                    }
                }
            }
            Report::Prune { results, .. } => {
                for result in results {
                    if result.error.is_some() {
                        summary.record_failure();
                    } else if !result.pruned_branches.is_empty() {
                        summary.record_issue();
                    } else {
                        summary.record_clean();
                    }
                }
            }
        }
        summary
    }
}

/// Runs git operations across repositories on a bounded worker pool.
pub struct Orchestrator {
    executor: Arc<dyn GitExecutor>,
    jobs: Option<usize>,
}

impl Orchestrator {
    /// `jobs` caps the number of concurrent workers; `None` means one per repository.
    pub fn new(executor: Arc<dyn GitExecutor>, jobs: Option<usize>) -> Self {
        Self { executor, jobs }
    }

    pub fn run(&self, repos: &[Repository], operation: Operation) -> Result<Report> {
        let report = match operation {
            Operation::Status => Report::Status(self.status_all(repos)?),
            Operation::Update { fetch_only, prune } => Report::Update {
                fetch_only,
                outcomes: self.update_all(repos, fetch_only, prune)?,
            },
            Operation::Prune(opts) => Report::Prune {
                dry_run: opts.dry_run,
                results: self.prune_all(repos, opts)?,
            },
        };
        Ok(report)
    }

    pub fn status_all(&self, repos: &[Repository]) -> Result<Vec<Outcome<RepositoryStatus>>> {
        let results = self.fan_out(repos, |repo| repo.status())?;
        Ok(results
            .into_iter()
            .map(|(repository, result)| Outcome { repository, result })
            .collect())
    }

    pub fn update_all(
        &self,
        repos: &[Repository],
        fetch_only: bool,
        prune: bool,
    ) -> Result<Vec<Outcome<UpdateResult>>> {
        let results = self.fan_out(repos, |repo| repo.update(fetch_only, prune))?;
        Ok(results
            .into_iter()
            .map(|(repository, result)| Outcome { repository, result })
            .collect())
    }

    pub fn prune_all(&self, repos: &[Repository], opts: PruneOptions) -> Result<Vec<PruneResult>> {
        let results = self.fan_out(repos, |repo| repo.prune_branches(opts))?;
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    /// Run `task` once per repository, concurrently, and return the results
    /// in the order of `repos`.
    fn fan_out<T, F>(&self, repos: &[Repository], task: F) -> Result<Vec<(Repository, T)>>
    where
        T: Send,
        F: Fn(&LocalRepository) -> T + Sync,
    {
        if repos.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.jobs.map_or(repos.len(), |jobs| jobs.clamp(1, repos.len()));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gitfleet-worker-{i}"))
            .build()
            .context("Failed to build worker pool")?;
        debug!(repos = repos.len(), workers, "starting run");

        let (tx, rx) = crossbeam_channel::unbounded::<(PathBuf, T)>();
        pool.scope(|scope| {
            for repo in repos {
                let tx = tx.clone();
                let task = &task;
                let local = LocalRepository::new(repo.clone(), Arc::clone(&self.executor));
                scope.spawn(move |_| {
                    let result = task(&local);
                    // The receiver outlives the scope.
                    let _ = tx.send((local.into_repository().path, result));
                });
            }
        });
        drop(tx);

        let mut by_path: HashMap<PathBuf, T> = rx.into_iter().collect();
        let mut ordered = Vec::with_capacity(repos.len());
        for repo in repos {
            match by_path.remove(&repo.path) {
                Some(result) => ordered.push((repo.clone(), result)),
                None => warn!(repo = %repo.full_name(), path = %repo.path.display(), "no result for repository"),
            }
        }
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGitExecutor;
    use gitfleet_core::GitError;
    use tempfile::TempDir;

    struct Fleet {
        _root: TempDir,
        repos: Vec<Repository>,
    }

    fn fleet(names: &[&str]) -> Fleet {
        let root = TempDir::new().unwrap();
        let repos = names
            .iter()
            .map(|name| {
                let repo = Repository::new("github.com", "acme", *name);
                let path = repo.target_path(root.path());
                std::fs::create_dir_all(&path).unwrap();
                repo.with_path(path)
            })
            .collect();
        Fleet { _root: root, repos }
    }

    #[test]
    fn test_status_results_keep_input_order() {
        let fleet = fleet(&["zeta", "alpha", "mid", "beta", "omega"]);
        let mock = MockGitExecutor::new();
        mock.on_repo(&fleet.repos[1].path, &["status", "--porcelain"], " M a.txt\n");

        for jobs in [None, Some(1), Some(3)] {
            let orchestrator = Orchestrator::new(Arc::new(mock.clone()), jobs);
            let outcomes = orchestrator.status_all(&fleet.repos).unwrap();

            let names: Vec<_> = outcomes.iter().map(|o| o.repository.name.as_str()).collect();
            assert_eq!(names, vec!["zeta", "alpha", "mid", "beta", "omega"]);
            assert!(outcomes[1].result.as_ref().unwrap().has_uncommitted_changes);
            assert!(!outcomes[0].result.as_ref().unwrap().has_uncommitted_changes);
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let fleet = fleet(&["ok", "broken", "dirty"]);
        let mock = MockGitExecutor::new();
        mock.on(&["rev-parse"], "main\n")
            .fail_repo(&fleet.repos[1].path, &["fetch"], "fatal: unable to access")
            .on_repo(&fleet.repos[2].path, &["status", "--porcelain"], "?? x\n");

        let orchestrator = Orchestrator::new(Arc::new(mock.clone()), Some(2));
        let report = orchestrator
            .run(&fleet.repos, Operation::Update { fetch_only: false, prune: false })
            .unwrap();

        let Report::Update { outcomes, .. } = &report else {
            panic!("expected an update report");
        };
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(GitError::FetchFailed { .. })));
        assert!(outcomes[2].result.as_ref().unwrap_err().is_uncommitted_changes());

        let summary = report.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.with_issues, 1);
        assert_eq!(summary.clean(), 1);
    }

    #[test]
    fn test_prune_report_summary() {
        let fleet = fleet(&["a", "b"]);
        let mock = MockGitExecutor::new();
        mock.on_repo(
            &fleet.repos[0].path,
            &["branch", "-vv"],
            "* main 1 [origin/main] x\n  old 2 [origin/old: gone] y\n",
        );

        let orchestrator = Orchestrator::new(Arc::new(mock.clone()), None);
        let report = orchestrator
            .run(&fleet.repos, Operation::Prune(PruneOptions::from_flags(true, false, true)))
            .unwrap();

        let Report::Prune { dry_run, results } = &report else {
            panic!("expected a prune report");
        };
        assert!(*dry_run);
        assert_eq!(results[0].pruned_branches, vec!["old"]);
        assert!(results[1].pruned_branches.is_empty());
        assert!(mock.calls_starting_with(&["branch", "-D"]).is_empty());
        assert_eq!(report.summary().with_issues, 1);
        assert_eq!(report.summary().failed, 0);
    }

    #[test]
    fn test_empty_input() {
        let orchestrator = Orchestrator::new(Arc::new(MockGitExecutor::new()), Some(4));
        let report = orchestrator.run(&[], Operation::Status).unwrap();
        assert!(report.summary().is_all_clean());
        assert_eq!(report.summary().total, 0);
    }
}
