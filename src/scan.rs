use anyhow::{bail, Context, Result};
use gitfleet_core::app::RepoFilter;
use gitfleet_core::Repository;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Which repositories a command operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoQuery {
    pub root_dir: PathBuf,
    /// Restrict discovery to this working tree or subtree.
    pub path: Option<PathBuf>,
    pub filter: RepoFilter,
}

/// A directory is a working tree when it carries a `.git` entry (directory,
/// or file for linked worktrees and submodules).
pub fn is_working_tree(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Rebuild a repository's identity from its `<host>/<org>/<name>` location.
///
/// Paths with fewer than three segments, or whose host segment has no `.`,
/// yield a repository with only name and path set.
pub fn repository_from_path(path: &Path) -> Repository {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    match segments.as_slice() {
        [.., host, org, name] if host.contains('.') => {
            Repository::new(host.as_str(), org.as_str(), name.as_str()).with_path(path)
        }
        [.., name] => Repository::bare(name.as_str(), path),
        [] => Repository::bare("", path),
    }
}

/// Discover working trees for `query`, then apply its filter.
///
/// An explicit path that is itself a working tree is the only result.
/// Otherwise the subtree is walked and descent stops at each working tree,
/// so nested repositories are never reported.
pub fn find_repositories(query: &RepoQuery) -> Result<Vec<Repository>> {
    let start = query.path.as_deref().unwrap_or(&query.root_dir);

    if query.path.is_some() && is_working_tree(start) {
        return Ok(query.filter.apply(vec![repository_from_path(start)]));
    }

    if !start.is_dir() {
        bail!("Directory does not exist: {}", start.display());
    }

    let mut repositories = Vec::new();
    let mut walker = WalkDir::new(start).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(err).with_context(|| format!("Failed to walk {}", start.display()));
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name() == ".git" {
            walker.skip_current_dir();
            continue;
        }
        if is_working_tree(entry.path()) {
            debug!(path = %entry.path().display(), "found working tree");
            repositories.push(repository_from_path(entry.path()));
            walker.skip_current_dir();
        }
    }

    Ok(query.filter.apply(repositories))
}
