use crate::ports::CommandError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by repository operations.
///
/// Variants that wrap an executor failure keep it as the error source and
/// repeat its message, so the underlying git diagnostics stay visible.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("invalid git URL format: {url} ({reason})")]
    InvalidUrlFormat { url: String, reason: &'static str },

    #[error("unsupported git URL format: {url}")]
    UnsupportedUrlFormat { url: String },

    #[error("repository path does not exist: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("repository already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clone {url}: {source}")]
    CloneFailed {
        url: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to fetch: {source}")]
    FetchFailed {
        #[source]
        source: CommandError,
    },

    #[error("failed to pull: {source}")]
    PullFailed {
        #[source]
        source: CommandError,
    },

    #[error("failed to checkout {branch}: {source}")]
    CheckoutFailed {
        branch: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to delete branch {branch}: {source}")]
    DeleteFailed {
        branch: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to get current branch: {source}")]
    CurrentBranchFailed {
        #[source]
        source: CommandError,
    },

    #[error("failed to determine default branch: {source}")]
    DefaultBranchUndetermined {
        #[source]
        source: Box<GitError>,
    },

    #[error("cannot update: repository has uncommitted changes")]
    UncommittedChanges,

    #[error("failed to {action}: {source}")]
    Command {
        action: &'static str,
        #[source]
        source: CommandError,
    },
}

impl GitError {
    /// True for the dirty-tree guard raised by update, as opposed to a
    /// transport or git failure.
    pub fn is_uncommitted_changes(&self) -> bool {
        matches!(self, GitError::UncommittedChanges)
    }

    /// True when the underlying command was killed after exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            GitError::CloneFailed { source, .. }
            | GitError::FetchFailed { source }
            | GitError::PullFailed { source }
            | GitError::CheckoutFailed { source, .. }
            | GitError::DeleteFailed { source, .. }
            | GitError::CurrentBranchFailed { source }
            | GitError::Command { source, .. } => source.is_timeout(),
            GitError::DefaultBranchUndetermined { source } => source.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::time::Duration;

    fn failed(stderr: &str) -> CommandError {
        CommandError::Failed {
            program: "git".to_string(),
            args: vec!["pull".to_string()],
            code: Some(1),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_wrapped_error_keeps_underlying_message() {
        let err = GitError::PullFailed {
            source: failed("fatal: couldn't find remote ref"),
        };

        let msg = err.to_string();
        assert!(msg.starts_with("failed to pull"));
        assert!(msg.contains("couldn't find remote ref"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_uncommitted_changes_is_distinguishable() {
        assert!(GitError::UncommittedChanges.is_uncommitted_changes());
        assert!(!GitError::FetchFailed { source: failed("network") }.is_uncommitted_changes());
    }

    #[test]
    fn test_timeout_detected_through_wrapping() {
        let timeout = CommandError::Timeout {
            program: "git".to_string(),
            args: vec!["fetch".to_string()],
            after: Duration::from_secs(5),
        };
        let inner = GitError::CurrentBranchFailed { source: timeout };
        let outer = GitError::DefaultBranchUndetermined {
            source: Box::new(inner),
        };

        assert!(outer.is_timeout());
        assert!(!GitError::UncommittedChanges.is_timeout());
    }
}
