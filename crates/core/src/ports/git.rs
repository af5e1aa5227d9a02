use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single external command invocation.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} {} exited with {}: {stderr}", args.join(" "), exit_label(code))]
    Failed {
        program: String,
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} {} timed out after {after:?}", args.join(" "))]
    Timeout {
        program: String,
        args: Vec<String>,
        after: Duration,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }
}

/// Port for running the version-control binary against a working tree.
///
/// `repo_path` scopes the command to a repository (empty path means no
/// scoping). With `stream` set, output goes straight to the user's terminal
/// and the returned payload is empty.
pub trait GitExecutor: Send + Sync {
    fn execute(&self, repo_path: &Path, stream: bool, args: &[&str]) -> Result<Vec<u8>, CommandError>;
}
