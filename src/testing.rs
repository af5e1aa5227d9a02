//! Scripted executors for tests.
//!
//! Responses are matched on an argument prefix (and optionally a repository
//! path); unmatched git commands succeed with empty output.

use gitfleet_core::ports::{CommandError, GitExecutor, GithubExecutor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One recorded executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub repo_path: PathBuf,
    pub stream: bool,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
enum Response {
    Output(Vec<u8>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    repo_path: Option<PathBuf>,
    prefix: Vec<String>,
    response: Response,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<Rule>,
    calls: Vec<Call>,
}

#[derive(Debug, Clone, Default)]
pub struct MockGitExecutor {
    state: Arc<Mutex<MockState>>,
}

impl MockGitExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `stdout`.
    pub fn on(&self, prefix: &[&str], stdout: &str) -> &Self {
        self.push(None, prefix, Response::Output(stdout.as_bytes().to_vec()))
    }

    /// Fail commands starting with `prefix` with `stderr`.
    pub fn fail(&self, prefix: &[&str], stderr: &str) -> &Self {
        self.push(None, prefix, Response::Fail(stderr.to_string()))
    }

    /// Like [`on`](Self::on) but only for one repository path.
    pub fn on_repo(&self, repo_path: &Path, prefix: &[&str], stdout: &str) -> &Self {
        self.push(
            Some(repo_path.to_path_buf()),
            prefix,
            Response::Output(stdout.as_bytes().to_vec()),
        )
    }

    /// Like [`fail`](Self::fail) but only for one repository path.
    pub fn fail_repo(&self, repo_path: &Path, prefix: &[&str], stderr: &str) -> &Self {
        self.push(Some(repo_path.to_path_buf()), prefix, Response::Fail(stderr.to_string()))
    }

    fn push(&self, repo_path: Option<PathBuf>, prefix: &[&str], response: Response) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.rules.push(Rule {
            repo_path,
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            response,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded calls whose arguments start with `prefix`.
    pub fn calls_starting_with(&self, prefix: &[&str]) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| starts_with(&call.args, prefix))
            .collect()
    }

    /// Argument vectors of all calls, for asserting on command order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.args.join(" ")).collect()
    }
}

fn starts_with<S: AsRef<str>>(args: &[String], prefix: &[S]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p.as_ref())
}

impl GitExecutor for MockGitExecutor {
    fn execute(&self, repo_path: &Path, stream: bool, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            repo_path: repo_path.to_path_buf(),
            stream,
            args: args.clone(),
        });

        // Path-specific rules beat general ones, longer prefixes beat
        // shorter ones, later rules beat earlier ones.
        let best = state
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.repo_path.as_deref().is_none_or(|p| p == repo_path))
            .filter(|(_, rule)| starts_with(&args, &rule.prefix))
            .max_by_key(|(index, rule)| (rule.repo_path.is_some(), rule.prefix.len(), *index))
            .map(|(_, rule)| rule.response.clone());

        match best {
            Some(Response::Fail(stderr)) => Err(CommandError::Failed {
                program: "git".to_string(),
                args,
                code: Some(1),
                stderr,
            }),
            Some(Response::Output(stdout)) => Ok(stdout),
            None => Ok(Vec::new()),
        }
    }
}

/// Returns a fixed payload (or error) and records the arguments it saw.
#[derive(Debug, Default)]
pub struct MockGithubExecutor {
    pub output: Vec<u8>,
    pub error: Option<String>,
    pub called_with: Mutex<Vec<Vec<String>>>,
}

impl MockGithubExecutor {
    pub fn with_output(output: &str) -> Self {
        Self {
            output: output.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            error: Some(stderr.to_string()),
            ..Self::default()
        }
    }
}

impl GithubExecutor for MockGithubExecutor {
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.called_with.lock().unwrap().push(args.clone());
        match &self.error {
            Some(stderr) => Err(CommandError::Failed {
                program: "gh".to_string(),
                args,
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(self.output.clone()),
        }
    }
}
