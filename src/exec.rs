use gitfleet_core::ports::{CommandError, GitExecutor, GithubExecutor};
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Runs the `git` binary, scoping each call to a working tree with `-C`.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    timeout: Option<Duration>,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
            timeout: None,
        }
    }

    /// Kill commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitExecutor for GitCli {
    fn execute(&self, repo_path: &Path, stream: bool, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let args = scoped_args(repo_path, args);
        // Captured runs happen in parallel; a credential prompt there would hang.
        let env: &[(&str, &str)] = if stream { &[] } else { &[("GIT_TERMINAL_PROMPT", "0")] };
        run_command(&self.program, &args, stream, self.timeout, env)
    }
}

/// Runs the GitHub CLI (`gh`) and captures its output.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: String,
    timeout: Option<Duration>,
}

impl GhCli {
    pub fn new() -> Self {
        Self {
            program: "gh".to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubExecutor for GhCli {
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        run_command(&self.program, &args, false, self.timeout, &[])
    }
}

/// Prefix `args` with `-C <dir>` when `repo_path` is set.
///
/// A clone targets a directory that does not exist yet, so it is scoped to
/// the parent of `repo_path` instead.
pub fn scoped_args(repo_path: &Path, args: &[&str]) -> Vec<OsString> {
    let mut scoped = Vec::with_capacity(args.len() + 2);
    if !repo_path.as_os_str().is_empty() && !args.is_empty() {
        let dir = if args[0] == "clone" {
            repo_path.parent().unwrap_or(repo_path)
        } else {
            repo_path
        };
        scoped.push(OsString::from("-C"));
        scoped.push(dir.as_os_str().to_owned());
    }
    scoped.extend(args.iter().map(OsString::from));
    scoped
}

/// Run `program` to completion.
///
/// In streaming mode stdio is inherited and the returned output is empty.
/// Otherwise stdout is returned and a non-zero exit becomes
/// [`CommandError::Failed`] carrying stderr.
pub fn run_command(
    program: &str,
    args: &[OsString],
    stream: bool,
    timeout: Option<Duration>,
    env: &[(&str, &str)],
) -> Result<Vec<u8>, CommandError> {
    let shown: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    debug!(program, args = ?shown, stream, "running command");

    let mut cmd = Command::new(program);
    cmd.args(args).envs(env.iter().copied());
    if stream {
        cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    let spawn_error = |source| CommandError::Spawn {
        program: program.to_string(),
        source,
    };

    let mut child = cmd.spawn().map_err(spawn_error)?;

    // Drain pipes while waiting so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit).map_err(spawn_error)? {
            Some(status) => status,
            None => {
                warn!(program, args = ?shown, ?limit, "command timed out, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    args: shown,
                    after: limit,
                });
            }
        },
        None => child.wait().map_err(spawn_error)?,
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if !status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            args: shown,
            code: status.code(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(stdout)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
