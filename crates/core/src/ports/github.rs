use super::CommandError;

/// Port for the remote-hosting CLI (`gh`). Returns captured stdout.
pub trait GithubExecutor: Send + Sync {
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>, CommandError>;
}
