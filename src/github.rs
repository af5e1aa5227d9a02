use anyhow::{Context, Result};
use gitfleet_core::ports::GithubExecutor;
use gitfleet_core::Repository;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_HOST: &str = "github.com";

#[derive(Debug, Deserialize)]
struct GhRepo {
    name: String,
    owner: GhOwner,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct GhOwner {
    login: String,
}

/// List repositories visible to the `gh` CLI, for `owner` or the
/// authenticated user.
pub fn list_repositories(
    executor: &dyn GithubExecutor,
    owner: Option<&str>,
    limit: usize,
) -> Result<Vec<Repository>> {
    let limit = limit.to_string();
    let mut args = vec!["repo", "list"];
    if let Some(owner) = owner {
        args.push(owner);
    }
    args.extend(["--json", "name,owner,url", "--limit", limit.as_str()]);

    let output = executor.execute(&args).context("Failed to list GitHub repositories")?;
    let listed: Vec<GhRepo> =
        serde_json::from_slice(&output).context("Failed to parse `gh repo list` output")?;
    debug!(count = listed.len(), "listed GitHub repositories");

    Ok(listed
        .into_iter()
        .map(|repo| Repository::new(host_of(&repo.url), repo.owner.login, repo.name))
        .collect())
}

/// SSH clone URL for a listed repository.
pub fn clone_url(repo: &Repository) -> String {
    format!("git@{}:{}/{}.git", repo.host, repo.organization, repo.name)
}

fn host_of(url: &str) -> String {
    url.split_once("://")
        .and_then(|(_, rest)| rest.split('/').next())
        .filter(|host| !host.is_empty())
        .unwrap_or(DEFAULT_HOST)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGithubExecutor;

    const LISTING: &str = r#"[
        {"name": "widget", "owner": {"login": "acme"}, "url": "https://github.com/acme/widget"},
        {"name": "gadget", "owner": {"login": "acme"}, "url": "https://ghe.example.com/acme/gadget"},
        {"name": "bare", "owner": {"login": "acme"}}
    ]"#;

    #[test]
    fn test_list_repositories_parses_listing() {
        let gh = MockGithubExecutor::with_output(LISTING);
        let repos = list_repositories(&gh, Some("acme"), 50).unwrap();

        assert_eq!(repos.len(), 3);
        assert_eq!(repos[0].full_name(), "github.com/acme/widget");
        assert_eq!(repos[1].host, "ghe.example.com");
        assert_eq!(repos[2].host, "github.com");

        let calls = gh.called_with.lock().unwrap();
        assert_eq!(
            calls[0],
            vec!["repo", "list", "acme", "--json", "name,owner,url", "--limit", "50"]
        );
    }

    #[test]
    fn test_list_without_owner() {
        let gh = MockGithubExecutor::with_output("[]");
        assert!(list_repositories(&gh, None, 1000).unwrap().is_empty());
        assert_eq!(gh.called_with.lock().unwrap()[0][2], "--json");
    }

    #[test]
    fn test_list_errors_keep_context() {
        let gh = MockGithubExecutor::failing("gh: not logged in");
        let err = list_repositories(&gh, None, 10).unwrap_err();
        assert!(format!("{err:#}").contains("not logged in"));

        let gh = MockGithubExecutor::with_output("not json");
        let err = list_repositories(&gh, None, 10).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_clone_url() {
        let repo = Repository::new("github.com", "acme", "widget");
        assert_eq!(clone_url(&repo), "git@github.com:acme/widget.git");
    }
}
