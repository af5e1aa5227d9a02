use super::repo::Repository;
use crate::error::{GitError, Result};

/// Parse a remote URL into a repository identity (no local path).
///
/// Two shapes are accepted:
/// - scp-like SSH: `user@host:org/name`
/// - HTTP(S): `https://host/org/.../name`
///
/// A trailing `.git` never changes the result.
pub fn parse_url(url: &str) -> Result<Repository> {
    let cleaned = url.trim().trim_end_matches('/');
    let cleaned = cleaned.strip_suffix(".git").unwrap_or(cleaned);

    if let Some(rest) = cleaned
        .strip_prefix("https://")
        .or_else(|| cleaned.strip_prefix("http://"))
    {
        return parse_http(url, rest);
    }

    if cleaned.contains("://") || !cleaned.contains('@') {
        return Err(GitError::UnsupportedUrlFormat { url: url.to_string() });
    }

    parse_ssh(url, cleaned)
}

fn invalid(url: &str, reason: &'static str) -> GitError {
    GitError::InvalidUrlFormat {
        url: url.to_string(),
        reason,
    }
}

fn parse_ssh(url: &str, cleaned: &str) -> Result<Repository> {
    let (user_host, path) = cleaned
        .split_once(':')
        .ok_or_else(|| invalid(url, "missing ':' between host and path"))?;

    let host = user_host.split_once('@').map_or(user_host, |(_, host)| host);

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 {
        return Err(invalid(url, "expected organization/name after ':'"));
    }

    // Only the segment right before the name counts as the organization;
    // deeper group paths are dropped.
    let name = segments[segments.len() - 1];
    let organization = segments[segments.len() - 2];

    build(url, host, organization, name)
}

fn parse_http(url: &str, rest: &str) -> Result<Repository> {
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() < 3 {
        return Err(invalid(url, "expected host/organization/name"));
    }

    build(url, segments[0], segments[1], segments[segments.len() - 1])
}

fn build(url: &str, host: &str, organization: &str, name: &str) -> Result<Repository> {
    if host.is_empty() || organization.is_empty() || name.is_empty() {
        return Err(invalid(url, "empty host, organization or name"));
    }
    Ok(Repository::new(host, organization, name))
}
