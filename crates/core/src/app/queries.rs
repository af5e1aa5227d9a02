use crate::domain::Repository;

/// Exact-match filter on repository identity. Unset or empty fields do not
/// participate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoFilter {
    pub host: Option<String>,
    pub organization: Option<String>,
    pub name: Option<String>,
}

fn active(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

impl RepoFilter {
    pub fn is_empty(&self) -> bool {
        active(&self.host).is_none() && active(&self.organization).is_none() && active(&self.name).is_none()
    }

    pub fn matches(&self, repo: &Repository) -> bool {
        active(&self.host).map_or(true, |host| repo.host == host)
            && active(&self.organization).map_or(true, |org| repo.organization == org)
            && active(&self.name).map_or(true, |name| repo.name == name)
    }

    /// Keep matching repositories in their original order.
    pub fn apply(&self, repositories: Vec<Repository>) -> Vec<Repository> {
        if self.is_empty() {
            return repositories;
        }
        repositories.into_iter().filter(|repo| self.matches(repo)).collect()
    }
}

/// Aggregate counts over one orchestrated run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// The operation itself failed for these repositories
    pub failed: usize,
    /// The operation succeeded but reported something to act on
    pub with_issues: usize,
}

impl RunSummary {
    pub fn record_failure(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    pub fn record_issue(&mut self) {
        self.total += 1;
        self.with_issues += 1;
    }

    pub fn record_clean(&mut self) {
        self.total += 1;
    }

    pub fn clean(&self) -> usize {
        self.total - self.failed - self.with_issues
    }

    pub fn is_all_clean(&self) -> bool {
        self.failed == 0 && self.with_issues == 0
    }
}
