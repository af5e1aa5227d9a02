use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A repository identified by `host/organization/name`, optionally bound
/// to a local working tree.
///
/// Repositories discovered on disk without a recognisable host segment
/// only carry `name` and `path`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub host: String,
    pub organization: String,
    pub name: String,
    pub path: PathBuf,
}

impl Repository {
    pub fn new(host: impl Into<String>, organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            organization: organization.into(),
            name: name.into(),
            path: PathBuf::new(),
        }
    }

    /// A repository with no host/organization, only a name and a path.
    pub fn bare(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Location of this repository under `root`: `root/host/organization/name`.
    pub fn target_path(&self, root: &Path) -> PathBuf {
        root.join(&self.host).join(&self.organization).join(&self.name)
    }

    /// `host/organization/name`, or just the name for bare repositories.
    pub fn full_name(&self) -> String {
        if self.host.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}/{}", self.host, self.organization, self.name)
        }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.path.display())
    }
}
