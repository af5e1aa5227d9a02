use serde::{Deserialize, Serialize};

/// One local branch and its relationship to its upstream, as reported by
/// `git branch -vv`.
///
/// Exactly one of these holds: the branch tracks a live upstream,
/// `no_remote_tracking` is set, or `remote_gone` is set. `ahead`/`behind`
/// are only non-zero with a live upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub current: bool,
    /// Upstream ref such as `origin/main`; kept for gone upstreams, empty
    /// when the branch tracks nothing.
    pub remote_tracking: String,
    pub no_remote_tracking: bool,
    pub remote_gone: bool,
    pub ahead: u32,
    pub behind: u32,
}

impl BranchInfo {
    /// Parse one line of `git branch -vv` output.
    ///
    /// Returns `None` for blank lines and for lines without at least a name
    /// and one more field.
    pub fn parse(line: &str) -> Option<BranchInfo> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        // `*` marks the current branch, `+` one checked out in another worktree.
        let mut branch = BranchInfo::default();
        let rest = if let Some(rest) = line.strip_prefix("* ") {
            branch.current = true;
            rest
        } else {
            line.strip_prefix("+ ").unwrap_or(line)
        };

        let mut fields = rest.split_whitespace();
        branch.name = fields.next()?.to_string();
        fields.next()?;

        let Some(tracking) = bracketed(rest) else {
            branch.no_remote_tracking = true;
            return Some(branch);
        };

        let (remote, state) = match tracking.split_once(':') {
            Some((remote, state)) => (remote.trim(), Some(state)),
            None => (tracking.trim(), None),
        };
        branch.remote_tracking = remote.to_string();

        if tokens(tracking).any(|t| t == "gone") {
            branch.remote_gone = true;
            return Some(branch);
        }

        if remote.is_empty() {
            branch.no_remote_tracking = true;
            return Some(branch);
        }

        if let Some(state) = state {
            let mut words = tokens(state);
            while let Some(word) = words.next() {
                match word {
                    "ahead" => branch.ahead = words.next().and_then(|n| n.parse().ok()).unwrap_or(0),
                    "behind" => branch.behind = words.next().and_then(|n| n.parse().ok()).unwrap_or(0),
                    _ => {}
                }
            }
        }

        Some(branch)
    }

    /// Tracks an upstream that still exists on the remote.
    pub fn has_live_upstream(&self) -> bool {
        !self.no_remote_tracking && !self.remote_gone && !self.remote_tracking.is_empty()
    }
}

/// Content of the first `[...]` segment after the branch name.
fn bracketed(rest: &str) -> Option<&str> {
    let start = rest.find('[')?;
    let end = start + rest[start..].find(']')?;
    Some(&rest[start + 1..end])
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .filter(|t| !t.is_empty())
}
