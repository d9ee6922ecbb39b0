//! Read-only inspectors for the supported version control systems
//!
//! Each inspector turns the textual output of a few VCS commands into
//! facts the guesser can reason about. Nothing here writes to a checkout.

pub mod git;
pub mod hg;

pub use git::{GitFacts, GitInspector, GitVersion, Head};
pub use hg::HgInspector;

/// Remote prefixes whose branches are considered alongside local ones
pub const TRACKED_REMOTE_PREFIXES: [&str; 2] = ["remotes/origin/", "remotes/upstream/"];

/// One branch of a branch listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    /// Name as listed, including any `remotes/<remote>/` prefix
    pub name: String,
    /// Full hash of the branch tip (empty when the VCS did not report it)
    pub commit_hash: String,
    /// Whether this is the checked-out branch
    pub is_current: bool,
}

impl BranchRecord {
    pub fn new(name: impl Into<String>, commit_hash: impl Into<String>, is_current: bool) -> Self {
        BranchRecord {
            name: name.into(),
            commit_hash: commit_hash.into(),
            is_current,
        }
    }

    /// Branch name without a tracked remote prefix (`remotes/origin/1.5` -> `1.5`)
    pub fn short_name(&self) -> &str {
        TRACKED_REMOTE_PREFIXES
            .iter()
            .find_map(|prefix| self.name.strip_prefix(prefix))
            .unwrap_or(&self.name)
    }

    /// Whether this record tracks a branch of `origin` or `upstream`
    pub fn is_remote(&self) -> bool {
        self.short_name().len() != self.name.len()
    }
}
