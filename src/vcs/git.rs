//! Git inspection through the `git` command line.
//!
//! All probes are read-only. A probe that cannot run or exits non-zero is
//! reported as `None`; it is up to the caller to decide what to fall back to.

use crate::process::{quote_arg, CommandOutput, CommandRunner};
use crate::vcs::BranchRecord;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

pub const BRANCH_LIST_COMMAND: &str = "git branch -a --no-color --no-abbrev -v";
pub const EXACT_TAG_COMMAND: &str = "git describe --exact-match --tags";
pub const HEAD_COMMIT_COMMAND: &str = "git log --pretty=\"%H\" -n1 HEAD";
pub const VERSION_COMMAND: &str = "git --version";

/// Appended to `git log` on gits that may print signatures by default
pub const NO_SHOW_SIGNATURE_FLAG: &str = " --no-show-signature";

fn current_branch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\* +(\([^)]*\)|\S+) +([a-f0-9]+)(?: .*)?$")
            .expect("static branch pattern is valid")
    })
}

fn branch_record_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\* )? *([^\s(]\S*) +([a-f0-9]+)(?: .*)?$")
            .expect("static branch pattern is valid")
    })
}

fn head_alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*? *\S+/HEAD ").expect("static branch pattern is valid"))
}

fn git_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"git version (\d+)\.(\d+)(?:\.(\d+))?").expect("static version pattern is valid")
    })
}

/// What HEAD points at according to the branch listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// A named branch is checked out
    Branch { name: String, commit: String },
    /// HEAD points directly at a commit: `(no branch)`, `(HEAD detached at X)`, ...
    Detached { commit: String },
}

impl Head {
    pub fn commit(&self) -> &str {
        match self {
            Head::Branch { commit, .. } | Head::Detached { commit } => commit,
        }
    }
}

/// Everything the first git probes found out about a checkout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitFacts {
    /// Parsed branch listing, `None` when listing branches failed
    pub branches: Option<Vec<BranchRecord>>,
    /// Checked-out branch or detached commit
    pub head: Option<Head>,
    /// Tag pointing exactly at HEAD
    pub exact_tag: Option<String>,
    /// HEAD hash from `git log`, only probed when the listing gave none
    pub head_commit: Option<String>,
}

impl GitFacts {
    /// Full hash of HEAD, from the listing or from `git log`
    pub fn commit(&self) -> Option<&str> {
        self.head
            .as_ref()
            .map(Head::commit)
            .or(self.head_commit.as_deref())
            .filter(|hash| !hash.is_empty())
    }
}

/// Parses `git branch -a --no-color --no-abbrev -v` output
///
/// Returns every local and remote branch record plus the checked-out HEAD.
/// `remotes/<remote>/HEAD` alias lines are skipped.
pub fn parse_branch_listing(output: &str) -> (Vec<BranchRecord>, Option<Head>) {
    let mut records = Vec::new();
    let mut head = None;

    for line in output.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        if let Some(captures) = current_branch_regex().captures(line) {
            let name = &captures[1];
            let commit = captures[2].to_string();
            head = Some(if name.starts_with('(') {
                Head::Detached { commit }
            } else {
                Head::Branch {
                    name: name.to_string(),
                    commit,
                }
            });
        }

        if head_alias_regex().is_match(line) {
            continue;
        }
        if let Some(captures) = branch_record_regex().captures(line) {
            records.push(BranchRecord::new(
                &captures[1],
                &captures[2],
                line.starts_with("* "),
            ));
        }
    }

    (records, head)
}

/// Runs git probes against one working directory
pub struct GitInspector<'a, R: CommandRunner> {
    runner: &'a R,
    path: &'a Path,
}

impl<'a, R: CommandRunner> GitInspector<'a, R> {
    pub fn new(runner: &'a R, path: &'a Path) -> Self {
        GitInspector { runner, path }
    }

    /// Runs the branch listing, the exact-tag probe and, when still needed,
    /// the HEAD commit probe, in that order.
    ///
    /// # Arguments
    /// * `signature_flag` - Suffix for the `git log` probe, see [GitVersion::signature_flag]
    pub fn inspect(&self, signature_flag: &str) -> GitFacts {
        let mut facts = GitFacts::default();

        if let Some((records, head)) = self.branches() {
            facts.branches = Some(records);
            facts.head = head;
        }
        facts.exact_tag = self.exact_tag();
        if facts.commit().is_none() {
            facts.head_commit = self.head_commit(signature_flag);
        }

        facts
    }

    /// Lists local and tracked remote branches
    pub fn branches(&self) -> Option<(Vec<BranchRecord>, Option<Head>)> {
        self.run(BRANCH_LIST_COMMAND)
            .map(|output| parse_branch_listing(&output.stdout))
    }

    /// Tag pointing exactly at HEAD
    pub fn exact_tag(&self) -> Option<String> {
        self.run(EXACT_TAG_COMMAND)
            .map(|output| output.stdout.trim().to_string())
            .filter(|tag| !tag.is_empty())
    }

    /// Full hash of HEAD
    pub fn head_commit(&self, signature_flag: &str) -> Option<String> {
        let command = format!("{}{}", HEAD_COMMIT_COMMAND, signature_flag);
        self.run(&command)
            .map(|output| output.stdout.trim().to_string())
            .filter(|hash| !hash.is_empty())
    }

    /// Number of commits on `tip` that are not reachable from `base`
    pub fn distance(&self, base: &str, tip: &str) -> Option<usize> {
        let command = match (quote_arg(base), quote_arg(tip)) {
            (Ok(base), Ok(tip)) => format!("git rev-list {}..{}", base, tip),
            (Err(e), _) | (_, Err(e)) => {
                debug!(base, tip, error = %e, "branch name cannot be passed to git");
                return None;
            }
        };
        self.run(&command).map(|output| output.lines().count())
    }

    fn run(&self, command: &str) -> Option<CommandOutput> {
        match self.runner.execute(command, self.path) {
            Ok(output) if output.success() => Some(output),
            Ok(output) => {
                debug!(command, status = output.status, "git probe unavailable");
                None
            }
            Err(e) => {
                debug!(command, error = %e, "git probe could not run");
                None
            }
        }
    }
}

/// Installed git version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitVersion(pub semver::Version);

impl GitVersion {
    /// Runs `git --version` in `path`
    pub fn detect<R: CommandRunner>(runner: &R, path: &Path) -> Option<GitVersion> {
        let output = runner.execute(VERSION_COMMAND, path).ok()?;
        if !output.success() {
            return None;
        }
        let version = GitVersion::parse(&output.stdout);
        debug!(version = ?version, "detected git version");
        version
    }

    /// Parses `git version 2.39.2 (Apple Git-143)`, `git version 2.37.1.windows.1`, ...
    pub fn parse(text: &str) -> Option<GitVersion> {
        let captures = git_version_regex().captures(text)?;
        let major = captures[1].parse().ok()?;
        let minor = captures[2].parse().ok()?;
        let patch = captures
            .get(3)
            .map_or(Some(0), |m| m.as_str().parse().ok())?;
        Some(GitVersion(semver::Version::new(major, minor, patch)))
    }

    /// git 2.10.0 introduced `log.showSignature`, which can pollute `git log` output
    pub fn supports_no_show_signature(&self) -> bool {
        self.0 >= semver::Version::new(2, 10, 0)
    }

    /// Suffix for the HEAD commit probe
    pub fn signature_flag(version: Option<&GitVersion>) -> &'static str {
        match version {
            Some(version) if version.supports_no_show_signature() => NO_SHOW_SIGNATURE_FLAG,
            _ => "",
        }
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockRunner;

    const HASH: &str = "03a15d220da53c52eddd5f32ffca64a7b3801bea";
    const OTHER: &str = "13a15d220da53c52eddd5f32ffca64a7b3801bea";

    #[test]
    fn test_parse_listing_current_branch() {
        let output = format!("  arbitrary {} Commit message\n* current {} Another message\n", HASH, OTHER);
        let (records, head) = parse_branch_listing(&output);

        assert_eq!(
            head,
            Some(Head::Branch {
                name: "current".to_string(),
                commit: OTHER.to_string()
            })
        );
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_current);
        assert!(records[1].is_current);
        assert_eq!(records[0].commit_hash, HASH);
    }

    #[test]
    fn test_parse_listing_detached_markers() {
        for marker in [
            "(no branch)",
            "(HEAD detached at FETCH_HEAD)",
            "(HEAD detached at 03a15d220)",
            "(HEAD detached from v1.0.0)",
        ] {
            let output = format!("* {} {} Commit message\n", marker, HASH);
            let (records, head) = parse_branch_listing(&output);
            assert_eq!(head, Some(Head::Detached { commit: HASH.to_string() }), "{}", marker);
            assert!(records.is_empty(), "{} should not be a branch record", marker);
        }
    }

    #[test]
    fn test_parse_listing_unmarked_no_branch_is_ignored() {
        let output = format!("* master {} Commit message\n(no branch) {} Commit message\n", HASH, HASH);
        let (records, head) = parse_branch_listing(&output);

        assert_eq!(head.map(|h| h.commit().to_string()), Some(HASH.to_string()));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "master");
    }

    #[test]
    fn test_parse_listing_remotes() {
        let output = format!(
            "* feature-branch {h} msg\n  remotes/origin/HEAD -> origin/master\n  remotes/origin/1.5 {h} msg\n  remotes/fork/2.0 {h} msg\n",
            h = HASH
        );
        let (records, _) = parse_branch_listing(&output);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["feature-branch", "remotes/origin/1.5", "remotes/fork/2.0"]);
    }

    #[test]
    fn test_parse_listing_keeps_slashed_names() {
        let output = format!(
            "  release/2.0 {h} msg\n* feature/x {o} msg\n  remotes/origin/release/2.0 {h} msg\n",
            h = HASH,
            o = OTHER
        );
        let (records, head) = parse_branch_listing(&output);

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["release/2.0", "feature/x", "remotes/origin/release/2.0"]);
        assert_eq!(records[2].short_name(), "release/2.0");
        assert_eq!(
            head,
            Some(Head::Branch {
                name: "feature/x".to_string(),
                commit: OTHER.to_string()
            })
        );
    }

    #[test]
    fn test_distance_quotes_branch_names() {
        let name = "feat;touch${IFS}PWNED";
        let expected = format!("git rev-list master..{}", quote_arg(name).unwrap());
        assert_ne!(expected, format!("git rev-list master..{}", name));

        let runner = MockRunner::new().expect(expected.as_str(), 0, format!("{}\n", HASH));
        let inspector = GitInspector::new(&runner, Path::new("."));

        assert_eq!(inspector.distance("master", name), Some(1));
        assert_eq!(runner.remaining(), 0);
    }

    #[test]
    fn test_inspect_runs_probes_in_order() {
        let runner = MockRunner::new()
            .expect(BRANCH_LIST_COMMAND, 128, "")
            .expect(EXACT_TAG_COMMAND, 0, "v1.0.0\n")
            .expect("git log --pretty=\"%H\" -n1 HEAD --no-show-signature", 0, format!("{}\n", HASH));

        let facts = GitInspector::new(&runner, Path::new(".")).inspect(NO_SHOW_SIGNATURE_FLAG);

        assert_eq!(facts.branches, None);
        assert_eq!(facts.exact_tag.as_deref(), Some("v1.0.0"));
        assert_eq!(facts.commit(), Some(HASH));
        assert_eq!(runner.remaining(), 0);
    }

    #[test]
    fn test_inspect_skips_log_when_listing_has_commit() {
        let runner = MockRunner::new()
            .expect(BRANCH_LIST_COMMAND, 0, format!("* master {} msg\n", HASH))
            .expect(EXACT_TAG_COMMAND, 128, "");

        let facts = GitInspector::new(&runner, Path::new(".")).inspect("");

        assert_eq!(facts.commit(), Some(HASH));
        assert_eq!(facts.head_commit, None);
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_distance_counts_commits() {
        let runner = MockRunner::new()
            .expect("git rev-list master..feature", 0, format!("{}\n{}\n", HASH, OTHER))
            .expect("git rev-list 1.5..feature", 0, "\n")
            .expect("git rev-list gone..feature", 128, "");
        let inspector = GitInspector::new(&runner, Path::new("."));

        assert_eq!(inspector.distance("master", "feature"), Some(2));
        assert_eq!(inspector.distance("1.5", "feature"), Some(0));
        assert_eq!(inspector.distance("gone", "feature"), None);
    }

    #[test]
    fn test_git_version_parse() {
        assert_eq!(
            GitVersion::parse("git version 2.39.2 (Apple Git-143)\n"),
            Some(GitVersion(semver::Version::new(2, 39, 2)))
        );
        assert_eq!(
            GitVersion::parse("git version 2.37.1.windows.1"),
            Some(GitVersion(semver::Version::new(2, 37, 1)))
        );
        assert_eq!(
            GitVersion::parse("git version 1.9"),
            Some(GitVersion(semver::Version::new(1, 9, 0)))
        );
        assert_eq!(GitVersion::parse("hg: unknown command"), None);
    }

    #[test]
    fn test_signature_flag_depends_on_version() {
        let old = GitVersion(semver::Version::new(2, 9, 5));
        let new = GitVersion(semver::Version::new(2, 10, 0));
        assert_eq!(GitVersion::signature_flag(Some(&old)), "");
        assert_eq!(GitVersion::signature_flag(Some(&new)), NO_SHOW_SIGNATURE_FLAG);
        assert_eq!(GitVersion::signature_flag(None), "");
    }

    #[test]
    fn test_detect_git_version() {
        let runner = MockRunner::new().expect(VERSION_COMMAND, 0, "git version 2.43.0\n");
        let version = GitVersion::detect(&runner, Path::new("."));
        assert_eq!(version.map(|v| v.to_string()), Some("2.43.0".to_string()));
    }
}
