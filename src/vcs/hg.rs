//! Mercurial inspection through the `hg` command line.

use crate::process::{CommandOutput, CommandRunner};
use crate::vcs::BranchRecord;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

pub const CURRENT_BRANCH_COMMAND: &str = "hg branch";
pub const BRANCH_LIST_COMMAND: &str = "hg branches";

fn branch_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\S.*?)\s+\d+:([a-f0-9]+)(?:\s+\([^)]*\))?$")
            .expect("static branch pattern is valid")
    })
}

/// Parses `hg branches` output (`default     12:1a2b3c4d5e6f`, optionally `(inactive)`)
pub fn parse_branches(output: &str, current: &str) -> Vec<BranchRecord> {
    output
        .lines()
        .map(str::trim_end)
        .filter_map(|line| branch_line_regex().captures(line))
        .map(|captures| BranchRecord::new(&captures[1], &captures[2], &captures[1] == current))
        .collect()
}

/// Escapes a branch name for a single-quoted revset string that itself sits
/// in a double-quoted command word
fn revset_literal(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => escaped.push_str(r"\\\\"),
            '\'' => escaped.push_str(r"\\'"),
            '"' | '$' | '`' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Runs mercurial probes against one working directory
pub struct HgInspector<'a, R: CommandRunner> {
    runner: &'a R,
    path: &'a Path,
}

impl<'a, R: CommandRunner> HgInspector<'a, R> {
    pub fn new(runner: &'a R, path: &'a Path) -> Self {
        HgInspector { runner, path }
    }

    /// Name of the checked-out branch
    pub fn current_branch(&self) -> Option<String> {
        self.run(CURRENT_BRANCH_COMMAND)
            .map(|output| output.stdout.trim().to_string())
            .filter(|branch| !branch.is_empty())
    }

    /// All named branches, with `current` flagged
    pub fn branches(&self, current: &str) -> Option<Vec<BranchRecord>> {
        self.run(BRANCH_LIST_COMMAND)
            .map(|output| parse_branches(&output.stdout, current))
    }

    /// Number of changesets on `tip` that are not ancestors of `base`
    pub fn distance(&self, base: &str, tip: &str) -> Option<usize> {
        let command = format!(
            "hg log -r \"not ancestors('{}') and ancestors('{}')\" --template \"{{node}}\\n\"",
            revset_literal(base),
            revset_literal(tip)
        );
        self.run(&command).map(|output| output.lines().count())
    }

    fn run(&self, command: &str) -> Option<CommandOutput> {
        match self.runner.execute(command, self.path) {
            Ok(output) if output.success() => Some(output),
            Ok(output) => {
                debug!(command, status = output.status, "hg probe unavailable");
                None
            }
            Err(e) => {
                debug!(command, error = %e, "hg probe could not run");
                None
            }
        }
    }
}
