//! Version guessing orchestration
//!
//! [VersionGuesser] asks git first and mercurial second. Within one VCS the
//! version is taken from the first subject that resolves, in order: an exact
//! tag on HEAD, the checked-out branch, the detached HEAD commit.

use crate::classifier::{Classification, FeatureBranchClassifier};
use crate::config::GuessConfig;
use crate::process::CommandRunner;
use crate::vcs::{BranchRecord, GitFacts, GitInspector, GitVersion, Head, HgInspector};
use crate::version::{VersionNormalizer, VersionParser, WILDCARD_COMPONENT};
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn wildcard_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?:\.{})+", WILDCARD_COMPONENT)).expect("static version pattern is valid")
    })
}

/// A guessed version
///
/// Serializes to the mapping the package loader consumes: `version`,
/// `pretty_version`, and `commit`, `feature_version`,
/// `feature_pretty_version` only when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessResult {
    /// Normalized version, e.g. `1.5.9999999.9999999-dev`
    pub version: String,
    /// Human readable version, e.g. `1.5.x-dev`
    pub pretty_version: String,
    /// Full hash of HEAD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Normalized version of the feature branch when `version` comes from its base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<String>,
    /// Pretty version of the feature branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_pretty_version: Option<String>,
}

impl GuessResult {
    pub fn new(version: impl Into<String>, pretty_version: impl Into<String>) -> Self {
        GuessResult {
            version: version.into(),
            pretty_version: pretty_version.into(),
            commit: None,
            feature_version: None,
            feature_pretty_version: None,
        }
    }

    /// Reports `feature` as the feature branch version of this result
    pub fn with_feature(mut self, feature: GuessResult) -> Self {
        self.feature_version = Some(feature.version);
        self.feature_pretty_version = Some(feature.pretty_version);
        self
    }

    pub fn with_commit(mut self, commit: Option<String>) -> Self {
        self.commit = commit;
        self
    }

    /// Drops feature keys that repeat the primary version and rewrites
    /// branch versions to their `.x-dev` pretty form.
    fn finalize(mut self) -> Self {
        if self.feature_version.as_deref() == Some(self.version.as_str())
            && self.feature_pretty_version.as_deref() == Some(self.pretty_version.as_str())
        {
            self.feature_version = None;
            self.feature_pretty_version = None;
        }

        if let Some(pretty) = branch_pretty_version(&self.version) {
            self.pretty_version = pretty;
        }
        if let Some(pretty) = self.feature_version.as_deref().and_then(branch_pretty_version) {
            self.feature_pretty_version = Some(pretty);
        }

        self
    }
}

/// `1.5.9999999.9999999-dev` -> `1.5.x-dev`; `None` for anything that is not a numeric branch version
pub fn branch_pretty_version(version: &str) -> Option<String> {
    if !version.ends_with("-dev") || !wildcard_run_regex().is_match(version) {
        return None;
    }
    Some(wildcard_run_regex().replace_all(version, ".x").into_owned())
}

/// Guesses package versions from the VCS checkout they live in
///
/// Holds no state between calls: guessing the same checkout twice issues
/// the same probes and returns the same result.
pub struct VersionGuesser<R: CommandRunner, N: VersionNormalizer = VersionParser> {
    runner: R,
    normalizer: N,
    git_version: Option<GitVersion>,
}

impl<R: CommandRunner> VersionGuesser<R> {
    /// Create a guesser with the default [VersionParser]
    pub fn new(runner: R) -> Self {
        VersionGuesser::with_normalizer(runner, VersionParser::new())
    }
}

impl<R: CommandRunner, N: VersionNormalizer> VersionGuesser<R, N> {
    pub fn with_normalizer(runner: R, normalizer: N) -> Self {
        VersionGuesser {
            runner,
            normalizer,
            git_version: None,
        }
    }

    /// Installed git version, which decides the `git log` signature flag
    pub fn with_git_version(mut self, git_version: Option<GitVersion>) -> Self {
        self.git_version = git_version;
        self
    }

    /// Guesses the version of the package checked out at `path`
    ///
    /// `config.version` is not consulted: an explicit version is the
    /// caller's to use instead of guessing (see [GuessConfig::explicit_version]).
    ///
    /// # Returns
    /// * `Some(GuessResult)` - A VCS produced a version
    /// * `None` - No supported VCS recognized the checkout; the version is unknown
    pub fn guess_version(&self, config: &GuessConfig, path: &Path) -> Option<GuessResult> {
        let classifier = FeatureBranchClassifier::new(&config.non_feature_branches);

        let guess = self
            .guess_git(&classifier, path)
            .or_else(|| self.guess_hg(&classifier, path))
            .map(GuessResult::finalize);

        match &guess {
            Some(result) => debug!(path = %path.display(), version = %result.version, pretty = %result.pretty_version, "guessed version"),
            None => debug!(path = %path.display(), "no version control detected"),
        }
        guess
    }

    fn guess_git(&self, classifier: &FeatureBranchClassifier, path: &Path) -> Option<GuessResult> {
        let git = GitInspector::new(&self.runner, path);
        let facts = git.inspect(GitVersion::signature_flag(self.git_version.as_ref()));

        let guess = self
            .tag_version(&facts)
            .or_else(|| self.git_branch_version(&facts, &git, classifier))
            .or_else(|| detached_version(&facts))?;

        Some(guess.with_commit(facts.commit().map(str::to_string)))
    }

    fn tag_version(&self, facts: &GitFacts) -> Option<GuessResult> {
        let tag = facts.exact_tag.as_deref()?;
        match self.normalizer.normalize(tag) {
            Ok(version) => Some(GuessResult::new(version, tag)),
            Err(e) => {
                warn!(tag, error = %e, "exact tag is not a version, ignoring it");
                None
            }
        }
    }

    fn git_branch_version(
        &self,
        facts: &GitFacts,
        git: &GitInspector<'_, R>,
        classifier: &FeatureBranchClassifier,
    ) -> Option<GuessResult> {
        let (name, commit) = match facts.head.as_ref()? {
            Head::Branch { name, commit } => (name, commit),
            Head::Detached { .. } => return None,
        };
        let current = BranchRecord::new(name, commit, true);
        let branches = facts.branches.as_deref().unwrap_or_default();

        Some(self.classified_version(classifier, branches, &current, |base, tip| {
            git.distance(&base.name, &tip.name)
        }))
    }

    fn guess_hg(&self, classifier: &FeatureBranchClassifier, path: &Path) -> Option<GuessResult> {
        let hg = HgInspector::new(&self.runner, path);
        let name = hg.current_branch()?;
        let current = BranchRecord::new(&name, "", true);

        if classifier.is_stable(&name) {
            return Some(self.branch_version(&name));
        }

        let branches = hg.branches(&name).unwrap_or_default();
        Some(self.classified_version(classifier, &branches, &current, |base, tip| {
            hg.distance(&base.name, &tip.name)
        }))
    }

    /// Names the current branch, or its base when it is a feature branch
    fn classified_version<F>(
        &self,
        classifier: &FeatureBranchClassifier,
        branches: &[BranchRecord],
        current: &BranchRecord,
        distance: F,
    ) -> GuessResult
    where
        F: FnMut(&BranchRecord, &BranchRecord) -> Option<usize>,
    {
        let own = self.branch_version(&current.name);
        match classifier.classify(branches, current, distance) {
            Classification::Feature { base } => self.branch_version(base.short_name()).with_feature(own),
            Classification::Stable | Classification::Unresolved => own,
        }
    }

    fn branch_version(&self, name: &str) -> GuessResult {
        GuessResult::new(self.normalizer.normalize_branch(name), format!("dev-{}", name))
    }
}

fn detached_version(facts: &GitFacts) -> Option<GuessResult> {
    match facts.head.as_ref()? {
        Head::Detached { commit } => {
            let version = format!("dev-{}", commit);
            Some(GuessResult::new(version.clone(), version))
        }
        Head::Branch { .. } => None,
    }
}
