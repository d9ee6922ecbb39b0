//! Stable vs feature branch classification.
//!
//! A branch is stable (a release line) when one of an ordered list of rules
//! matches its name. A checkout on any other branch is a feature branch,
//! reported against the nearest stable branch it grew out of.

use crate::version::MASTER_LIKE_BRANCHES;
use crate::vcs::BranchRecord;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn numeric_branch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^v?\d+(?:\.(?:\d+|[x*])){1,3}$").expect("static branch pattern is valid")
    })
}

/// Compiles a `non-feature-branches` fragment into a full-name matcher
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// One reason a branch name counts as stable
#[derive(Debug, Clone)]
pub enum StableRule {
    /// A configured `non-feature-branches` pattern
    Configured(Regex),
    /// `master`, `trunk` or `default`
    Named,
    /// `1.5`, `2.x`, `v3.0.*`, ...
    Numeric,
}

impl StableRule {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            StableRule::Configured(pattern) => pattern.is_match(name),
            StableRule::Named => MASTER_LIKE_BRANCHES.contains(&name),
            StableRule::Numeric => numeric_branch_regex().is_match(name),
        }
    }
}

impl fmt::Display for StableRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StableRule::Configured(pattern) => write!(f, "configured pattern {}", pattern.as_str()),
            StableRule::Named => write!(f, "release line name"),
            StableRule::Numeric => write!(f, "numeric version branch"),
        }
    }
}

/// Outcome of classifying the checked-out branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The current branch is itself a release line
    Stable,
    /// The current branch is a feature branch of `base`
    Feature { base: BranchRecord },
    /// A feature branch with no usable stable base
    Unresolved,
}

/// Decides which branches are release lines
#[derive(Debug, Clone)]
pub struct FeatureBranchClassifier {
    rules: Vec<StableRule>,
}

impl FeatureBranchClassifier {
    /// Builds the rule list: configured patterns in order, then the named
    /// release lines, then numeric branches.
    ///
    /// Patterns that do not compile are skipped with a warning.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut rules: Vec<StableRule> = patterns
            .iter()
            .filter_map(|pattern| match compile_pattern(pattern.as_ref()) {
                Ok(regex) => Some(StableRule::Configured(regex)),
                Err(e) => {
                    warn!(pattern = pattern.as_ref(), error = %e, "ignoring invalid non-feature branch pattern");
                    None
                }
            })
            .collect();
        rules.push(StableRule::Named);
        rules.push(StableRule::Numeric);

        FeatureBranchClassifier { rules }
    }

    /// First rule matching `name`, if any
    pub fn stable_rule(&self, name: &str) -> Option<&StableRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    pub fn is_stable(&self, name: &str) -> bool {
        self.stable_rule(name).is_some()
    }

    /// Classifies `current` against the other known branches
    ///
    /// On a feature branch every stable branch is a candidate base.
    /// `distance` reports how many commits `current` has that a candidate
    /// lacks, or `None` when that cannot be determined (the candidate is
    /// then dropped). The nearest candidate wins; ties go to local branches
    /// first, then to listing order.
    ///
    /// # Arguments
    /// * `branches` - Known branches, in listing order
    /// * `current` - The checked-out branch
    /// * `distance` - Ancestry probe, called as `distance(candidate, current)`
    pub fn classify<F>(&self, branches: &[BranchRecord], current: &BranchRecord, mut distance: F) -> Classification
    where
        F: FnMut(&BranchRecord, &BranchRecord) -> Option<usize>,
    {
        if let Some(rule) = self.stable_rule(current.short_name()) {
            debug!(branch = %current.name, %rule, "current branch is stable");
            return Classification::Stable;
        }

        let base = candidates(branches, current.short_name(), |name| self.is_stable(name))
            .into_iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                distance(candidate, current).map(|commits| (commits, candidate.is_remote(), index, candidate))
            })
            .min_by_key(|(commits, is_remote, index, _)| (*commits, *is_remote, *index))
            .map(|(commits, _, _, candidate)| {
                debug!(feature = %current.name, base = %candidate.name, commits, "found base branch");
                candidate.clone()
            });

        match base {
            Some(base) => Classification::Feature { base },
            None => Classification::Unresolved,
        }
    }
}

/// Stable branches other than `current`, with a remote record dropped when
/// a local branch of the same name points at the same commit
fn candidates<'b>(branches: &'b [BranchRecord], current: &str, is_stable: impl Fn(&str) -> bool) -> Vec<&'b BranchRecord> {
    branches
        .iter()
        .filter(|branch| branch.short_name() != current && is_stable(branch.short_name()))
        .filter(|branch| {
            !branch.is_remote()
                || !branches.iter().any(|local| {
                    !local.is_remote()
                        && local.name == branch.short_name()
                        && local.commit_hash == branch.commit_hash
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "03a15d220da53c52eddd5f32ffca64a7b3801bea";
    const OTHER: &str = "13a15d220da53c52eddd5f32ffca64a7b3801bea";

    fn no_probe(_: &BranchRecord, _: &BranchRecord) -> Option<usize> {
        panic!("stable branches must not be probed")
    }

    #[test]
    fn test_rules_in_order() {
        let classifier = FeatureBranchClassifier::new(&["latest-.*"]);

        assert!(matches!(classifier.stable_rule("latest-testing"), Some(StableRule::Configured(_))));
        assert!(matches!(classifier.stable_rule("master"), Some(StableRule::Named)));
        assert!(matches!(classifier.stable_rule("1.5"), Some(StableRule::Numeric)));
        assert!(matches!(classifier.stable_rule("2.x"), Some(StableRule::Numeric)));
        assert!(classifier.stable_rule("feature").is_none());
        assert!(classifier.stable_rule("develop").is_none());
    }

    #[test]
    fn test_slashed_names_match_configured_patterns() {
        let classifier = FeatureBranchClassifier::new(&["release/.*"]);
        let base = BranchRecord::new("remotes/origin/release/2.0", HASH, false);
        let current = BranchRecord::new("feature/x", OTHER, true);
        let branches = vec![current.clone(), base.clone()];

        let result = classifier.classify(&branches, &current, |_, _| Some(1));
        assert_eq!(result, Classification::Feature { base });
    }

    #[test]
    fn test_configured_patterns_match_full_name() {
        let classifier = FeatureBranchClassifier::new(&["arbitrary"]);
        assert!(classifier.is_stable("arbitrary"));
        assert!(!classifier.is_stable("arbitrary-thing"));
        assert!(!classifier.is_stable("not-arbitrary"));
    }

    #[test]
    fn test_numeric_shapes() {
        let classifier = FeatureBranchClassifier::new::<&str>(&[]);
        for name in ["1.5", "2.x", "1.0.x", "v3.1", "4.*", "1.2.3.4"] {
            assert!(classifier.is_stable(name), "{} should be stable", name);
        }
        for name in ["1", "1.5-feature", "x.1", "release-1.5"] {
            assert!(!classifier.is_stable(name), "{} should not be stable", name);
        }
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let classifier = FeatureBranchClassifier::new(&["(unclosed", "keep"]);
        assert!(classifier.is_stable("keep"));
        assert!(classifier.is_stable("master"));
    }

    #[test]
    fn test_stable_current_branch() {
        let classifier = FeatureBranchClassifier::new(&["latest-.*"]);
        let current = BranchRecord::new("latest-testing", HASH, true);
        let branches = vec![current.clone(), BranchRecord::new("master", OTHER, false)];

        assert_eq!(classifier.classify(&branches, &current, no_probe), Classification::Stable);
    }

    #[test]
    fn test_feature_branch_finds_base() {
        let classifier = FeatureBranchClassifier::new(&["arbitrary"]);
        let base = BranchRecord::new("arbitrary", HASH, false);
        let current = BranchRecord::new("current", OTHER, true);
        let branches = vec![base.clone(), current.clone()];

        let mut probed = Vec::new();
        let result = classifier.classify(&branches, &current, |candidate, feature| {
            probed.push(format!("{}..{}", candidate.name, feature.name));
            Some(1)
        });

        assert_eq!(result, Classification::Feature { base });
        assert_eq!(probed, vec!["arbitrary..current"]);
    }

    #[test]
    fn test_nearest_base_wins() {
        let classifier = FeatureBranchClassifier::new::<&str>(&[]);
        let current = BranchRecord::new("feature", HASH, true);
        let branches = vec![
            BranchRecord::new("master", OTHER, false),
            BranchRecord::new("1.5", OTHER, false),
            current.clone(),
        ];

        let result = classifier.classify(&branches, &current, |candidate, _| match candidate.name.as_str() {
            "master" => Some(7),
            _ => Some(2),
        });

        assert_eq!(result, Classification::Feature { base: branches[1].clone() });
    }

    #[test]
    fn test_tie_prefers_local_branch() {
        let classifier = FeatureBranchClassifier::new::<&str>(&[]);
        let current = BranchRecord::new("feature", HASH, true);
        let branches = vec![
            BranchRecord::new("remotes/origin/2.0", OTHER, false),
            BranchRecord::new("1.5", OTHER, false),
            current.clone(),
        ];

        let result = classifier.classify(&branches, &current, |_, _| Some(3));
        assert_eq!(result, Classification::Feature { base: branches[1].clone() });
    }

    #[test]
    fn test_remote_duplicate_of_local_is_not_probed() {
        let classifier = FeatureBranchClassifier::new::<&str>(&[]);
        let current = BranchRecord::new("feature", HASH, true);
        let branches = vec![
            BranchRecord::new("remotes/origin/1.5", OTHER, false),
            BranchRecord::new("1.5", OTHER, false),
            current.clone(),
        ];

        let mut probed = Vec::new();
        classifier.classify(&branches, &current, |candidate, _| {
            probed.push(candidate.name.clone());
            Some(0)
        });
        assert_eq!(probed, vec!["1.5"]);
    }

    #[test]
    fn test_failed_probes_leave_feature_unresolved() {
        let classifier = FeatureBranchClassifier::new::<&str>(&[]);
        let current = BranchRecord::new("feature", HASH, true);
        let branches = vec![BranchRecord::new("master", OTHER, false), current.clone()];

        assert_eq!(classifier.classify(&branches, &current, |_, _| None), Classification::Unresolved);
    }

    #[test]
    fn test_no_candidates_is_unresolved() {
        let classifier = FeatureBranchClassifier::new::<&str>(&[]);
        let current = BranchRecord::new("foo", HASH, true);
        let branches = vec![current.clone()];

        assert_eq!(classifier.classify(&branches, &current, no_probe), Classification::Unresolved);
    }
}
