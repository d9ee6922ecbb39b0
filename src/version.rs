//! Version string normalization.
//!
//! Converts tags and branch names into the dependency manager's version
//! grammar: four numeric components with an optional stability suffix for
//! releases, `N.N.9999999.9999999-dev` for numeric branches and
//! `dev-<name>` for everything else.

use crate::error::{GuessError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Version given to the master-like branches.
///
/// Sorts above every numbered release in the consuming resolver; the literal
/// value is part of the version grammar and must not change.
pub const DEV_VERSION: &str = "9999999-dev";

/// Placeholder for a wildcard or missing component of a branch version
pub const WILDCARD_COMPONENT: &str = "9999999";

/// Branch names treated as the unbounded development line
pub const MASTER_LIKE_BRANCHES: [&str; 3] = ["master", "trunk", "default"];

const MODIFIER: &str =
    r"[._-]?(?:(stable|beta|b|RC|alpha|a|patch|pl|p)((?:[.-]?\d+)*)?)?([.-]?dev)?";

/// Parses and canonicalizes version strings.
///
/// Implemented by [VersionParser]; the guesser only depends on this trait so
/// callers can plug in a different grammar.
pub trait VersionNormalizer: Send + Sync {
    /// Normalize a release version or tag, e.g. `v2.0.5-alpha2` -> `2.0.5.0-alpha2`
    ///
    /// # Returns
    /// * `Ok(String)` - Canonical version
    /// * `Err` - If the text is not a version
    fn normalize(&self, version: &str) -> Result<String>;

    /// Normalize a branch name, e.g. `1.5` -> `1.5.9999999.9999999-dev`, `foo` -> `dev-foo`
    ///
    /// Never fails: names without a version shape become `dev-<name>`.
    fn normalize_branch(&self, name: &str) -> String;
}

/// Default [VersionNormalizer]
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionParser;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static version pattern is valid"))
}

fn alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([^,\s]+) +as +([^,\s]+)$")
}

fn stability_flag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)@(?:stable|RC|beta|alpha|dev)$")
}

fn master_like_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)^(?:dev-)?(?:master|trunk|default)$")
}

fn build_metadata_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([^,\s+]+)\+\S+$")
}

fn classical_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^v?(\d{{1,5}})(\.\d+)?(\.\d+)?(\.\d+)?{}$",
            MODIFIER
        ))
        .expect("static version pattern is valid")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^v?(\d{{4}}(?:[.:-]?\d{{2}}){{1,6}}(?:[.:-]?\d{{1,3}})?){}$",
            MODIFIER
        ))
        .expect("static version pattern is valid")
    })
}

fn dev_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)^(.*?)[.-]?dev$")
}

fn branch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(?i)^v?(\d+)(\.(?:\d+|[x*]))?(\.(?:\d+|[x*]))?(\.(?:\d+|[x*]))?$",
    )
}

/// Expands short stability names: `a` -> `alpha`, `b` -> `beta`, `p`/`pl` -> `patch`, `rc` -> `RC`
fn expand_stability(stability: &str) -> String {
    match stability.to_lowercase().as_str() {
        "a" => "alpha".to_string(),
        "b" => "beta".to_string(),
        "p" | "pl" => "patch".to_string(),
        "rc" => "RC".to_string(),
        other => other.to_string(),
    }
}

impl VersionParser {
    pub fn new() -> Self {
        VersionParser
    }

    /// Appends the stability and dev modifiers captured from `index` onwards
    fn apply_modifier(mut version: String, captures: &regex::Captures<'_>, index: usize) -> String {
        if let Some(stability) = captures.get(index).map(|m| m.as_str()) {
            if stability.eq_ignore_ascii_case("stable") {
                return version;
            }
            let number = captures
                .get(index + 1)
                .map(|m| m.as_str().trim_start_matches(['.', '-']))
                .unwrap_or("");
            version.push('-');
            version.push_str(&expand_stability(stability));
            version.push_str(number);
        }
        if captures.get(index + 2).is_some() {
            version.push_str("-dev");
        }
        version
    }
}

impl VersionNormalizer for VersionParser {
    fn normalize(&self, version: &str) -> Result<String> {
        let original = version.trim();
        if original.is_empty() {
            return Err(GuessError::version("Version string is empty"));
        }

        let mut version = original;
        if let Some(captures) = alias_regex().captures(version) {
            if let Some(aliased) = captures.get(1) {
                version = aliased.as_str();
            }
        }
        if let Some(flag) = stability_flag_regex().find(version) {
            version = &version[..flag.start()];
        }

        if master_like_regex().is_match(version) {
            return Ok(DEV_VERSION.to_string());
        }
        if let Some(branch) = version
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("dev-"))
            .map(|_| &version[4..])
        {
            return Ok(format!("dev-{}", branch));
        }

        if let Some(captures) = build_metadata_regex().captures(version) {
            if let Some(stripped) = captures.get(1) {
                version = stripped.as_str();
            }
        }

        if let Some(captures) = classical_regex().captures(version) {
            let mut normalized = captures[1].to_string();
            for index in 2..=4 {
                normalized.push_str(captures.get(index).map_or(".0", |m| m.as_str()));
            }
            return Ok(Self::apply_modifier(normalized, &captures, 5));
        }

        if let Some(captures) = date_regex().captures(version) {
            let normalized: String = captures[1]
                .chars()
                .map(|c| if c.is_ascii_digit() { c } else { '.' })
                .collect();
            return Ok(Self::apply_modifier(normalized, &captures, 2));
        }

        if let Some(captures) = dev_suffix_regex().captures(version) {
            let normalized = self.normalize_branch(&captures[1]);
            if !normalized.starts_with("dev-") {
                return Ok(normalized);
            }
        }

        Err(GuessError::version(format!(
            "Invalid version string \"{}\"",
            original
        )))
    }

    fn normalize_branch(&self, name: &str) -> String {
        let name = name.trim();

        if MASTER_LIKE_BRANCHES.contains(&name) {
            return DEV_VERSION.to_string();
        }

        if let Some(captures) = branch_regex().captures(name) {
            let mut version = String::new();
            for index in 1..=4 {
                match captures.get(index) {
                    Some(component) => version.push_str(&component.as_str().replace(['*', 'X'], "x")),
                    None => version.push_str(".x"),
                }
            }
            return format!("{}-dev", version.replace('x', WILDCARD_COMPONENT));
        }

        format!("dev-{}", name)
    }
}
