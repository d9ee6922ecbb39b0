use crate::classifier::compile_pattern;
use crate::error::{GuessError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Version value that asks for the version to be guessed
pub const SELF_VERSION: &str = "self.version";

/// Name of the configuration file looked up next to the package
pub const CONFIG_FILE_NAME: &str = "version-guess.toml";

/// Package-level settings that steer version guessing.
///
/// ```toml
/// version = "self.version"
/// non-feature-branches = ["latest-.*", "release"]
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GuessConfig {
    /// `self.version` (or absent) to guess, anything else is used as is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Regex fragments naming branches that are release lines, matched
    /// against the full branch name
    #[serde(default)]
    pub non_feature_branches: Vec<String>,
}

impl GuessConfig {
    pub fn new() -> Self {
        GuessConfig::default()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_non_feature_branches<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_feature_branches = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Version to use instead of guessing, if one is configured
    pub fn explicit_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|version| !version.is_empty() && *version != SELF_VERSION)
    }

    /// Checks that every non-feature branch pattern compiles
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.non_feature_branches {
            compile_pattern(pattern)?;
        }
        Ok(())
    }

    /// Parses and validates a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GuessConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `version-guess.toml` in the package directory
/// 3. `version-guess.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
/// * `package_dir` - Directory of the package being inspected
///
/// # Returns
/// * `Ok(GuessConfig)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read, parsed, or holds an invalid pattern
pub fn load_config(config_path: Option<&str>, package_dir: &Path) -> Result<GuessConfig> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| GuessError::config(format!("Cannot read {}: {}", path, e)))?
    } else if package_dir.join(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(package_dir.join(CONFIG_FILE_NAME))?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(GuessConfig::default());
        }
    } else {
        return Ok(GuessConfig::default());
    };

    GuessConfig::from_toml_str(&config_str)
}
