use thiserror::Error;

/// Unified error type for version-guesser operations
#[derive(Error, Debug)]
pub enum GuessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Invalid branch pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Command failed: {0}")]
    Process(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Results in version-guesser
pub type Result<T> = std::result::Result<T, GuessError>;

impl GuessError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GuessError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        GuessError::Version(msg.into())
    }

    /// Create a process error with context
    pub fn process(msg: impl Into<String>) -> Self {
        GuessError::Process(msg.into())
    }
}
