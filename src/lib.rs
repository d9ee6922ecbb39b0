pub mod classifier;
pub mod config;
pub mod error;
pub mod guesser;
pub mod process;
pub mod ui;
pub mod vcs;
pub mod version;

pub use config::GuessConfig;
pub use error::{GuessError, Result};
pub use guesser::{GuessResult, VersionGuesser};
pub use process::{CommandOutput, CommandRunner, ShellRunner};
pub use version::{VersionNormalizer, VersionParser};
