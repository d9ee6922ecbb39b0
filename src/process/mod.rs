//! Command execution abstraction layer
//!
//! This module provides a trait-based abstraction over running VCS commands,
//! allowing for multiple implementations including a real shell-backed runner
//! and a scripted mock for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [CommandRunner] trait. The concrete
//! implementations include:
//!
//! - [ShellRunner]: splits a command line into words and runs it directly
//! - [mock::MockRunner]: replays scripted outputs for testing
//!
//! # Usage
//!
//! The inspectors only ever depend on [CommandRunner], so they can be driven
//! by canned output without a real checkout.
//!
//! ```rust
//! # use version_guesser::process::CommandRunner;
//! # use std::path::Path;
//! # fn example<R: CommandRunner>(runner: &R) -> version_guesser::Result<()> {
//! let output = runner.execute("hg branch", Path::new("."))?;
//! if output.success() {
//!     println!("on branch {}", output.stdout.trim());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;

pub use mock::MockRunner;

use crate::error::{GuessError, Result};
use std::borrow::Cow;
use std::path::Path;
use std::process::Command;

/// Exit status and captured standard output of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, `-1` when the process was killed by a signal
    pub status: i32,
    /// Captured standard output
    pub stdout: String,
}

impl CommandOutput {
    /// Create a new command output
    pub fn new(status: i32, stdout: impl Into<String>) -> Self {
        CommandOutput {
            status,
            stdout: stdout.into(),
        }
    }

    /// Whether the command exited with status `0`
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Lines of standard output, with surrounding whitespace and empty lines removed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
    }
}

/// Common command execution trait for abstraction
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync` so one runner can serve guesses
/// issued from several threads.
///
/// ## Error Handling
///
/// `Err` is reserved for failures to run the command at all (missing shell,
/// bad working directory). A command that runs and exits non-zero is an
/// `Ok` with a non-zero [CommandOutput::status].
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `cwd` as the working directory
    ///
    /// # Arguments
    /// * `command` - Full command line, e.g. `git describe --exact-match --tags`
    /// * `cwd` - Directory the command runs in
    ///
    /// # Returns
    /// * `Ok(CommandOutput)` - The command ran (whatever its exit code)
    /// * `Err` - The command could not be started
    fn execute(&self, command: &str, cwd: &Path) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn execute(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        (**self).execute(command, cwd)
    }
}

/// Quotes one value so [ShellRunner] receives it as part of a single word
///
/// Names read from a checkout go through this before being put in a command
/// line. Values that need no quoting are returned unchanged.
pub fn quote_arg(arg: &str) -> Result<Cow<'_, str>> {
    shlex::try_quote(arg).map_err(|e| GuessError::process(format!("cannot quote '{}': {}", arg, e)))
}

/// Runs commands without a shell
///
/// The command line is split into words with POSIX quoting rules and the
/// first word is executed with the rest as arguments, so no expansion,
/// redirection or command chaining ever happens.
///
/// The environment is pinned so VCS output is parseable: repository
/// overrides are removed, messages are forced to the C locale and git never
/// waits on a credential prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        ShellRunner
    }

    fn command(command: &str) -> Result<Command> {
        let words = shlex::split(command)
            .ok_or_else(|| GuessError::process(format!("unbalanced quoting in '{}'", command)))?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| GuessError::process("empty command"))?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

impl CommandRunner for ShellRunner {
    fn execute(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        let output = Self::command(command)?
            .current_dir(cwd)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env("LC_ALL", "C")
            .env("LANGUAGE", "C")
            .env("GIT_ASKPASS", "echo")
            .output()?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
