use crate::error::{GuessError, Result};
use crate::process::{CommandOutput, CommandRunner};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// One scripted command and the output it replays
#[derive(Debug, Clone)]
struct Expectation {
    command: String,
    output: CommandOutput,
}

/// Mock runner for testing without spawning VCS binaries
///
/// Expectations are consumed strictly in order. A command that does not
/// match the next expectation, or arrives after the script is exhausted,
/// yields an `Err`, which callers treat like any other unavailable signal.
/// Every received command is recorded so tests can assert the exact probe
/// sequence.
#[derive(Debug, Default)]
pub struct MockRunner {
    expectations: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    /// Create a new mock runner with an empty script
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Script the next command: it must equal `command` and replays `status`/`stdout`
    pub fn expect(self, command: impl Into<String>, status: i32, stdout: impl Into<String>) -> Self {
        self.lock_expectations().push_back(Expectation {
            command: command.into(),
            output: CommandOutput::new(status, stdout),
        });
        self
    }

    /// Commands received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of scripted commands not yet received
    pub fn remaining(&self) -> usize {
        self.lock_expectations().len()
    }

    fn lock_expectations(&self) -> std::sync::MutexGuard<'_, VecDeque<Expectation>> {
        self.expectations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommandRunner for MockRunner {
    fn execute(&self, command: &str, _cwd: &Path) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(command.to_string());

        let mut expectations = self.lock_expectations();
        match expectations.front() {
            Some(next) if next.command == command => {
                let next = expectations.pop_front().ok_or_else(|| {
                    GuessError::process(format!("Unexpected command: {}", command))
                })?;
                Ok(next.output)
            }
            Some(next) => Err(GuessError::process(format!(
                "Expected '{}', got '{}'",
                next.command, command
            ))),
            None => Err(GuessError::process(format!(
                "Unexpected command: {}",
                command
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_replays_in_order() {
        let runner = MockRunner::new()
            .expect("hg branch", 0, "default\n")
            .expect("hg branches", 1, "");

        let first = runner.execute("hg branch", Path::new(".")).unwrap();
        assert_eq!(first.stdout, "default\n");

        let second = runner.execute("hg branches", Path::new(".")).unwrap();
        assert_eq!(second.status, 1);
        assert_eq!(runner.remaining(), 0);
    }

    #[test]
    fn test_mock_runner_rejects_out_of_order_command() {
        let runner = MockRunner::new().expect("hg branch", 0, "default");

        let result = runner.execute("git branch", Path::new("."));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Expected 'hg branch'"));
        assert_eq!(runner.remaining(), 1);
    }

    #[test]
    fn test_mock_runner_exhausted_script() {
        let runner = MockRunner::new();
        assert!(runner.execute("git log", Path::new(".")).is_err());
        assert_eq!(runner.calls(), vec!["git log".to_string()]);
    }

    #[test]
    fn test_mock_runner_default() {
        let runner = MockRunner::default();
        assert_eq!(runner.remaining(), 0);
        assert!(runner.calls().is_empty());
    }
}
