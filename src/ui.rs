//! Terminal output for the command line tool.

use crate::guesser::GuessResult;
use console::style;
use std::path::Path;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Lines describing a guess, without styling.
///
/// The version line always comes first; commit and feature lines follow
/// only when known.
pub fn format_guess(result: &GuessResult) -> Vec<String> {
    let mut lines = vec![format!(
        "version: {} ({})",
        result.pretty_version, result.version
    )];

    if let Some(commit) = &result.commit {
        lines.push(format!("commit:  {}", commit));
    }
    if let (Some(version), Some(pretty)) = (&result.feature_version, &result.feature_pretty_version) {
        lines.push(format!("feature: {} ({})", pretty, version));
    }

    lines
}

/// Print a guess with a green checkmark on the version line.
pub fn display_guess(result: &GuessResult) {
    for (i, line) in format_guess(result).iter().enumerate() {
        if i == 0 {
            println!("{} {}", style("✓").green(), style(line).bold());
        } else {
            println!("  {}", line);
        }
    }
}

/// Print the notice for a checkout no supported VCS recognized.
pub fn display_unknown(path: &Path) {
    display_status(&format!(
        "No git or mercurial checkout found at {}, version unknown",
        path.display()
    ));
}
