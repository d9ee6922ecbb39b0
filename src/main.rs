use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use version_guesser::config;
use version_guesser::ui;
use version_guesser::vcs::GitVersion;
use version_guesser::{GuessResult, ShellRunner, VersionGuesser, VersionNormalizer, VersionParser};

#[derive(clap::Parser)]
#[command(
    name = "version-guesser",
    version,
    about = "Guess a package version from the git or mercurial checkout it lives in"
)]
struct Args {
    #[arg(default_value = ".", help = "Package directory to inspect")]
    path: PathBuf,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        short = 'n',
        long = "non-feature-branch",
        help = "Regex of a branch to treat as a release line (repeatable)"
    )]
    non_feature_branches: Vec<String>,

    #[arg(
        long,
        env = "VERSION_GUESSER_ROOT_VERSION",
        help = "Use this version instead of guessing"
    )]
    root_version: Option<String>,

    #[arg(long, help = "Print the result as JSON")]
    json: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("VERSION_GUESSER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = match config::load_config(args.config.as_deref(), &args.path) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };
    config.non_feature_branches.extend(args.non_feature_branches);
    if let Some(version) = args.root_version {
        config.version = Some(version);
    }
    config.validate()?;

    // Explicit versions are used as given, without touching the checkout
    if let Some(explicit) = config.explicit_version() {
        let version = VersionParser::new()
            .normalize(explicit)
            .with_context(|| format!("Invalid explicit version '{}'", explicit))?;
        print_result(&GuessResult::new(version, explicit), args.json)?;
        return Ok(());
    }

    let runner = ShellRunner::new();
    let git_version = GitVersion::detect(&runner, &args.path);
    let guesser = VersionGuesser::new(runner).with_git_version(git_version);

    match guesser.guess_version(&config, &args.path) {
        Some(result) => print_result(&result, args.json)?,
        None if args.json => println!("{{}}"),
        None => ui::display_unknown(&args.path),
    }

    Ok(())
}

fn print_result(result: &GuessResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        ui::display_guess(result);
    }
    Ok(())
}
