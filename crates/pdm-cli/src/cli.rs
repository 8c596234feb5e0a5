use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pdm",
    about = "PDM version & checkout synchronization",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a PDM workspace
    Init(InitArgs),
    /// Start tracking a file
    Track(TrackArgs),
    /// Acquire the checkout lock
    Checkout(FileArgs),
    /// Release the checkout lock
    Release(FileArgs),
    /// Record the working copy as a new version
    Checkin(CheckinArgs),
    /// Show version history
    Log(LogArgs),
    /// Show working copy status
    Status(StatusArgs),
    /// Roll the working copy back or forward to a version
    Goto(GotoArgs),
    /// Set the lifecycle state
    State(StateArgs),
    /// Edit descriptive metadata
    Meta(MetaArgs),
    /// Check version history integrity
    Verify(VerifyArgs),
    /// List checkout locks
    Locks,
}

#[derive(Args)]
pub struct InitArgs {
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
    #[arg(long)]
    pub no_activity: bool,
}

/// A tracked file, by workspace path or file id.
#[derive(Args)]
pub struct FileArgs {
    pub file: String,
}

#[derive(Args)]
pub struct TrackArgs {
    pub path: PathBuf,
    #[arg(short, long)]
    pub message: Option<String>,
    #[arg(long)]
    pub revision: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub part_number: Option<String>,
}

#[derive(Args)]
pub struct CheckinArgs {
    pub file: String,
    #[arg(short, long)]
    pub message: String,
    #[arg(long)]
    pub revision: Option<String>,
    /// Keep the checkout lock
    #[arg(long)]
    pub keep: bool,
}

#[derive(Args)]
pub struct LogArgs {
    pub file: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Re-hash working copies instead of using the cached status
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Args)]
pub struct GotoArgs {
    pub file: String,
    /// Target version, e.g. `3` or `v3`
    pub version: String,
}

#[derive(Args)]
pub struct StateArgs {
    pub file: String,
    /// wip, in-review, released or obsolete
    pub state: String,
}

#[derive(Args)]
pub struct MetaArgs {
    pub file: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub part_number: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Only this file; all tracked files when omitted
    pub file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_goto() {
        let cli = Cli::parse_from(["pdm", "goto", "models/bracket.sldprt", "v3", "--user", "alice"]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        match cli.command {
            Command::Goto(args) => assert_eq!(args.version, "v3"),
            _ => panic!("expected goto"),
        }
    }

    #[test]
    fn parses_checkin_with_format() {
        let cli = Cli::parse_from(["pdm", "--format", "json", "checkin", "a.step", "-m", "fix", "--keep"]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Checkin(args) => {
                assert!(args.keep);
                assert_eq!(args.message, "fix");
            }
            _ => panic!("expected checkin"),
        }
    }
}
