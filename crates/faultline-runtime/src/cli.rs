//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "faultline",
    about = "Find the item (or pair of items) behind a fault by guided bisection"
)]
pub struct Cli {
    /// Config file (default: ./faultline.toml when present)
    #[arg(long, short = 'c', global = true, env = "FAULTLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Session state file (default: $XDG_STATE_HOME/faultline/session.json)
    #[arg(long, global = true, env = "FAULTLINE_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a session: record enabled items and disable them all
    Start,
    /// The problem still happens with the current configuration
    Persists,
    /// The problem is gone with the current configuration
    Gone,
    /// Step back to the previous configuration
    Undo,
    /// Show the current session
    Status(StatusOpts),
    /// Abandon the session
    Abort(AbortOpts),
    /// Close a finished session
    Done(DoneOpts),
    /// Render the result as Markdown
    Report(ReportOpts),
    /// Interactive session in the terminal
    Run,
}

#[derive(clap::Args, Default)]
pub struct StatusOpts {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Default)]
pub struct AbortOpts {
    /// Leave the current test configuration in place
    #[arg(long)]
    pub keep: bool,
}

#[derive(clap::Args, Default)]
pub struct DoneOpts {
    /// Keep the current configuration instead of restoring the original
    #[arg(long)]
    pub keep: bool,
}

#[derive(clap::Args, Default)]
pub struct ReportOpts {
    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Default session file, per-user.
pub fn default_state_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("faultline/session.json");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        return PathBuf::from(home).join(".local/state/faultline/session.json");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/faultline-{user}/session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "faultline",
            "status",
            "--json",
            "--state",
            "/tmp/s.json",
            "-c",
            "/tmp/f.toml",
        ])
        .expect("parse");
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/f.toml")));
        match cli.command {
            Command::Status(opts) => assert!(opts.json),
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn parses_abort_keep_and_report_output() {
        let cli = Cli::try_parse_from(["faultline", "abort", "--keep"]).expect("parse");
        assert!(matches!(cli.command, Command::Abort(AbortOpts { keep: true })));

        let cli = Cli::try_parse_from(["faultline", "report", "-o", "r.md"]).expect("parse");
        match cli.command {
            Command::Report(opts) => assert_eq!(opts.output, Some(PathBuf::from("r.md"))),
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["faultline"]).is_err());
    }

    #[test]
    fn default_state_path_ends_with_session_file() {
        let path = default_state_path();
        assert!(path.ends_with("session.json"), "got {path:?}");
    }
}
