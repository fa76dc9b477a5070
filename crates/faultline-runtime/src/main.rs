//! faultline: guided bisection to find which item (or pair of items)
//! causes a problem. One-shot commands for scripting, `run` for an
//! interactive terminal session.

use anyhow::Context;
use clap::Parser;

use faultline_core::session::Session;
use faultline_store::JsonFileStore;

mod cli;
mod cmd_run;
mod cmd_session;
mod cmd_status;
mod config;
mod context;
mod report;

fn init_tracing() {
    let filter = std::env::var("FAULTLINE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_tracing();

    let config = config::Config::load(args.config.as_deref())?;
    let state_path = config.resolve_state_path(args.state);
    let port = config.build_port()?;
    let store = JsonFileStore::open(&state_path);
    let mut session = Session::open(port, store)
        .with_context(|| format!("failed to load session from {}", state_path.display()))?;
    tracing::debug!(
        state = %state_path.display(),
        status = %session.state().status,
        "session opened"
    );

    let mut out = std::io::stdout();
    match args.command {
        cli::Command::Start => cmd_session::cmd_start(&mut session, &mut out)?,
        cli::Command::Persists => cmd_session::cmd_feedback(&mut session, true, &mut out)?,
        cli::Command::Gone => cmd_session::cmd_feedback(&mut session, false, &mut out)?,
        cli::Command::Undo => cmd_session::cmd_undo(&mut session, &mut out)?,
        cli::Command::Status(opts) => {
            if opts.json {
                let value = cmd_status::status_json(session.state());
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", cmd_status::render_status(session.state()));
            }
        }
        cli::Command::Abort(opts) => cmd_session::cmd_abort(&mut session, opts.keep, &mut out)?,
        cli::Command::Done(opts) => cmd_session::cmd_done(&mut session, opts.keep, &mut out)?,
        cli::Command::Report(opts) => {
            report::cmd_report(session.state(), opts.output.as_deref(), &mut out)?;
        }
        cli::Command::Run => cmd_run::cmd_run(&mut session, &mut out).await?,
    }

    Ok(())
}
