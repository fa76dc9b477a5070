//! `faultline run`: answer each step from the terminal.
//!
//! Ctrl-C aborts the session and restores the original configuration.
//! End of input leaves the session saved so it can be resumed later.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use faultline_core::port::{ActivationPort, StateStore};
use faultline_core::session::Session;
use faultline_core::types::SessionStatus;

use crate::cmd_session::{cmd_abort, cmd_feedback, cmd_start, cmd_undo, explain, render_pending};

const PROMPT: &str = "[p]ersists / [g]one / [u]ndo / [s]tatus / [a]bort / [q]uit > ";

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Persists,
    Gone,
    Undo,
    Status,
    Abort,
    Quit,
}

pub fn parse_input(line: &str) -> Option<Input> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "persists" | "y" | "yes" => Some(Input::Persists),
        "g" | "gone" | "n" | "no" => Some(Input::Gone),
        "u" | "undo" => Some(Input::Undo),
        "s" | "status" => Some(Input::Status),
        "a" | "abort" => Some(Input::Abort),
        "q" | "quit" | "exit" => Some(Input::Quit),
        _ => None,
    }
}

pub async fn cmd_run<P: ActivationPort, S: StateStore>(
    session: &mut Session<P, S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let status = session.state().status;
    match status {
        SessionStatus::Completed => {
            write!(out, "{}", crate::cmd_status::render_status(session.state()))?;
            return Ok(());
        }
        SessionStatus::Running if session.state().awaiting_feedback() => {
            // The live system may have drifted while we were away.
            session.reapply().map_err(explain)?;
            writeln!(out, "Resuming session.")?;
            write!(out, "{}", render_pending(session))?;
        }
        _ => cmd_start(session, out)?,
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while session.state().is_running() {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; restoring original configuration");
                writeln!(out)?;
                cmd_abort(session, false, out)?;
                return Ok(());
            }
        };
        let Some(line) = line else {
            writeln!(out, "\nSession saved; run `faultline run` to continue.")?;
            return Ok(());
        };

        let result = match parse_input(&line) {
            Some(Input::Persists) => cmd_feedback(session, true, out),
            Some(Input::Gone) => cmd_feedback(session, false, out),
            Some(Input::Undo) => cmd_undo(session, out),
            Some(Input::Status) => {
                write!(out, "{}", crate::cmd_status::render_status(session.state()))?;
                Ok(())
            }
            Some(Input::Abort) => cmd_abort(session, false, out),
            Some(Input::Quit) => {
                writeln!(out, "Session saved; run `faultline run` to continue.")?;
                return Ok(());
            }
            None => {
                writeln!(out, "Unrecognised answer {:?}.", line.trim())?;
                Ok(())
            }
        };
        // Recoverable errors are shown and the same question is asked again.
        if let Err(e) = result {
            writeln!(out, "error: {e:#}")?;
        }

        if session.state().is_running() && session.pending_configuration().is_none() {
            // Undo went past the first step.
            return Ok(());
        }
    }
    Ok(())
}
