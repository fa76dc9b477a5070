//! One-shot session commands: `start`, `persists`, `gone`, `undo`, `abort`, `done`.

use std::io::Write;

use faultline_core::engine::{self, AlgorithmResult};
use faultline_core::error::{EngineError, SessionError};
use faultline_core::port::{ActivationPort, StateStore};
use faultline_core::session::Session;
use faultline_core::types::{SessionStatus, Verdict};

use crate::context::{ANSWER_HINT, count_noun, join_items};

const LIST_LIMIT: usize = 12;

/// Attach the next thing the user can do to a session error.
pub fn explain(err: SessionError) -> anyhow::Error {
    let hint = match &err {
        SessionError::Activation { .. } => {
            Some("nothing was recorded; answer again to retry the same configuration")
        }
        SessionError::Persistence(_) => Some(
            "nothing was recorded and the previous configuration was put back; \
             check the state file location, then retry",
        ),
        SessionError::Drift { .. } => Some(
            "the configuration under test was applied again; \
             check for the problem, then answer",
        ),
        SessionError::Restore(_) => Some(
            "the session is saved; run `faultline done` (finished session) \
             or `faultline abort` to retry the restore",
        ),
        SessionError::Engine(EngineError::NotRunning(_)) => Some("run `faultline start` first"),
        SessionError::Engine(EngineError::NothingApplied) => {
            Some("run `faultline start` to apply the first configuration")
        }
        SessionError::AlreadyRunning => {
            Some("answer with `faultline persists|gone`, or `faultline abort`")
        }
        SessionError::NotCompleted => Some("see `faultline status`"),
        _ => None,
    };
    match hint {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => anyhow::Error::new(err),
    }
}

/// Question block for the configuration waiting for an answer.
pub fn render_pending<P: ActivationPort, S: StateStore>(session: &Session<P, S>) -> String {
    let state = session.state();
    let Some(config) = session.pending_configuration() else {
        return "No configuration is waiting for an answer.\n".to_string();
    };
    let description = session.pending_description().unwrap_or_default();
    format!(
        "Step {} ({}, about {} left): {}\nEnabled now: {}\n",
        state.current_step,
        state.stage(),
        count_noun(session.estimate_remaining_steps() as usize, "step"),
        description,
        join_items(&config, LIST_LIMIT),
    )
}

/// Summary printed when a verdict is reached.
pub fn render_verdict(verdict: &Verdict, steps: u32) -> String {
    let mut text = match verdict {
        Verdict::Single { item } => format!("Found it: `{item}` causes the problem on its own.\n"),
        Verdict::Pair { item_a, item_b } => format!(
            "Found it: `{item_a}` and `{item_b}` cause the problem only together.\n"
        ),
        Verdict::NotItemIssue => "The problem happens with every item disabled; \
             it is not caused by any of them.\n"
            .to_string(),
        Verdict::Error { reason } => format!("Could not isolate the problem: {reason}.\n"),
    };
    text.push_str(&format!("Finished after {}.\n", count_noun(steps as usize, "step")));
    if verdict.is_culprit() {
        text.push_str(
            "The last test configuration is still active. Run `faultline report` for details, \
             then `faultline done` to restore your original configuration.\n",
        );
    } else {
        text.push_str("Your original configuration has been restored.\n");
    }
    text
}

fn print_result<P: ActivationPort, S: StateStore>(
    session: &Session<P, S>,
    result: &AlgorithmResult,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match result.verdict() {
        Some(verdict) => write!(out, "{}", render_verdict(&verdict, session.state().current_step))?,
        None => {
            write!(out, "{}", render_pending(session))?;
            writeln!(out, "{ANSWER_HINT}")?;
        }
    }
    Ok(())
}

pub fn cmd_start<P: ActivationPort, S: StateStore>(
    session: &mut Session<P, S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if session.state().status == SessionStatus::Completed {
        anyhow::bail!(
            "a finished session is still open; run `faultline report` or `faultline done` first"
        );
    }
    let result = session.start().map_err(explain)?;
    let universe = session.state().original_enabled_set.len();
    writeln!(
        out,
        "Recorded {} enabled; all disabled for the first test.",
        count_noun(universe, "item")
    )?;
    writeln!(
        out,
        "Expect about {} in total.",
        count_noun(engine::estimate_total_steps(universe) as usize, "question")
    )?;
    if universe == 0 {
        writeln!(out, "Nothing is enabled, so no item can be the cause.")?;
    }
    print_result(session, &result, out)
}

pub fn cmd_feedback<P: ActivationPort, S: StateStore>(
    session: &mut Session<P, S>,
    problem_persists: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let result = session.report_feedback(problem_persists).map_err(explain)?;
    print_result(session, &result, out)
}

pub fn cmd_undo<P: ActivationPort, S: StateStore>(
    session: &mut Session<P, S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !session.undo().map_err(explain)? {
        writeln!(out, "Nothing to undo.")?;
        return Ok(());
    }
    if session.pending_configuration().is_some() {
        writeln!(out, "Went back one step.")?;
        write!(out, "{}", render_pending(session))?;
        writeln!(out, "{ANSWER_HINT}")?;
    } else {
        writeln!(
            out,
            "Back to the original configuration. Run `faultline start` to begin again, \
             or `faultline abort` to discard the session."
        )?;
    }
    Ok(())
}

pub fn cmd_abort<P: ActivationPort, S: StateStore>(
    session: &mut Session<P, S>,
    keep: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if session.state().status == SessionStatus::Idle {
        writeln!(out, "No session to abort.")?;
        return Ok(());
    }
    if keep {
        session.abort_and_keep().map_err(explain)?;
        writeln!(out, "Session discarded; the current configuration was left as is.")?;
    } else {
        session.abort_and_restore().map_err(explain)?;
        writeln!(out, "Session discarded; original configuration restored.")?;
    }
    Ok(())
}

pub fn cmd_done<P: ActivationPort, S: StateStore>(
    session: &mut Session<P, S>,
    keep: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    session.acknowledge(!keep).map_err(explain)?;
    if keep {
        writeln!(out, "Session closed; the current configuration was left as is.")?;
    } else {
        writeln!(out, "Session closed; original configuration restored.")?;
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────
