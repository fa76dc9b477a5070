//! `faultline status`: human summary or JSON of the saved session.

use faultline_core::engine;
use faultline_core::types::{SessionStatus, TroubleshootState};

use crate::context::{count_noun, join_items, progress_bar};

const LIST_LIMIT: usize = 20;

pub fn status_json(state: &TroubleshootState) -> serde_json::Value {
    serde_json::json!({
        "status": state.status,
        "stage": state.stage(),
        "step": state.current_step,
        "remaining_estimate": engine::estimate_remaining_steps(state),
        "progress_percent": engine::progress_percent(state),
        "original_count": state.original_enabled_set.len(),
        "active_set": state.active_set,
        "suspects": state.algorithm_state.suspect_set(),
        "culprits": state.result.as_ref().map(|v| v.culprits()).unwrap_or_default(),
        "pending": engine::pending_configuration(state),
        "result": state.result,
    })
}

pub fn render_status(state: &TroubleshootState) -> String {
    match state.status {
        SessionStatus::Idle | SessionStatus::Aborted => {
            return "No session in progress. Run `faultline start` to begin.\n".to_string();
        }
        SessionStatus::Completed => {
            let verdict = state
                .result
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "no result".to_string());
            return format!(
                "Finished after {} step(s): {verdict}\n\
                 Run `faultline report` for details or `faultline done` to close.\n",
                state.current_step
            );
        }
        SessionStatus::Running => {}
    }

    if state.history.is_empty() {
        let items = state.original_enabled_set.len();
        return format!(
            "Session prepared over {} (about {}) but nothing applied yet. \
             Run `faultline start`.\n",
            count_noun(items, "item"),
            count_noun(engine::estimate_total_steps(items) as usize, "question"),
        );
    }

    let percent = engine::progress_percent(state);
    let suspects = state.algorithm_state.suspect_set();
    format!(
        "Stage:    {}\n\
         Step:     {} (about {} left)\n\
         Progress: {} {percent}%\n\
         Testing:  {}\n\
         Enabled:  {}\n\
         Suspects: {} of {}: {}\n\
         History:  {}\n",
        state.stage(),
        state.current_step,
        engine::estimate_remaining_steps(state),
        progress_bar(percent, 20),
        engine::describe(&state.algorithm_state),
        join_items(&state.active_set, LIST_LIMIT),
        suspects.len(),
        state.original_enabled_set.len(),
        join_items(&suspects, LIST_LIMIT),
        history_line(state),
    )
}

/// `disable-all (gone), enable-half (pending)`.
fn history_line(state: &TroubleshootState) -> String {
    let steps: Vec<String> = state
        .history
        .iter()
        .map(|item| {
            let answer = match item.user_feedback {
                Some(feedback) if feedback.persists() => "persists",
                Some(_) => "gone",
                None => "pending",
            };
            format!("{} ({answer})", item.action.as_str())
        })
        .collect();
    join_items(&steps, LIST_LIMIT)
}
