//! Append-only undo log of applied configurations.
//!
//! One entry per configuration pushed through the activation port.
//! Only sequential single-step undo is supported: no redo, no branching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlgorithmState, ItemId};

/// Kind of configuration change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryAction {
    DisableAll,
    EnableHalf,
    Isolate,
    TestPair,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisableAll => "disable-all",
            Self::EnableHalf => "enable-half",
            Self::Isolate => "isolate",
            Self::TestPair => "test-pair",
        }
    }
}

/// Oracle answer recorded against the configuration it was given for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feedback {
    ProblemExists,
    ProblemGone,
}

impl Feedback {
    pub fn from_persists(problem_persists: bool) -> Self {
        if problem_persists {
            Self::ProblemExists
        } else {
            Self::ProblemGone
        }
    }

    pub fn persists(self) -> bool {
        self == Self::ProblemExists
    }
}

/// One applied configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub action: HistoryAction,
    /// Configuration that was active immediately before this one was applied.
    pub previous_enabled_set: Vec<ItemId>,
    /// Suspect pool before the step that produced this configuration.
    pub suspect_pool_snapshot: Vec<ItemId>,
    /// Full algorithm state before the step that produced this configuration.
    pub algorithm_snapshot: AlgorithmState,
    /// Answer given while this configuration was active.
    pub user_feedback: Option<Feedback>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryItem {
    /// Snapshot `algorithm` and `previous` before a new configuration is applied.
    pub fn capture(
        action: HistoryAction,
        previous: &[ItemId],
        algorithm: &AlgorithmState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            previous_enabled_set: previous.to_vec(),
            suspect_pool_snapshot: algorithm.suspect_set(),
            algorithm_snapshot: algorithm.clone(),
            user_feedback: None,
            recorded_at: now,
        }
    }
}

/// Undo stack. Serializes as a plain list.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: Vec<HistoryItem>,
}

impl HistoryLog {
    pub fn push(&mut self, item: HistoryItem) {
        self.entries.push(item);
    }

    /// Remove the newest entry. The entry below it becomes the pending
    /// configuration again, so its recorded answer is cleared.
    pub fn pop(&mut self) -> Option<HistoryItem> {
        let popped = self.entries.pop()?;
        if let Some(top) = self.entries.last_mut() {
            top.user_feedback = None;
        }
        Some(popped)
    }

    /// Attach the oracle answer to the configuration currently applied.
    /// Returns `false` when nothing has been applied yet.
    pub fn record_feedback(&mut self, feedback: Feedback) -> bool {
        match self.entries.last_mut() {
            Some(top) => {
                top.user_feedback = Some(feedback);
                true
            }
            None => false,
        }
    }

    pub fn last(&self) -> Option<&HistoryItem> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryItem> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[HistoryItem] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a HistoryLog {
    type Item = &'a HistoryItem;
    type IntoIter = std::slice::Iter<'a, HistoryItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
