use serde::{Deserialize, Serialize};
use std::fmt;

use crate::history::HistoryLog;

/// Opaque identifier of a togglable item (plugin id, unit name, feature flag...).
pub type ItemId = String;

// ─── Session Status ───────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Stage ────────────────────────────────────────────────────────

/// Fieldless stage discriminant of [`AlgorithmState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    InitialConfirm,
    BisectMain,
    CrossPairBisectB,
    CrossPairBisectA,
    VerifySingle,
    VerifyPair,
}

impl Stage {
    pub const ALL: [Self; 6] = [
        Self::InitialConfirm,
        Self::BisectMain,
        Self::CrossPairBisectB,
        Self::CrossPairBisectA,
        Self::VerifySingle,
        Self::VerifyPair,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialConfirm => "initial-confirm",
            Self::BisectMain => "bisect-main",
            Self::CrossPairBisectB => "cross-pair-bisect-b",
            Self::CrossPairBisectA => "cross-pair-bisect-a",
            Self::VerifySingle => "verify-single",
            Self::VerifyPair => "verify-pair",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of the main split is currently applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Half {
    First,
    Second,
}

/// Which member of a two-item suspect set is currently applied alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyStep {
    TestFirst,
    TestSecond,
}

// ─── Algorithm State ──────────────────────────────────────────────

/// Stage-specific search state. Each variant carries only the fields its
/// stage reads, so combinations like "cross-pair search without a fixed
/// side" cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum AlgorithmState {
    /// Everything is disabled; waiting to learn whether items are involved at all.
    InitialConfirm { current_set: Vec<ItemId> },
    /// Main bisection. `c1 ++ c2 == current_set`, `c1` is the larger half.
    BisectMain {
        current_set: Vec<ItemId>,
        c1: Vec<ItemId>,
        c2: Vec<ItemId>,
        testing_half: Half,
    },
    /// Cross-partition search for the culprit on side B while side A
    /// (`fixed_set`) stays fully enabled.
    CrossPairBisectB {
        fixed_set: Vec<ItemId>,
        search_set: Vec<ItemId>,
        search_half: Vec<ItemId>,
        search_other_half: Vec<ItemId>,
    },
    /// Cross-partition search for the culprit on side A with only the
    /// side-B culprit (`found_second`) kept enabled.
    CrossPairBisectA {
        found_second: ItemId,
        search_set: Vec<ItemId>,
        search_half: Vec<ItemId>,
        search_other_half: Vec<ItemId>,
    },
    /// Confirming that a lone survivor reproduces the symptom by itself.
    VerifySingle { candidate: ItemId },
    /// Two suspects left; each is applied alone before calling it a pair.
    VerifyPair {
        pair_to_verify: [ItemId; 2],
        verify_step: VerifyStep,
    },
}

impl AlgorithmState {
    pub fn stage(&self) -> Stage {
        match self {
            Self::InitialConfirm { .. } => Stage::InitialConfirm,
            Self::BisectMain { .. } => Stage::BisectMain,
            Self::CrossPairBisectB { .. } => Stage::CrossPairBisectB,
            Self::CrossPairBisectA { .. } => Stage::CrossPairBisectA,
            Self::VerifySingle { .. } => Stage::VerifySingle,
            Self::VerifyPair { .. } => Stage::VerifyPair,
        }
    }

    /// The items still under suspicion at this stage.
    ///
    /// During cross-pair search this is the side being narrowed, not the
    /// union of both sides.
    pub fn suspect_set(&self) -> Vec<ItemId> {
        match self {
            Self::InitialConfirm { current_set } | Self::BisectMain { current_set, .. } => {
                current_set.clone()
            }
            Self::CrossPairBisectB { search_set, .. }
            | Self::CrossPairBisectA { search_set, .. } => search_set.clone(),
            Self::VerifySingle { candidate } => vec![candidate.clone()],
            Self::VerifyPair { pair_to_verify, .. } => pair_to_verify.to_vec(),
        }
    }
}

impl Default for AlgorithmState {
    fn default() -> Self {
        Self::InitialConfirm {
            current_set: Vec::new(),
        }
    }
}

// ─── Verdict ──────────────────────────────────────────────────────

/// Terminal outcome of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Verdict {
    /// One item reproduces the symptom on its own.
    Single { item: ItemId },
    /// Two items reproduce the symptom only together.
    Pair { item_a: ItemId, item_b: ItemId },
    /// The symptom survives with every item disabled.
    NotItemIssue,
    /// The observations contradict the single-or-pair fault model.
    Error { reason: String },
}

impl Verdict {
    /// Items named by the verdict, in report order.
    pub fn culprits(&self) -> Vec<&ItemId> {
        match self {
            Self::Single { item } => vec![item],
            Self::Pair { item_a, item_b } => vec![item_a, item_b],
            Self::NotItemIssue | Self::Error { .. } => Vec::new(),
        }
    }

    pub fn is_culprit(&self) -> bool {
        matches!(self, Self::Single { .. } | Self::Pair { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { item } => write!(f, "single culprit: {item}"),
            Self::Pair { item_a, item_b } => write!(f, "conflicting pair: {item_a} + {item_b}"),
            Self::NotItemIssue => f.write_str("not caused by any item"),
            Self::Error { reason } => write!(f, "isolation failed: {reason}"),
        }
    }
}

// ─── Troubleshoot State ───────────────────────────────────────────

/// Everything a session needs to survive a process restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroubleshootState {
    pub status: SessionStatus,
    /// Items enabled at session start, in their original order.
    pub original_enabled_set: Vec<ItemId>,
    /// Configuration most recently applied through the activation port.
    pub active_set: Vec<ItemId>,
    pub current_step: u32,
    pub history: HistoryLog,
    /// Set exactly when `status == Completed`.
    pub result: Option<Verdict>,
    pub algorithm_state: AlgorithmState,
}

impl TroubleshootState {
    /// The empty, not-yet-started session.
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            original_enabled_set: Vec::new(),
            active_set: Vec::new(),
            current_step: 0,
            history: HistoryLog::default(),
            result: None,
            algorithm_state: AlgorithmState::default(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.algorithm_state.stage()
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Whether the configuration currently applied still waits for an answer.
    pub fn awaiting_feedback(&self) -> bool {
        self.is_running() && !self.history.is_empty()
    }
}

impl Default for TroubleshootState {
    fn default() -> Self {
        Self::idle()
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<ItemId> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn stage_serializes_kebab_case() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).expect("serialize");
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }

    #[test]
    fn algorithm_state_is_tagged_by_stage() {
        let state = AlgorithmState::BisectMain {
            current_set: ids(&["a", "b", "c"]),
            c1: ids(&["a", "b"]),
            c2: ids(&["c"]),
            testing_half: Half::First,
        };
        let value = serde_json::to_value(&state).expect("serialize");
        assert_eq!(value["stage"], "bisect-main");
        assert_eq!(value["testing_half"], "first");
        assert!(value.get("fixed_set").is_none());

        let back: AlgorithmState = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, state);
    }

    #[test]
    fn suspect_set_per_stage() {
        let b = AlgorithmState::CrossPairBisectB {
            fixed_set: ids(&["a", "b"]),
            search_set: ids(&["c", "d", "e"]),
            search_half: ids(&["c", "d"]),
            search_other_half: ids(&["e"]),
        };
        assert_eq!(b.suspect_set(), ids(&["c", "d", "e"]));

        let pair = AlgorithmState::VerifyPair {
            pair_to_verify: ["x".into(), "y".into()],
            verify_step: VerifyStep::TestSecond,
        };
        assert_eq!(pair.suspect_set(), ids(&["x", "y"]));

        let single = AlgorithmState::VerifySingle {
            candidate: "z".into(),
        };
        assert_eq!(single.suspect_set(), ids(&["z"]));
    }

    #[test]
    fn idle_state_has_no_result() {
        let state = TroubleshootState::idle();
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.result.is_none());
        assert!(!state.awaiting_feedback());
        assert_eq!(state.stage(), Stage::InitialConfirm);
    }

    #[test]
    fn verdict_culprits() {
        let pair = Verdict::Pair {
            item_a: "p".into(),
            item_b: "q".into(),
        };
        assert_eq!(pair.culprits(), vec!["p", "q"]);
        assert!(pair.is_culprit());
        assert!(Verdict::NotItemIssue.culprits().is_empty());
        assert!(!Verdict::NotItemIssue.is_culprit());
    }

    #[test]
    fn verdict_serde_shape() {
        let v = Verdict::Single { item: "d".into() };
        let value = serde_json::to_value(&v).expect("serialize");
        assert_eq!(value["kind"], "single");
        assert_eq!(value["item"], "d");

        let err = Verdict::Error {
            reason: "nope".into(),
        };
        let back: Verdict =
            serde_json::from_str(&serde_json::to_string(&err).expect("serialize"))
                .expect("deserialize");
        assert_eq!(back, err);
    }
}
