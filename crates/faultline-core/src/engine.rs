//! Bisection engine.
//!
//! Pure stage transitions over [`TroubleshootState`]. Each operation takes
//! the current state by reference and returns the proposed next state plus
//! the configuration the caller must apply before committing it. Nothing
//! here touches the live system or the clock.
//!
//! ## Stages
//!
//! - `initial-confirm`: everything disabled. Symptom persists: not an item issue.
//! - `bisect-main`: split the suspect set (`c1` = larger half first), test
//!   `c1`, then `c2`. A failing half becomes the new suspect set.
//! - `cross-pair-bisect-b`: both halves passed alone, so keep side A fully
//!   enabled and halve side B until one item `b*` remains.
//! - `cross-pair-bisect-a`: keep only `b*` enabled and halve side A until `a*`.
//! - `verify-single`: one suspect left; confirm it alone.
//! - `verify-pair`: two suspects left; try each alone, else they are a pair.
//!
//! ## Size rules on entering a new suspect set
//!
//! `0` → error, `1` → `verify-single`, `2` → `verify-pair`, `>= 3` → split.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::history::{Feedback, HistoryAction, HistoryItem};
use crate::types::{
    AlgorithmState, Half, ItemId, SessionStatus, TroubleshootState, Verdict, VerifyStep,
};

/// Reason attached to [`Verdict::Error`] when a lone survivor fails to
/// reproduce the symptom.
pub const ISOLATION_FAILED_REASON: &str =
    "cannot isolate: fault not explained by single item or boundary pair";

/// Reason attached to [`Verdict::Error`] when a search narrows to nothing.
pub const EMPTY_SUSPECTS_REASON: &str = "cannot isolate: no items left to test";

// ─── Results ─────────────────────────────────────────────────────────

/// What a step produced: another configuration to test, or a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmResult {
    Continue {
        next_config: Vec<ItemId>,
        description: String,
    },
    SingleCulprit {
        item: ItemId,
    },
    PairCulprit {
        a: ItemId,
        b: ItemId,
    },
    NotItemIssue,
    Error {
        reason: String,
    },
}

impl AlgorithmResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue { .. })
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Continue { .. } => None,
            Self::SingleCulprit { item } => Some(Verdict::Single { item: item.clone() }),
            Self::PairCulprit { a, b } => Some(Verdict::Pair {
                item_a: a.clone(),
                item_b: b.clone(),
            }),
            Self::NotItemIssue => Some(Verdict::NotItemIssue),
            Self::Error { reason } => Some(Verdict::Error {
                reason: reason.clone(),
            }),
        }
    }
}

impl From<&Verdict> for AlgorithmResult {
    fn from(verdict: &Verdict) -> Self {
        match verdict {
            Verdict::Single { item } => Self::SingleCulprit { item: item.clone() },
            Verdict::Pair { item_a, item_b } => Self::PairCulprit {
                a: item_a.clone(),
                b: item_b.clone(),
            },
            Verdict::NotItemIssue => Self::NotItemIssue,
            Verdict::Error { reason } => Self::Error {
                reason: reason.clone(),
            },
        }
    }
}

/// Proposed next state. Commit `next` only once `result`'s configuration
/// (if any) has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: TroubleshootState,
    pub result: AlgorithmResult,
}

/// Proposed state after popping one history entry, and the configuration
/// that was active before that entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoPlan {
    pub next: TroubleshootState,
    pub restore_config: Vec<ItemId>,
}

// ─── Splitting ───────────────────────────────────────────────────────

/// Split `items` into `(first, second)` with `first.len() == ceil(n / 2)`,
/// preserving order.
pub fn split_half<T: Clone>(items: &[T]) -> (Vec<T>, Vec<T>) {
    let mid = items.len().div_ceil(2);
    (items[..mid].to_vec(), items[mid..].to_vec())
}

/// Members of `parts`, in universe order.
fn in_universe_order(universe: &[ItemId], parts: &[&[ItemId]]) -> Vec<ItemId> {
    let wanted: HashSet<&str> = parts
        .iter()
        .flat_map(|part| part.iter().map(String::as_str))
        .collect();
    universe
        .iter()
        .filter(|id| wanted.contains(id.as_str()))
        .cloned()
        .collect()
}

// ─── Session Lifecycle ───────────────────────────────────────────────

/// Fresh running session over `universe`. Duplicate ids are dropped
/// (first occurrence wins) so the halves of every split stay disjoint.
pub fn init_state(universe: Vec<ItemId>) -> TroubleshootState {
    let mut seen = HashSet::new();
    let universe: Vec<ItemId> = universe
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    TroubleshootState {
        status: SessionStatus::Running,
        active_set: universe.clone(),
        current_step: 1,
        history: Default::default(),
        result: None,
        algorithm_state: AlgorithmState::InitialConfirm {
            current_set: universe.clone(),
        },
        original_enabled_set: universe,
    }
}

/// First configuration of a session: everything disabled.
pub fn start(state: &TroubleshootState, now: DateTime<Utc>) -> Result<Transition, EngineError> {
    if !state.is_running() {
        return Err(EngineError::NotRunning(state.status));
    }
    if !state.history.is_empty() {
        return Err(EngineError::AlreadyStarted);
    }

    let mut next = state.clone();
    next.algorithm_state = AlgorithmState::InitialConfirm {
        current_set: state.original_enabled_set.clone(),
    };
    next.history.push(HistoryItem::capture(
        HistoryAction::DisableAll,
        &state.active_set,
        &next.algorithm_state,
        now,
    ));
    next.active_set = Vec::new();
    next.current_step = 1;

    let result = AlgorithmResult::Continue {
        next_config: Vec::new(),
        description: describe(&next.algorithm_state),
    };
    Ok(Transition { next, result })
}

/// Interpret the oracle's answer for the configuration currently applied.
pub fn step(
    state: &TroubleshootState,
    problem_persists: bool,
    now: DateTime<Utc>,
) -> Result<Transition, EngineError> {
    if !state.is_running() {
        return Err(EngineError::NotRunning(state.status));
    }
    if state.history.is_empty() {
        return Err(EngineError::NothingApplied);
    }

    let mut next = state.clone();
    next.history.record_feedback(Feedback::from_persists(problem_persists));

    let result = match decide(&state.algorithm_state, problem_persists) {
        Decision::Test { algorithm, action } => {
            let config = configuration(&algorithm, &state.original_enabled_set);
            next.history.push(HistoryItem::capture(
                action,
                &state.active_set,
                &state.algorithm_state,
                now,
            ));
            next.algorithm_state = algorithm;
            next.active_set = config.clone();
            next.current_step = next.current_step.saturating_add(1);
            AlgorithmResult::Continue {
                next_config: config,
                description: describe(&next.algorithm_state),
            }
        }
        Decision::Finish(verdict) => {
            let result = AlgorithmResult::from(&verdict);
            next.status = SessionStatus::Completed;
            next.result = Some(verdict);
            result
        }
    };

    Ok(Transition { next, result })
}

/// Pop the newest history entry. `None` when there is nothing to undo or
/// the session is not running.
pub fn undo(state: &TroubleshootState) -> Option<UndoPlan> {
    if !state.is_running() {
        return None;
    }

    let mut next = state.clone();
    let last = next.history.pop()?;
    next.algorithm_state = last.algorithm_snapshot;
    next.active_set = last.previous_enabled_set.clone();
    next.current_step = next.current_step.saturating_sub(1).max(1);

    Some(UndoPlan {
        next,
        restore_config: last.previous_enabled_set,
    })
}

// ─── Transition Rules ────────────────────────────────────────────────

enum Decision {
    Test {
        algorithm: AlgorithmState,
        action: HistoryAction,
    },
    Finish(Verdict),
}

fn finish_error(reason: &str) -> Decision {
    Decision::Finish(Verdict::Error {
        reason: reason.to_string(),
    })
}

fn decide(algorithm: &AlgorithmState, persists: bool) -> Decision {
    match algorithm {
        AlgorithmState::InitialConfirm { current_set } => {
            if persists {
                Decision::Finish(Verdict::NotItemIssue)
            } else {
                descend(current_set.clone())
            }
        }

        AlgorithmState::BisectMain {
            current_set,
            c1,
            c2,
            testing_half,
        } => match (testing_half, persists) {
            (Half::First, true) => descend(c1.clone()),
            (Half::First, false) => Decision::Test {
                algorithm: AlgorithmState::BisectMain {
                    current_set: current_set.clone(),
                    c1: c1.clone(),
                    c2: c2.clone(),
                    testing_half: Half::Second,
                },
                action: HistoryAction::EnableHalf,
            },
            (Half::Second, true) => descend(c2.clone()),
            // Each half passes alone: the fault needs items from both sides.
            (Half::Second, false) => search_side_b(c1.clone(), c2.clone()),
        },

        AlgorithmState::CrossPairBisectB {
            fixed_set,
            search_half,
            search_other_half,
            ..
        } => {
            let narrowed = if persists {
                search_half.clone()
            } else {
                search_other_half.clone()
            };
            search_side_b(fixed_set.clone(), narrowed)
        }

        AlgorithmState::CrossPairBisectA {
            found_second,
            search_half,
            search_other_half,
            ..
        } => {
            let narrowed = if persists {
                search_half.clone()
            } else {
                search_other_half.clone()
            };
            search_side_a(found_second.clone(), narrowed)
        }

        AlgorithmState::VerifySingle { candidate } => {
            if persists {
                Decision::Finish(Verdict::Single {
                    item: candidate.clone(),
                })
            } else {
                finish_error(ISOLATION_FAILED_REASON)
            }
        }

        AlgorithmState::VerifyPair {
            pair_to_verify,
            verify_step,
        } => {
            let [first, second] = pair_to_verify;
            match (verify_step, persists) {
                (VerifyStep::TestFirst, true) => Decision::Finish(Verdict::Single {
                    item: first.clone(),
                }),
                (VerifyStep::TestFirst, false) => Decision::Test {
                    algorithm: AlgorithmState::VerifyPair {
                        pair_to_verify: pair_to_verify.clone(),
                        verify_step: VerifyStep::TestSecond,
                    },
                    action: HistoryAction::Isolate,
                },
                (VerifyStep::TestSecond, true) => Decision::Finish(Verdict::Single {
                    item: second.clone(),
                }),
                (VerifyStep::TestSecond, false) => Decision::Finish(Verdict::Pair {
                    item_a: first.clone(),
                    item_b: second.clone(),
                }),
            }
        }
    }
}

/// Enter a new main suspect set, applying the size rules.
fn descend(current_set: Vec<ItemId>) -> Decision {
    match current_set.as_slice() {
        [] => finish_error(EMPTY_SUSPECTS_REASON),
        [only] => Decision::Test {
            algorithm: AlgorithmState::VerifySingle {
                candidate: only.clone(),
            },
            action: HistoryAction::Isolate,
        },
        [first, second] => Decision::Test {
            algorithm: AlgorithmState::VerifyPair {
                pair_to_verify: [first.clone(), second.clone()],
                verify_step: VerifyStep::TestFirst,
            },
            action: HistoryAction::Isolate,
        },
        _ => {
            let (c1, c2) = split_half(&current_set);
            Decision::Test {
                algorithm: AlgorithmState::BisectMain {
                    current_set,
                    c1,
                    c2,
                    testing_half: Half::First,
                },
                action: HistoryAction::EnableHalf,
            }
        }
    }
}

/// Halve side B with side A (`fixed_set`) held enabled. A singleton side B
/// is `b*`; the search then moves to side A.
fn search_side_b(fixed_set: Vec<ItemId>, search_set: Vec<ItemId>) -> Decision {
    match search_set.as_slice() {
        [] => finish_error(EMPTY_SUSPECTS_REASON),
        [found_second] => search_side_a(found_second.clone(), fixed_set),
        _ => {
            let (search_half, search_other_half) = split_half(&search_set);
            Decision::Test {
                algorithm: AlgorithmState::CrossPairBisectB {
                    fixed_set,
                    search_set,
                    search_half,
                    search_other_half,
                },
                action: HistoryAction::TestPair,
            }
        }
    }
}

/// Halve side A with only `b*` held enabled. A singleton side A is `a*`.
fn search_side_a(found_second: ItemId, search_set: Vec<ItemId>) -> Decision {
    match search_set.as_slice() {
        [] => finish_error(EMPTY_SUSPECTS_REASON),
        [found_first] => Decision::Finish(Verdict::Pair {
            item_a: found_first.clone(),
            item_b: found_second,
        }),
        _ => {
            let (search_half, search_other_half) = split_half(&search_set);
            Decision::Test {
                algorithm: AlgorithmState::CrossPairBisectA {
                    found_second,
                    search_set,
                    search_half,
                    search_other_half,
                },
                action: HistoryAction::TestPair,
            }
        }
    }
}

// ─── Derived Views ───────────────────────────────────────────────────

/// The configuration a stage tests, in universe order.
pub fn configuration(algorithm: &AlgorithmState, universe: &[ItemId]) -> Vec<ItemId> {
    match algorithm {
        AlgorithmState::InitialConfirm { .. } => Vec::new(),
        AlgorithmState::BisectMain {
            c1,
            c2,
            testing_half,
            ..
        } => match testing_half {
            Half::First => c1.clone(),
            Half::Second => c2.clone(),
        },
        AlgorithmState::CrossPairBisectB {
            fixed_set,
            search_half,
            ..
        } => in_universe_order(universe, &[fixed_set.as_slice(), search_half.as_slice()]),
        AlgorithmState::CrossPairBisectA {
            found_second,
            search_half,
            ..
        } => in_universe_order(
            universe,
            &[std::slice::from_ref(found_second), search_half.as_slice()],
        ),
        AlgorithmState::VerifySingle { candidate } => vec![candidate.clone()],
        AlgorithmState::VerifyPair {
            pair_to_verify,
            verify_step,
        } => match verify_step {
            VerifyStep::TestFirst => vec![pair_to_verify[0].clone()],
            VerifyStep::TestSecond => vec![pair_to_verify[1].clone()],
        },
    }
}

/// The configuration waiting for an answer, if any.
pub fn pending_configuration(state: &TroubleshootState) -> Option<Vec<ItemId>> {
    state
        .awaiting_feedback()
        .then(|| configuration(&state.algorithm_state, &state.original_enabled_set))
}

/// Human description of the test a stage is running.
pub fn describe(algorithm: &AlgorithmState) -> String {
    match algorithm {
        AlgorithmState::InitialConfirm { current_set } => {
            format!("all {} item(s) disabled", current_set.len())
        }
        AlgorithmState::BisectMain {
            current_set,
            c1,
            c2,
            testing_half,
        } => match testing_half {
            Half::First => format!(
                "first half enabled ({} of {} suspects)",
                c1.len(),
                current_set.len()
            ),
            Half::Second => format!(
                "second half enabled ({} of {} suspects)",
                c2.len(),
                current_set.len()
            ),
        },
        AlgorithmState::CrossPairBisectB {
            fixed_set,
            search_set,
            search_half,
            ..
        } => format!(
            "cross-pair search: {} fixed item(s) plus {} of {} candidates",
            fixed_set.len(),
            search_half.len(),
            search_set.len()
        ),
        AlgorithmState::CrossPairBisectA {
            found_second,
            search_set,
            search_half,
            ..
        } => format!(
            "cross-pair search: {found_second} plus {} of {} candidates",
            search_half.len(),
            search_set.len()
        ),
        AlgorithmState::VerifySingle { candidate } => format!("verifying {candidate} alone"),
        AlgorithmState::VerifyPair {
            pair_to_verify,
            verify_step,
        } => match verify_step {
            VerifyStep::TestFirst => format!("verifying {} alone (1 of 2)", pair_to_verify[0]),
            VerifyStep::TestSecond => format!("verifying {} alone (2 of 2)", pair_to_verify[1]),
        },
    }
}

// ─── Estimates ───────────────────────────────────────────────────────

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// Display-only estimate of questions left: `ceil(log2(pool)) * 2`.
pub fn estimate_remaining_steps(state: &TroubleshootState) -> u32 {
    let pool = state.algorithm_state.suspect_set().len();
    if pool <= 1 {
        1
    } else {
        ceil_log2(pool) * 2
    }
}

/// Display-only estimate of a whole session over `universe_len` items.
pub fn estimate_total_steps(universe_len: usize) -> u32 {
    ceil_log2(universe_len) * 2 + 2
}

/// `current / (current + remaining)` as a percentage.
pub fn progress_percent(state: &TroubleshootState) -> u8 {
    if state.status == SessionStatus::Completed {
        return 100;
    }
    let current = state.current_step.max(1);
    let total = current + estimate_remaining_steps(state);
    (current * 100 / total).min(100) as u8
}

// ─── Tests ───────────────────────────────────────────────────────────
