//! Simulated-oracle sessions driven end to end through `Session`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use faultline_core::engine::{self, AlgorithmResult};
use faultline_core::{
    ActivationError, ActivationPort, ItemId, Session, SessionStatus, Stage, StateStore,
    StoreError, TroubleshootState, Verdict, split_half,
};
use proptest::prelude::*;

// ─── Simulated System ─────────────────────────────────────────────

/// Live system whose symptom appears when every culprit is enabled.
struct Simulated {
    universe: Vec<ItemId>,
    culprits: Vec<ItemId>,
    enabled: RefCell<Vec<ItemId>>,
    applied: RefCell<Vec<Vec<ItemId>>>,
}

impl Simulated {
    fn new(universe: &[&str], culprits: &[&str]) -> Self {
        let universe = ids(universe);
        Self {
            enabled: RefCell::new(universe.clone()),
            universe,
            culprits: ids(culprits),
            applied: RefCell::new(Vec::new()),
        }
    }

    fn numbered(n: usize, culprits: &[usize]) -> Self {
        let universe: Vec<ItemId> = (0..n).map(|i| format!("item-{i:02}")).collect();
        let culprits = culprits.iter().map(|&i| universe[i].clone()).collect();
        Self {
            enabled: RefCell::new(universe.clone()),
            universe,
            culprits,
            applied: RefCell::new(Vec::new()),
        }
    }

    /// Oracle: symptom present iff every culprit is enabled.
    /// An empty culprit list models a fault outside the items.
    fn symptom(&self) -> bool {
        let enabled = self.enabled.borrow();
        self.culprits.iter().all(|c| enabled.contains(c))
    }

    fn enabled(&self) -> Vec<ItemId> {
        self.enabled.borrow().clone()
    }
}

impl ActivationPort for Simulated {
    fn apply(&self, target: &[ItemId]) -> Result<(), ActivationError> {
        *self.enabled.borrow_mut() = target.to_vec();
        self.applied.borrow_mut().push(target.to_vec());
        Ok(())
    }

    fn list_universe(&self) -> Result<Vec<ItemId>, ActivationError> {
        Ok(self.enabled())
    }

    fn permanently_excluded(&self) -> BTreeSet<ItemId> {
        BTreeSet::new()
    }
}

/// Store that keeps the last save as JSON, the way a file store would.
#[derive(Default)]
struct JsonMemory {
    json: RefCell<Option<String>>,
    saves: Cell<usize>,
}

impl StateStore for JsonMemory {
    fn save(&self, state: &TroubleshootState) -> Result<(), StoreError> {
        *self.json.borrow_mut() = Some(serde_json::to_string(state)?);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn load(&self) -> Result<Option<TroubleshootState>, StoreError> {
        match self.json.borrow().as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

fn ids(items: &[&str]) -> Vec<ItemId> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn bound(n: usize) -> usize {
    2 * (n.max(1) as f64).log2().ceil() as usize + 2
}

/// Run a session to its verdict, answering from the simulated system.
/// Returns the verdict and how many answers were given.
fn run_to_verdict(system: &Simulated) -> (Verdict, usize) {
    let store = JsonMemory::default();
    let mut session = Session::open(system, &store).expect("open");
    session.start().expect("start");

    let mut answers = 0;
    loop {
        answers += 1;
        assert!(answers <= 64, "session did not converge");
        let result = session.report_feedback(system.symptom()).expect("feedback");
        if let Some(verdict) = result.verdict() {
            assert_eq!(session.state().status, SessionStatus::Completed);
            return (verdict, answers);
        }
    }
}

// ─── 1. Reference traces ──────────────────────────────────────────

#[test]
fn single_culprit_trace_over_eight_items() {
    let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["D"]);
    let (verdict, answers) = run_to_verdict(&system);

    assert_eq!(verdict, Verdict::Single { item: "D".into() });
    assert_eq!(
        *system.applied.borrow(),
        vec![
            ids(&[]),
            ids(&["A", "B", "C", "D"]),
            ids(&["A", "B"]),
            ids(&["C", "D"]),
            ids(&["C"]),
            ids(&["D"]),
        ]
    );
    assert!(answers <= 8);
}

#[test]
fn cross_half_pair_trace_over_eight_items() {
    let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["B", "G"]);
    let (verdict, answers) = run_to_verdict(&system);

    assert_eq!(
        verdict,
        Verdict::Pair {
            item_a: "B".into(),
            item_b: "G".into()
        }
    );
    assert_eq!(
        *system.applied.borrow(),
        vec![
            ids(&[]),
            ids(&["A", "B", "C", "D"]),
            ids(&["E", "F", "G", "H"]),
            ids(&["A", "B", "C", "D", "E", "F"]),
            ids(&["A", "B", "C", "D", "G"]),
            ids(&["A", "B", "G"]),
            ids(&["A", "G"]),
        ]
    );
    assert!(answers <= 8);
}

#[test]
fn symptom_without_items_is_not_item_issue_and_restores() {
    let system = Simulated::new(&["A", "B", "C"], &[]);
    let (verdict, answers) = run_to_verdict(&system);
    assert_eq!(verdict, Verdict::NotItemIssue);
    assert_eq!(answers, 1);
    assert_eq!(system.enabled(), ids(&["A", "B", "C"]));
}

#[test]
fn unreproducible_symptom_is_isolation_error() {
    // "Z" is never enabled, so the last survivor fails to reproduce.
    let system = Simulated::new(&["A"], &["Z"]);
    let (verdict, answers) = run_to_verdict(&system);
    assert_eq!(
        verdict,
        Verdict::Error {
            reason: engine::ISOLATION_FAILED_REASON.into()
        }
    );
    assert_eq!(answers, 2);
    assert_eq!(system.enabled(), ids(&["A"]));
}

// ─── 2. Exhaustive convergence ────────────────────────────────────

#[test]
fn every_single_culprit_is_found_within_bound() {
    for n in 1..=17 {
        for culprit in 0..n {
            let system = Simulated::numbered(n, &[culprit]);
            let expected = system.culprits[0].clone();
            let (verdict, answers) = run_to_verdict(&system);
            assert_eq!(verdict, Verdict::Single { item: expected }, "n={n} culprit={culprit}");
            assert!(answers <= bound(n), "n={n} culprit={culprit}: {answers} answers");
        }
    }
}

#[test]
fn every_pair_culprit_is_found_within_bound() {
    for n in 2..=13 {
        for a in 0..n {
            for b in (a + 1)..n {
                let system = Simulated::numbered(n, &[a, b]);
                let (verdict, answers) = run_to_verdict(&system);
                assert_eq!(
                    verdict,
                    Verdict::Pair {
                        item_a: system.culprits[0].clone(),
                        item_b: system.culprits[1].clone(),
                    },
                    "n={n} pair=({a},{b})"
                );
                assert!(answers <= bound(n), "n={n} pair=({a},{b}): {answers} answers");
            }
        }
    }
}

// ─── 3. Undo ──────────────────────────────────────────────────────

#[test]
fn undo_reapplies_previous_configuration_and_decrements_step() {
    let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["D"]);
    let store = JsonMemory::default();
    let mut session = Session::open(&system, &store).expect("open");
    session.start().expect("start");
    session.report_feedback(false).expect("empty config passes");
    session.report_feedback(true).expect("first half fails");
    let step_before = session.state().current_step;
    let stage_before = session.state().stage();
    let suspects_before = session.state().algorithm_state.suspect_set();

    session.report_feedback(false).expect("[A, B] passes");
    assert_eq!(system.enabled(), ids(&["C", "D"]));

    assert!(session.undo().expect("undo"));
    assert_eq!(system.enabled(), ids(&["A", "B"]));
    assert_eq!(session.state().current_step, step_before);
    assert_eq!(session.state().stage(), stage_before);
    assert_eq!(session.state().algorithm_state.suspect_set(), suspects_before);
    assert_eq!(session.pending_configuration(), Some(ids(&["A", "B"])));

    // Answering differently after undo takes the other branch.
    session.report_feedback(true).expect("[A, B] fails this time");
    assert_eq!(session.state().stage(), Stage::VerifyPair);
    assert_eq!(system.enabled(), ids(&["A"]));
}

#[test]
fn undo_mid_cross_pair_search_restores_search_state() {
    let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["B", "G"]);
    let store = JsonMemory::default();
    let mut session = Session::open(&system, &store).expect("open");
    session.start().expect("start");
    for _ in 0..4 {
        session.report_feedback(system.symptom()).expect("answer");
    }
    assert_eq!(session.state().stage(), Stage::CrossPairBisectB);
    let snapshot = session.state().algorithm_state.clone();

    session.report_feedback(system.symptom()).expect("answer");
    assert_eq!(session.state().stage(), Stage::CrossPairBisectA);

    assert!(session.undo().expect("undo"));
    assert_eq!(session.state().algorithm_state, snapshot);
    assert_eq!(system.enabled(), ids(&["A", "B", "C", "D", "G"]));
}

#[test]
fn undo_on_fresh_session_changes_nothing() {
    let system = Simulated::new(&["A", "B"], &["A"]);
    let store = JsonMemory::default();
    let mut session = Session::open(&system, &store).expect("open");
    let before = session.state().clone();
    assert!(!session.undo().expect("undo"));
    assert_eq!(session.state(), &before);
    assert!(system.applied.borrow().is_empty());
}

// ─── 4. Abort ─────────────────────────────────────────────────────

#[test]
fn abort_and_restore_returns_to_original_from_any_depth() {
    for depth in 0..6 {
        let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["F"]);
        let store = JsonMemory::default();
        let mut session = Session::open(&system, &store).expect("open");
        session.start().expect("start");
        for _ in 0..depth {
            if session.state().is_running() {
                session.report_feedback(system.symptom()).expect("answer");
            }
        }
        session.abort_and_restore().expect("abort");
        assert_eq!(
            system.enabled(),
            ids(&["A", "B", "C", "D", "E", "F", "G", "H"]),
            "depth={depth}"
        );
        assert_eq!(session.state().status, SessionStatus::Idle);
    }
}

// ─── 5. Persistence round trip ────────────────────────────────────

#[test]
fn every_reachable_state_survives_save_and_load() {
    let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["B", "G"]);
    let store = JsonMemory::default();
    let mut session = Session::open(&system, &store).expect("open");
    session.start().expect("start");

    loop {
        let loaded = store.load().expect("load").expect("saved");
        let live = session.state();
        assert_eq!(loaded.status, live.status);
        assert_eq!(loaded.stage(), live.stage());
        assert_eq!(
            loaded.algorithm_state.suspect_set(),
            live.algorithm_state.suspect_set()
        );
        assert_eq!(&loaded, live);

        if !live.is_running() {
            break;
        }
        session.report_feedback(system.symptom()).expect("answer");
    }
}

#[test]
fn reopened_session_continues_where_it_left_off() {
    let system = Simulated::new(&["A", "B", "C", "D", "E", "F", "G", "H"], &["D"]);
    let store = JsonMemory::default();
    {
        let mut session = Session::open(&system, &store).expect("open");
        session.start().expect("start");
        session.report_feedback(system.symptom()).expect("answer");
        session.report_feedback(system.symptom()).expect("answer");
    }

    let mut session = Session::open(&system, &store).expect("reopen");
    loop {
        let result = session.report_feedback(system.symptom()).expect("answer");
        if let AlgorithmResult::SingleCulprit { item } = result {
            assert_eq!(item, "D");
            break;
        }
        assert!(!result.is_terminal(), "unexpected {result:?}");
    }
}

// ─── 6. Properties ────────────────────────────────────────────────

proptest! {
    #[test]
    fn split_half_sizes_and_order(items in proptest::collection::vec(any::<u16>(), 0..64)) {
        let (first, second) = split_half(&items);
        prop_assert_eq!(first.len(), items.len().div_ceil(2));
        prop_assert_eq!(second.len(), items.len() - first.len());
        let joined: Vec<u16> = first.iter().chain(second.iter()).copied().collect();
        prop_assert_eq!(joined, items);
    }

    #[test]
    fn single_culprit_converges(n in 1usize..48, pick in any::<prop::sample::Index>()) {
        let culprit = pick.index(n);
        let system = Simulated::numbered(n, &[culprit]);
        let expected = system.culprits[0].clone();
        let (verdict, answers) = run_to_verdict(&system);
        prop_assert_eq!(verdict, Verdict::Single { item: expected });
        prop_assert!(answers <= bound(n));
    }

    #[test]
    fn estimate_never_blocks_progress(n in 2usize..48, pick in any::<prop::sample::Index>()) {
        let system = Simulated::numbered(n, &[pick.index(n)]);
        let state = engine::init_state(system.universe.clone());
        prop_assert!(engine::estimate_remaining_steps(&state) >= 1);
        prop_assert!(engine::progress_percent(&state) < 100);
    }
}
