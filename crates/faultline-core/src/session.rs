//! One isolation session: engine state plus the port and store it drives.
//!
//! The engine proposes transitions; the session applies the proposed
//! configuration, saves the proposed state, and only then commits it. A
//! failed `apply` leaves stage and suspect sets untouched, and answering
//! again requests the same configuration. A failed save puts the previous
//! configuration back, so the live system and the saved file agree.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::engine::{self, AlgorithmResult, Transition};
use crate::error::SessionError;
use crate::port::{ActivationPort, StateStore};
use crate::types::{ItemId, SessionStatus, TroubleshootState, Verdict};

pub struct Session<P, S> {
    port: P,
    store: S,
    state: TroubleshootState,
}

impl<P: ActivationPort, S: StateStore> Session<P, S> {
    /// Load the saved session. Running sessions resume, completed ones are
    /// kept until acknowledged, anything else starts idle.
    pub fn open(port: P, store: S) -> Result<Self, SessionError> {
        let state = match store.load()? {
            Some(saved)
                if matches!(saved.status, SessionStatus::Running | SessionStatus::Completed) =>
            {
                info!(
                    status = %saved.status,
                    stage = %saved.stage(),
                    step = saved.current_step,
                    "resuming saved session"
                );
                saved
            }
            Some(saved) => {
                debug!(status = %saved.status, "discarding inactive saved session");
                TroubleshootState::idle()
            }
            None => TroubleshootState::idle(),
        };
        Ok(Self { port, store, state })
    }

    pub fn state(&self) -> &TroubleshootState {
        &self.state
    }

    pub fn result(&self) -> Option<&Verdict> {
        self.state.result.as_ref()
    }

    /// Configuration waiting for an oracle answer.
    pub fn pending_configuration(&self) -> Option<Vec<ItemId>> {
        engine::pending_configuration(&self.state)
    }

    pub fn pending_description(&self) -> Option<String> {
        self.state
            .awaiting_feedback()
            .then(|| engine::describe(&self.state.algorithm_state))
    }

    pub fn estimate_remaining_steps(&self) -> u32 {
        engine::estimate_remaining_steps(&self.state)
    }

    // ─── Commands ────────────────────────────────────────────────────

    /// Begin a session over the port's current universe and disable everything.
    ///
    /// A running session whose first step was undone is restarted over its
    /// recorded universe instead of re-listing. A fresh universe is saved
    /// before anything is disabled, so the original configuration survives
    /// a failed save later on.
    pub fn start(&mut self) -> Result<AlgorithmResult, SessionError> {
        if self.state.awaiting_feedback() {
            return Err(SessionError::AlreadyRunning);
        }

        if !self.state.is_running() {
            let excluded = self.port.permanently_excluded();
            let universe: Vec<ItemId> = self
                .port
                .list_universe()
                .map_err(SessionError::Universe)?
                .into_iter()
                .filter(|id| !excluded.contains(id))
                .collect();
            let prepared = engine::init_state(universe);
            self.save_state(&prepared)?;
            self.state = prepared;
        }

        info!(
            items = self.state.original_enabled_set.len(),
            "starting isolation session"
        );
        let transition = engine::start(&self.state, Utc::now())?;
        self.apply_and_commit(transition)
    }

    /// Feed the oracle's answer for the configuration currently applied.
    ///
    /// `NotItemIssue` and `Error` verdicts restore the original configuration
    /// right away; culprit verdicts leave the last test configuration active
    /// until [`acknowledge`](Self::acknowledge).
    ///
    /// The answer is refused with [`SessionError::Drift`] when the live
    /// configuration is not the one under test; that configuration is then
    /// applied again so the user can re-check.
    pub fn report_feedback(
        &mut self,
        problem_persists: bool,
    ) -> Result<AlgorithmResult, SessionError> {
        if self.state.awaiting_feedback() {
            self.ensure_live_matches()?;
        }
        let transition = engine::step(&self.state, problem_persists, Utc::now())?;
        let result = self.apply_and_commit(transition)?;

        if let Some(verdict) = result.verdict() {
            info!(%verdict, steps = self.state.current_step, "isolation finished");
            if !verdict.is_culprit() {
                warn!("no culprit identified; restoring original configuration");
                self.restore_original()?;
            }
        }
        Ok(result)
    }

    /// Step back one configuration. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        let Some(plan) = engine::undo(&self.state) else {
            return Ok(false);
        };
        self.apply(&plan.restore_config)?;
        if let Err(e) = self.save_state(&plan.next) {
            self.roll_back();
            return Err(e);
        }
        self.state = plan.next;
        info!(step = self.state.current_step, "undid last step");
        Ok(true)
    }

    /// Re-apply the configuration the session believes is active. Used after
    /// a restart or an interrupted `apply`.
    pub fn reapply(&self) -> Result<(), SessionError> {
        if self.state.is_running() {
            self.apply(&self.state.active_set)?;
        }
        Ok(())
    }

    /// Bring the live system back to the items enabled at session start.
    pub fn restore_original(&self) -> Result<(), SessionError> {
        // An idle state records no universe; applying it would disable everything.
        if self.state.status == SessionStatus::Idle {
            return Ok(());
        }
        self.port.apply(&self.state.original_enabled_set).map_err(|source| {
            warn!(error = %source, "restoring original configuration failed");
            SessionError::Restore(source)
        })?;
        info!(
            items = self.state.original_enabled_set.len(),
            "original configuration restored"
        );
        Ok(())
    }

    /// Restore the original configuration and discard the session.
    pub fn abort_and_restore(&mut self) -> Result<(), SessionError> {
        self.restore_original()?;
        self.state = TroubleshootState::idle();
        self.persist()?;
        info!("session aborted; original configuration restored");
        Ok(())
    }

    /// Discard the session, leaving the live configuration as it is.
    pub fn abort_and_keep(&mut self) -> Result<(), SessionError> {
        if self.state.status == SessionStatus::Idle {
            return Ok(());
        }
        self.state.status = SessionStatus::Aborted;
        self.state.result = None;
        self.persist()?;
        info!(
            active = self.state.active_set.len(),
            "session aborted; current configuration kept"
        );
        Ok(())
    }

    /// Discard a completed session, optionally restoring the original
    /// configuration first.
    pub fn acknowledge(&mut self, restore: bool) -> Result<(), SessionError> {
        if self.state.status != SessionStatus::Completed {
            return Err(SessionError::NotCompleted);
        }
        if restore {
            self.restore_original()?;
        }
        self.state = TroubleshootState::idle();
        self.persist()?;
        Ok(())
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn apply(&self, config: &[ItemId]) -> Result<(), SessionError> {
        self.port.apply(config).map_err(|source| {
            warn!(items = config.len(), error = %source, "activation failed");
            SessionError::Activation {
                pending: config.to_vec(),
                source,
            }
        })
    }

    fn apply_and_commit(
        &mut self,
        transition: Transition,
    ) -> Result<AlgorithmResult, SessionError> {
        if let AlgorithmResult::Continue {
            next_config,
            description,
        } = &transition.result
        {
            self.apply(next_config)?;
            debug!(
                step = transition.next.current_step,
                items = next_config.len(),
                %description,
                "applied test configuration"
            );
        }
        if let Err(e) = self.save_state(&transition.next) {
            if !transition.result.is_terminal() {
                self.roll_back();
            }
            return Err(e);
        }
        self.state = transition.next;
        Ok(transition.result)
    }

    /// Put the committed `active_set` back after a change that could not be saved.
    fn roll_back(&self) {
        match self.port.apply(&self.state.active_set) {
            Ok(()) => info!(
                items = self.state.active_set.len(),
                "previous configuration re-applied after failed save"
            ),
            Err(e) => warn!(error = %e, "could not re-apply previous configuration"),
        }
    }

    /// Refuse an answer given while the live system differs from the
    /// configuration under test.
    fn ensure_live_matches(&self) -> Result<(), SessionError> {
        let excluded = self.port.permanently_excluded();
        let live: BTreeSet<ItemId> = self
            .port
            .list_universe()
            .map_err(SessionError::Universe)?
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .collect();
        let expected: BTreeSet<ItemId> = self.state.active_set.iter().cloned().collect();
        if live == expected {
            return Ok(());
        }

        warn!(
            live = live.len(),
            expected = expected.len(),
            "live configuration drifted from the test configuration"
        );
        self.apply(&self.state.active_set)?;
        Err(SessionError::Drift {
            expected: self.state.active_set.clone(),
        })
    }

    fn persist(&self) -> Result<(), SessionError> {
        self.save_state(&self.state)
    }

    fn save_state(&self, state: &TroubleshootState) -> Result<(), SessionError> {
        self.store.save(state).map_err(|e| {
            warn!(error = %e, "failed to save session state");
            SessionError::Persistence(e)
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────
