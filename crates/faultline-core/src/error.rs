//! Error taxonomy.
//!
//! Terminal search outcomes (`NotItemIssue`, isolation failure) are not
//! errors here; they are [`crate::types::Verdict`] values. These types cover
//! the boundaries: activation, persistence, and misuse of the command surface.

use thiserror::Error;

use crate::types::{ItemId, SessionStatus};

/// Failure to bring the live system to a requested configuration.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("activation io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("activation command failed: {0}")]
    CommandFailed(String),

    #[error("malformed activation data: {0}")]
    Malformed(String),

    /// Some items could not be toggled; the rest were.
    #[error("failed to toggle {} item(s): {}", failed.len(), failed.join(", "))]
    Partial { failed: Vec<ItemId> },
}

/// Failure to save or load session state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unsupported state file version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// The engine was asked to do something the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("session is {0}, not running")]
    NotRunning(SessionStatus),

    #[error("session has already applied its first configuration")]
    AlreadyStarted,

    #[error("no configuration has been applied yet; start the session first")]
    NothingApplied,
}

/// Errors surfaced by [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The pending configuration could not be applied. Session state is
    /// unchanged; repeating the same call re-requests `pending`.
    #[error("could not apply configuration ({} item(s) enabled): {source}", pending.len())]
    Activation {
        pending: Vec<ItemId>,
        #[source]
        source: ActivationError,
    },

    /// Nothing was committed and the previous configuration was put back.
    #[error("could not persist session state: {0}")]
    Persistence(#[from] StoreError),

    /// The live system did not match the configuration under test. It has
    /// been applied again and the answer was not recorded.
    #[error(
        "live configuration differs from the one under test ({} item(s) expected)",
        expected.len()
    )]
    Drift { expected: Vec<ItemId> },

    /// Bringing back the original configuration failed. Session state,
    /// including any verdict, is already saved.
    #[error("could not restore the original configuration: {0}")]
    Restore(#[source] ActivationError),

    #[error("could not list items to troubleshoot: {0}")]
    Universe(#[source] ActivationError),

    #[error("a session is already running")]
    AlreadyRunning,

    #[error("no completed session to acknowledge")]
    NotCompleted,
}
