//! faultline-core: human-oracle bisection over a set of togglable items.
//! Pure stage machine, undo log, and the session that drives an
//! activation port and state store. No IO of its own.

pub mod engine;
pub mod error;
pub mod history;
pub mod port;
pub mod session;
pub mod types;

pub use engine::{AlgorithmResult, Transition, UndoPlan, split_half};
pub use error::{ActivationError, EngineError, SessionError, StoreError};
pub use history::{Feedback, HistoryAction, HistoryItem, HistoryLog};
pub use port::{ActivationPort, StateStore};
pub use session::Session;
pub use types::{
    AlgorithmState, Half, ItemId, SessionStatus, Stage, TroubleshootState, Verdict, VerifyStep,
};
