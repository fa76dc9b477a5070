//! Boundary traits for the live system and durable storage.
//! Implementations live in `faultline-activation` and `faultline-store`.

use std::collections::BTreeSet;

use crate::error::{ActivationError, StoreError};
use crate::types::{ItemId, TroubleshootState};

/// Brings the live system to a requested set of enabled items.
///
/// `apply` enables every member of `target` and disables every other item
/// it manages, except [`permanently_excluded`](Self::permanently_excluded)
/// ones which are never touched. It returns only once the change is complete
/// and must be idempotent under repeated identical calls.
pub trait ActivationPort {
    fn apply(&self, target: &[ItemId]) -> Result<(), ActivationError>;

    /// Items currently enabled, in a stable order, excluding permanently
    /// excluded ones.
    fn list_universe(&self) -> Result<Vec<ItemId>, ActivationError>;

    fn permanently_excluded(&self) -> BTreeSet<ItemId>;
}

impl<T: ActivationPort + ?Sized> ActivationPort for &T {
    fn apply(&self, target: &[ItemId]) -> Result<(), ActivationError> {
        (**self).apply(target)
    }

    fn list_universe(&self) -> Result<Vec<ItemId>, ActivationError> {
        (**self).list_universe()
    }

    fn permanently_excluded(&self) -> BTreeSet<ItemId> {
        (**self).permanently_excluded()
    }
}

impl<T: ActivationPort + ?Sized> ActivationPort for Box<T> {
    fn apply(&self, target: &[ItemId]) -> Result<(), ActivationError> {
        (**self).apply(target)
    }

    fn list_universe(&self) -> Result<Vec<ItemId>, ActivationError> {
        (**self).list_universe()
    }

    fn permanently_excluded(&self) -> BTreeSet<ItemId> {
        (**self).permanently_excluded()
    }
}

/// Durable save/load of the single live session.
pub trait StateStore {
    fn save(&self, state: &TroubleshootState) -> Result<(), StoreError>;

    /// The last saved state, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<TroubleshootState>, StoreError>;
}

impl<T: StateStore + ?Sized> StateStore for &T {
    fn save(&self, state: &TroubleshootState) -> Result<(), StoreError> {
        (**self).save(state)
    }

    fn load(&self) -> Result<Option<TroubleshootState>, StoreError> {
        (**self).load()
    }
}
