//! In-process store. Keeps the serialized form so a load goes through the
//! same serde path as the file store.

use std::sync::Mutex;

use faultline_core::error::StoreError;
use faultline_core::port::StateStore;
use faultline_core::types::TroubleshootState;

#[derive(Debug, Default)]
pub struct MemoryStore {
    json: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn save(&self, state: &TroubleshootState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        let mut guard = self
            .json
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("memory store lock poisoned")))?;
        *guard = Some(json);
        Ok(())
    }

    fn load(&self) -> Result<Option<TroubleshootState>, StoreError> {
        let guard = self
            .json
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("memory store lock poisoned")))?;
        match guard.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}
