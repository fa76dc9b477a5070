//! Versioned JSON session file.
//!
//! Layout: `{ "version": 1, "saved_at": "<rfc3339>", "state": { ... } }`.
//! Saves go to a sibling temp file which is then renamed over the target,
//! so a crash mid-write leaves the previous save intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use faultline_core::error::StoreError;
use faultline_core::port::StateStore;
use faultline_core::types::TroubleshootState;

/// Newest envelope version this build reads and the one it writes.
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: &'a TroubleshootState,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    state: TroubleshootState,
}

/// [`StateStore`] backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`. Nothing is touched until the first save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStore {
    fn save(&self, state: &TroubleshootState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let envelope = EnvelopeOut {
            version: STATE_FORMAT_VERSION,
            saved_at: Utc::now(),
            state,
        };
        let output = serde_json::to_string_pretty(&envelope)?;

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(output.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            status = %state.status,
            step = state.current_step,
            "session state saved"
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<TroubleshootState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let header: Header = serde_json::from_str(&content)?;
        if header.version > STATE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: header.version,
                supported: STATE_FORMAT_VERSION,
            });
        }

        let envelope: EnvelopeIn = serde_json::from_str(&content)?;
        Ok(Some(envelope.state))
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::engine;

    fn running_state() -> TroubleshootState {
        let state = engine::init_state(vec!["a".into(), "b".into(), "c".into()]);
        let started = engine::start(&state, Utc::now()).expect("start").next;
        engine::step(&started, false, Utc::now()).expect("step").next
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("session.json"));
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_then_load_returns_same_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("nested/dir/session.json"));
        let state = running_state();

        store.save(&state).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded, state);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn file_is_versioned_envelope() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("session.json"));
        store.save(&running_state()).expect("save");

        let raw = fs::read_to_string(store.path()).expect("read");
        assert!(raw.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["version"], 1);
        assert!(value["saved_at"].is_string());
        assert_eq!(value["state"]["status"], "running");
        assert_eq!(value["state"]["algorithm_state"]["stage"], "bisect-main");
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"version": 7, "saved_at": "2026-03-01T09:00:00Z", "state": {}}"#)
            .expect("write");

        let err = JsonFileStore::open(&path).load().expect_err("unsupported");
        assert!(matches!(
            err,
            StoreError::UnsupportedVersion {
                found: 7,
                supported: 1
            }
        ));
    }

    #[test]
    fn corrupt_file_is_serde_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").expect("write");
        let err = JsonFileStore::open(&path).load().expect_err("corrupt");
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[test]
    fn save_overwrites_previous() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("session.json"));
        store.save(&running_state()).expect("first save");
        store.save(&TroubleshootState::idle()).expect("second save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded, TroubleshootState::idle());
    }
}
