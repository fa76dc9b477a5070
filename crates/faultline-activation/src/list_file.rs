//! Enabled-list file backend.
//!
//! The live system reads a JSON array of enabled ids (for example an
//! Obsidian vault's `.obsidian/community-plugins.json`). Applying a
//! configuration rewrites that array.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use faultline_core::error::ActivationError;
use faultline_core::port::ActivationPort;
use faultline_core::types::ItemId;

pub struct ListFileActivation {
    path: PathBuf,
    excluded: BTreeSet<ItemId>,
}

impl ListFileActivation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            excluded: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_excluded(mut self, excluded: impl IntoIterator<Item = ItemId>) -> Self {
        self.excluded.extend(excluded);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents. A missing file means nothing is enabled.
    fn read_enabled(&self) -> Result<Vec<ItemId>, ActivationError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ActivationError::Malformed(format!("{}: {e}", self.path.display()))
        })
    }

    fn write_enabled(&self, enabled: &[ItemId]) -> Result<(), ActivationError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let output = serde_json::to_string_pretty(enabled)
            .map_err(|e| ActivationError::Malformed(e.to_string()))?;
        fs::write(&self.path, format!("{output}\n"))?;
        Ok(())
    }
}

impl ActivationPort for ListFileActivation {
    fn apply(&self, target: &[ItemId]) -> Result<(), ActivationError> {
        let current = self.read_enabled()?;

        // Excluded items keep their current state and position.
        let mut next: Vec<ItemId> = current
            .iter()
            .filter(|id| self.excluded.contains(*id))
            .cloned()
            .collect();
        for id in target {
            if !self.excluded.contains(id) && !next.contains(id) {
                next.push(id.clone());
            }
        }

        if next == current {
            debug!(path = %self.path.display(), "enabled list unchanged");
            return Ok(());
        }
        self.write_enabled(&next)?;
        debug!(
            path = %self.path.display(),
            enabled = next.len(),
            "enabled list rewritten"
        );
        Ok(())
    }

    fn list_universe(&self) -> Result<Vec<ItemId>, ActivationError> {
        Ok(self
            .read_enabled()?
            .into_iter()
            .filter(|id| !self.excluded.contains(id))
            .collect())
    }

    fn permanently_excluded(&self) -> BTreeSet<ItemId> {
        self.excluded.clone()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
