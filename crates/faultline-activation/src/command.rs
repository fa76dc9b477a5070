//! External-command backend and the mock-injectable `CommandRunner` seam.
//!
//! Three argv templates drive the live system:
//!
//! - `list` prints enabled ids, one per line
//! - `enable` / `disable` toggle one item; `{id}` in any argument is
//!   replaced by the item id
//!
//! `apply` disables what should be off, then enables what should be on,
//! and carries on past individual failures so one stubborn item does not
//! leave the rest half-applied.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use faultline_core::error::ActivationError;
use faultline_core::port::ActivationPort;
use faultline_core::types::ItemId;

const ID_PLACEHOLDER: &str = "{id}";

/// Trait for executing external commands. Enables mock injection for testing.
pub trait CommandRunner: Send + Sync {
    /// Run `argv` and return its stdout.
    fn run(&self, argv: &[String]) -> Result<String, ActivationError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, argv: &[String]) -> Result<String, ActivationError> {
        (**self).run(argv)
    }
}

/// Real runner using `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String]) -> Result<String, ActivationError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ActivationError::Malformed("empty command".into()))?;
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(ActivationError::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ActivationError::CommandFailed(format!(
                "{program}: exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Argv templates for the three operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplates {
    pub list: Vec<String>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

impl CommandTemplates {
    fn validate(&self) -> Result<(), ActivationError> {
        for (name, argv) in [
            ("list", &self.list),
            ("enable", &self.enable),
            ("disable", &self.disable),
        ] {
            if argv.is_empty() {
                return Err(ActivationError::Malformed(format!("`{name}` command is empty")));
            }
        }
        Ok(())
    }
}

/// Replace `{id}` in every argument.
fn expand(template: &[String], id: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(ID_PLACEHOLDER, id))
        .collect()
}

fn parse_list(stdout: &str) -> Vec<ItemId> {
    let mut seen = BTreeSet::new();
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

pub struct CommandActivation<R: CommandRunner> {
    runner: R,
    templates: CommandTemplates,
    excluded: BTreeSet<ItemId>,
}

impl<R: CommandRunner> CommandActivation<R> {
    pub fn new(runner: R, templates: CommandTemplates) -> Result<Self, ActivationError> {
        templates.validate()?;
        Ok(Self {
            runner,
            templates,
            excluded: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn with_excluded(mut self, excluded: impl IntoIterator<Item = ItemId>) -> Self {
        self.excluded.extend(excluded);
        self
    }

    /// Every enabled id as reported by `list`, excluded ones included.
    fn live_enabled(&self) -> Result<Vec<ItemId>, ActivationError> {
        let stdout = self.runner.run(&self.templates.list)?;
        Ok(parse_list(&stdout))
    }

    fn toggle(&self, template: &[String], id: &ItemId, failed: &mut Vec<ItemId>) {
        match self.runner.run(&expand(template, id)) {
            Ok(_) => {}
            Err(e) => {
                warn!(item = %id, error = %e, "toggle failed");
                failed.push(id.clone());
            }
        }
    }
}

impl<R: CommandRunner> ActivationPort for CommandActivation<R> {
    fn apply(&self, target: &[ItemId]) -> Result<(), ActivationError> {
        let live = self.live_enabled()?;
        let wanted: BTreeSet<&str> = target.iter().map(String::as_str).collect();
        let live_set: BTreeSet<&str> = live.iter().map(String::as_str).collect();

        let to_disable: Vec<&ItemId> = live
            .iter()
            .filter(|id| !wanted.contains(id.as_str()) && !self.excluded.contains(*id))
            .collect();
        let to_enable: Vec<&ItemId> = target
            .iter()
            .filter(|id| !live_set.contains(id.as_str()) && !self.excluded.contains(*id))
            .collect();

        debug!(
            disable = to_disable.len(),
            enable = to_enable.len(),
            "applying configuration via commands"
        );

        let mut failed = Vec::new();
        for id in to_disable {
            self.toggle(&self.templates.disable, id, &mut failed);
        }
        for id in to_enable {
            self.toggle(&self.templates.enable, id, &mut failed);
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ActivationError::Partial { failed })
        }
    }

    fn list_universe(&self) -> Result<Vec<ItemId>, ActivationError> {
        Ok(self
            .live_enabled()?
            .into_iter()
            .filter(|id| !self.excluded.contains(id))
            .collect())
    }

    fn permanently_excluded(&self) -> BTreeSet<ItemId> {
        self.excluded.clone()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
