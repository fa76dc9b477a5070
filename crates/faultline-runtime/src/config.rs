//! `faultline.toml`: where state lives, which items are off limits, and
//! how to reach the live system.
//!
//! ```toml
//! state_path = "/home/me/.local/state/faultline/session.json"
//! exclude = ["obsidian-git"]
//!
//! [activation]
//! kind = "command"
//! list = ["svc", "list-enabled"]
//! enable = ["svc", "enable", "{id}"]
//! disable = ["svc", "disable", "{id}"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use faultline_activation::{CommandActivation, CommandTemplates, ListFileActivation, ProcessRunner};
use faultline_core::port::ActivationPort;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "faultline.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub state_path: Option<PathBuf>,
    /// Items never toggled and never suspected.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub activation: ActivationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActivationConfig {
    /// JSON array of enabled ids in a file.
    ListFile {
        #[serde(default = "default_list_file")]
        path: PathBuf,
    },
    /// External commands; `{id}` is replaced per item.
    Command {
        list: Vec<String>,
        enable: Vec<String>,
        disable: Vec<String>,
    },
}

fn default_list_file() -> PathBuf {
    PathBuf::from(".obsidian/community-plugins.json")
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self::ListFile {
            path: default_list_file(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `explicit` (which must exist), else `./faultline.toml` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    tracing::debug!("no config file; using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// `--state` wins over `state_path`, which wins over the per-user default.
    pub fn resolve_state_path(&self, cli_state: Option<PathBuf>) -> PathBuf {
        cli_state
            .or_else(|| self.state_path.clone())
            .unwrap_or_else(crate::cli::default_state_path)
    }

    /// Build the activation backend this config describes.
    pub fn build_port(&self) -> anyhow::Result<Box<dyn ActivationPort>> {
        let excluded = self.exclude.iter().cloned();
        match &self.activation {
            ActivationConfig::ListFile { path } => Ok(Box::new(
                ListFileActivation::new(path.clone()).with_excluded(excluded),
            )),
            ActivationConfig::Command {
                list,
                enable,
                disable,
            } => {
                let templates = CommandTemplates {
                    list: list.clone(),
                    enable: enable.clone(),
                    disable: disable.clone(),
                };
                let port = CommandActivation::new(ProcessRunner, templates)
                    .context("invalid [activation] commands")?
                    .with_excluded(excluded);
                Ok(Box::new(port))
            }
        }
    }
}
