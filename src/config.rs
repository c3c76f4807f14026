use anyhow::{Context, Result, bail};
use hostplan::StepAction;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

// ============================================================================
// Main Config Schema
// ============================================================================

/// The deckhand configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckhandConfig {
    /// Defaults for `plan slice`
    #[serde(default)]
    pub slice: SliceConfig,

    /// Defaults for `plan apply` and `agent run`
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceConfig {
    /// Directory host plans are written to when `--output-dir` is omitted
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Concurrent host workers; 0 means one per host
    #[serde(default)]
    pub max_parallel: usize,

    #[serde(default)]
    pub dry_run: bool,

    /// Step actions that get an executor; the rest report NO_EXECUTOR
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

fn default_actions() -> Vec<String> {
    StepAction::ALL.iter().map(ToString::to_string).collect()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            dry_run: false,
            actions: default_actions(),
        }
    }
}

impl DeckhandConfig {
    /// Load the config from `path`, or from the default location
    ///
    /// A missing default file yields defaults; an explicitly named file
    /// must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (paths::config_file()?, false),
        };

        if !config_path.exists() {
            if explicit {
                bail!("Config file not found: {}", config_path.display());
            }
            log::debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read {}", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", config_path.display()))
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format in deckhand config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.execution.enabled_actions().map(|_| ())
    }

    /// Expanded default output directory for sliced host plans
    pub fn slice_output_dir(&self) -> Option<PathBuf> {
        self.slice.output_dir.as_deref().map(paths::expand)
    }
}

impl ExecutionConfig {
    /// Parsed `actions`, rejecting unknown names
    pub fn enabled_actions(&self) -> Result<Vec<StepAction>> {
        self.actions
            .iter()
            .map(|name| {
                name.parse::<StepAction>()
                    .map_err(|e| anyhow::anyhow!("[execution].actions: {e}"))
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
