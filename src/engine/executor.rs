//! Execution wiring - deckhand-specific registry and progress output

use anyhow::Result;
use colored::Colorize;
use hostplan::inputs::ValidatingExecutor;
use hostplan::{
    ExecOptions, ExecutionObserver, ExecutionReport, ExecutorRegistry, HostRef, StepExecution,
    StepExecutor, StepStatus,
};
use std::sync::Arc;

use crate::config::ExecutionConfig;

/// Command-line overrides applied on top of [`ExecutionConfig`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOverrides {
    pub dry_run: bool,
    pub jobs: Option<usize>,
    pub steps: Vec<String>,
}

/// Build the executor registry for the actions enabled in config
pub fn build_registry(config: &ExecutionConfig) -> Result<ExecutorRegistry> {
    let validator: Arc<dyn StepExecutor> = Arc::new(ValidatingExecutor);
    let mut registry = ExecutorRegistry::new();
    for action in config.enabled_actions()? {
        registry.register(action, Arc::clone(&validator));
    }
    log::debug!("Executor registry: {registry:?}");
    Ok(registry)
}

/// Merge config defaults with command-line flags
pub fn exec_options(config: &ExecutionConfig, overrides: ExecuteOverrides) -> ExecOptions {
    ExecOptions {
        dry_run: overrides.dry_run || config.dry_run,
        max_parallel: overrides.jobs.unwrap_or(config.max_parallel),
        step_filter: overrides.steps,
    }
}

/// Prints one line per step as hosts make progress
///
/// Writes to stderr so stdout stays free for the JSON report.
pub struct ConsoleObserver {
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

fn host_name(host: &HostRef) -> &str {
    if host.is_global() {
        "(global)"
    } else {
        &host.logical_id
    }
}

impl ExecutionObserver for ConsoleObserver {
    fn on_host_start(&self, host: &HostRef, steps: usize) {
        if !self.quiet {
            eprintln!("  {} {} ({} steps)", "→".cyan(), host_name(host).bold(), steps);
        }
    }

    fn on_step_complete(&self, step: &StepExecution) {
        if self.quiet {
            return;
        }
        let symbol = match step.status {
            StepStatus::Succeeded => "✓".green(),
            StepStatus::Failed => "✗".red(),
            StepStatus::Skipped => "-".yellow(),
            StepStatus::Pending | StepStatus::Running => "?".dimmed(),
        };
        let code = step.code().map(|c| format!(" [{c}]")).unwrap_or_default();
        eprintln!(
            "    {} {}:{}{}",
            symbol,
            host_name(&step.host).dimmed(),
            step.step_id,
            code.dimmed()
        );
    }

    fn on_host_complete(&self, host: &HostRef, report: &ExecutionReport) {
        log::info!("{} finished: {}", host_name(host), report.status);
    }
}
