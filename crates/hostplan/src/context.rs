//! Execution context and provider traits
//!
//! These traits let the executor run steps without depending on any
//! concrete provider, terminal UI or transport.

use crate::report::{ExecutionReport, LogLine, StepExecution};
use crate::types::{HostPlanStep, HostRef, StepAction};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Context passed to every step execution
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Plan the step belongs to
    pub plan_id: &'a str,
    /// Host the step runs on; global for controller-side steps
    pub host: &'a HostRef,
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
}

/// Runs a single step for one action
///
/// Implementations own the provider-specific work. An `Err` marks the step
/// failed; the returned log lines are attached to the step's record.
pub trait StepExecutor: Send + Sync {
    fn execute(&self, step: &HostPlanStep, ctx: &StepContext<'_>) -> Result<Vec<LogLine>>;
}

/// Explicit action to executor lookup table
///
/// Built by the caller and passed in; there is no process-wide registry.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: BTreeMap<StepAction, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` for `action`, replacing any previous one
    pub fn register(&mut self, action: StepAction, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(action, executor);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, action: StepAction, executor: Arc<dyn StepExecutor>) -> Self {
        self.register(action, executor);
        self
    }

    pub fn get(&self, action: StepAction) -> Option<&Arc<dyn StepExecutor>> {
        self.executors.get(&action)
    }

    /// Registered actions in stable order
    pub fn actions(&self) -> impl Iterator<Item = StepAction> + '_ {
        self.executors.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.actions()).finish()
    }
}

/// Progress callback for execution operations
///
/// Called from worker threads, so implementations must be thread-safe.
/// Every method defaults to a no-op.
pub trait ExecutionObserver: Send + Sync {
    /// Called before the first step of a host (or of the global steps) runs
    fn on_host_start(&self, _host: &HostRef, _steps: usize) {}

    /// Called after each step is recorded, including skipped ones
    fn on_step_complete(&self, _step: &StepExecution) {}

    /// Called once a host's report is final
    fn on_host_complete(&self, _host: &HostRef, _report: &ExecutionReport) {}
}

/// No-op observer
pub struct NoObserver;

impl ExecutionObserver for NoObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl StepExecutor for Echo {
        fn execute(&self, step: &HostPlanStep, ctx: &StepContext<'_>) -> Result<Vec<LogLine>> {
            Ok(vec![LogLine::system(format!(
                "{} on {} (dry run: {})",
                step.id, ctx.host.logical_id, ctx.dry_run
            ))])
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ExecutorRegistry::new()
            .with(StepAction::Noop, Arc::new(Echo))
            .with(StepAction::Build, Arc::new(Echo));

        assert!(registry.get(StepAction::Noop).is_some());
        assert!(registry.get(StepAction::Rollout).is_none());
        assert_eq!(
            registry.actions().collect::<Vec<_>>(),
            [StepAction::Noop, StepAction::Build]
        );
        assert_eq!(format!("{registry:?}"), "[Noop, Build]");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ExecutorRegistry::new();
        assert!(registry.is_empty());
        registry.register(StepAction::Noop, Arc::new(Echo));
        registry.register(StepAction::Noop, Arc::new(Echo));
        assert_eq!(registry.actions().count(), 1);
    }
}
