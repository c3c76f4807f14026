//! Host executor - runs one host's steps in order and reports on each

use crate::context::{ExecutionObserver, ExecutorRegistry, NoObserver, StepContext};
use crate::engine::ExecOptions;
use crate::error::ExecuteError;
use crate::report::{
    ExecutionError, ExecutionReport, LogLine, StepExecution, StepStatus, codes, timestamp,
};
use crate::types::{HostPlan, HostPlanStep, HostRef};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Executes host plans (and the global step list) through an [`ExecutorRegistry`]
///
/// Steps run strictly in list order. Only succeeded steps satisfy
/// dependencies; once a step fails every later step is reported as halted.
#[derive(Clone)]
pub struct HostExecutor {
    registry: ExecutorRegistry,
    options: ExecOptions,
    observer: Arc<dyn ExecutionObserver>,
}

impl HostExecutor {
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self {
            registry,
            options: ExecOptions::default(),
            observer: Arc::new(NoObserver),
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    /// Execute every step of a host plan
    ///
    /// Errors are structural (no host, dependency outside the list or ordered
    /// after its dependent); step failures are reported, not returned.
    pub fn execute_host_plan(&self, host_plan: &HostPlan) -> Result<ExecutionReport, ExecuteError> {
        if host_plan.host.is_global() {
            return Err(ExecuteError::MissingHost {
                plan_id: host_plan.plan_id.clone(),
            });
        }
        check_order(&host_plan.steps, &host_plan.host)?;
        Ok(self.run_steps(&host_plan.plan_id, &host_plan.host, &host_plan.steps))
    }

    /// Run an already validated step list for `host`
    pub(crate) fn run_steps(
        &self,
        plan_id: &str,
        host: &HostRef,
        steps: &[HostPlanStep],
    ) -> ExecutionReport {
        self.observer.on_host_start(host, steps.len());

        let ctx = StepContext {
            plan_id,
            host,
            dry_run: self.options.dry_run,
        };
        let mut succeeded: HashSet<&str> = HashSet::with_capacity(steps.len());
        let mut halted_by: Option<&str> = None;
        let mut records = Vec::with_capacity(steps.len());

        for step in steps {
            let record = if let Some(failed) = halted_by {
                skip(step, host, codes::HALTED, format!("step {failed:?} failed earlier on this host"))
            } else if !self.options.includes(&step.id) {
                skip(step, host, codes::FILTERED, "excluded by step filter")
            } else if let Some(dep) = step
                .depends_on
                .iter()
                .find(|dep| !succeeded.contains(dep.as_str()))
            {
                skip(
                    step,
                    host,
                    codes::DEPENDENCY_NOT_COMPLETED,
                    format!("dependency {dep:?} did not complete"),
                )
            } else {
                self.run_one(step, &ctx)
            };

            match record.status {
                StepStatus::Succeeded => {
                    succeeded.insert(step.id.as_str());
                }
                StepStatus::Failed => halted_by = Some(step.id.as_str()),
                _ => {}
            }

            self.observer.on_step_complete(&record);
            records.push(record);
        }

        let report = ExecutionReport::from_steps(plan_id, records);
        self.observer.on_host_complete(host, &report);
        report
    }

    /// Report a host that was never dispatched to the observer
    pub(crate) fn notify_skipped_host(&self, host: &HostRef, report: &ExecutionReport) {
        self.observer.on_host_start(host, report.steps.len());
        for step in &report.steps {
            self.observer.on_step_complete(step);
        }
        self.observer.on_host_complete(host, report);
    }

    fn run_one(&self, step: &HostPlanStep, ctx: &StepContext<'_>) -> StepExecution {
        let Some(executor) = self.registry.get(step.action) else {
            return skip(
                step,
                ctx.host,
                codes::NO_EXECUTOR,
                format!("no executor registered for action {:?}", step.action.as_str()),
            );
        };

        let mut record = StepExecution::pending(&step.id, ctx.host.clone());
        record.started_at = timestamp();

        match executor.execute(step, ctx) {
            Ok(logs) => {
                record.status = StepStatus::Succeeded;
                record.logs = logs;
            }
            Err(e) => {
                log::warn!(
                    "Step {:?} on {} failed: {e:#}",
                    step.id,
                    host_label(ctx.host)
                );
                record.status = StepStatus::Failed;
                record.logs.push(LogLine::stderr(format!("{e:#}")));
                record.error = Some(ExecutionError::new(codes::EXECUTION_ERROR, format!("{e:#}")));
            }
        }

        record.completed_at = timestamp();
        record
    }
}

fn skip(step: &HostPlanStep, host: &HostRef, code: &str, message: impl Into<String>) -> StepExecution {
    let message = message.into();
    log::debug!(
        "Skipping step {:?} on {} ({code}): {message}",
        step.id,
        host_label(host)
    );
    StepExecution::skipped(&step.id, host.clone(), code, message)
}

/// Every dependency must name a step that appears earlier in `steps`
pub(crate) fn check_order(steps: &[HostPlanStep], host: &HostRef) -> Result<(), ExecuteError> {
    let positions: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(pos, step)| (step.id.as_str(), pos))
        .collect();

    for (pos, step) in steps.iter().enumerate() {
        for dep in &step.depends_on {
            match positions.get(dep.as_str()) {
                None => {
                    return Err(ExecuteError::UnresolvedDependency {
                        step: step.id.clone(),
                        host: host.logical_id.clone(),
                        dependency: dep.clone(),
                    });
                }
                Some(&dep_pos) if dep_pos >= pos => {
                    return Err(ExecuteError::DependencyOrder {
                        step: step.id.clone(),
                        host: host.logical_id.clone(),
                        dependency: dep.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Display name for a host in log lines
pub(crate) fn host_label(host: &HostRef) -> String {
    if host.is_global() {
        "global".to_string()
    } else {
        format!("host {:?}", host.logical_id)
    }
}
