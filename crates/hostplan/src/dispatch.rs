//! Local dispatcher - global steps first, then one worker per host

use crate::error::ExecuteError;
use crate::executor::{HostExecutor, check_order};
use crate::report::{ExecutionReport, StepExecution, StepStatus, codes};
use crate::types::{HostPlan, HostPlanStep, HostRef, SliceResult};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Execute a sliced plan in-process
///
/// Global steps run first, sequentially, on the "no host" target. A host
/// plan that waits on a global step which did not succeed is never
/// dispatched; its steps are reported as skipped instead. Remaining host
/// plans run in parallel with no coordination between hosts.
///
/// The merged report lists global steps first, then hosts by logical id.
pub fn dispatch(
    slice: &SliceResult,
    plan_id: &str,
    executor: &HostExecutor,
) -> Result<ExecutionReport, ExecuteError> {
    let global_host = HostRef::global();
    let global_steps: Vec<HostPlanStep> = slice.global_steps.iter().map(HostPlanStep::from).collect();

    // Structural problems abort before anything runs
    check_order(&global_steps, &global_host)?;
    for host_plan in slice.host_plans.values() {
        if host_plan.host.is_global() {
            return Err(ExecuteError::MissingHost {
                plan_id: plan_id.to_string(),
            });
        }
        check_order(&host_plan.steps, &host_plan.host)?;
    }

    let mut merged = if global_steps.is_empty() {
        ExecutionReport::from_steps(plan_id, Vec::with_capacity(slice.total_steps()))
    } else {
        executor.run_steps(plan_id, &global_host, &global_steps)
    };
    let succeeded_globals: HashSet<String> = merged
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Succeeded)
        .map(|s| s.step_id.clone())
        .collect();

    let mut host_reports: BTreeMap<&str, ExecutionReport> = BTreeMap::new();
    let mut runnable: Vec<&HostPlan> = Vec::new();

    for (host_id, host_plan) in &slice.host_plans {
        let unmet: Vec<String> = slice
            .required_globals(host_plan)
            .into_iter()
            .filter(|id| !succeeded_globals.contains(id))
            .collect();

        if unmet.is_empty() {
            runnable.push(host_plan);
        } else {
            log::warn!(
                "Not dispatching host {host_id:?}: global step(s) {} did not succeed",
                unmet.join(", ")
            );
            host_reports.insert(host_id, gated_report(plan_id, host_plan, &unmet, executor));
        }
    }

    if !runnable.is_empty() {
        let workers = match executor.options().max_parallel {
            0 => runnable.len(),
            n => n.min(runnable.len()),
        };
        log::debug!(
            "Dispatching {} host plan(s) on {workers} worker(s)",
            runnable.len()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ExecuteError::WorkerPool(e.to_string()))?;

        let results: Vec<(&str, ExecutionReport)> = pool.install(|| {
            runnable
                .par_iter()
                .map(|host_plan| {
                    let report = executor.run_steps(plan_id, &host_plan.host, &host_plan.steps);
                    (host_plan.host.logical_id.as_str(), report)
                })
                .collect()
        });
        host_reports.extend(results);
    }

    for report in host_reports.into_values() {
        merged.merge(report);
    }

    Ok(merged)
}

/// Report for a host plan that was held back by unmet global dependencies
fn gated_report(
    plan_id: &str,
    host_plan: &HostPlan,
    unmet: &[String],
    executor: &HostExecutor,
) -> ExecutionReport {
    let message = format!("global step(s) not completed: {}", unmet.join(", "));
    let steps = host_plan
        .steps
        .iter()
        .map(|step| {
            StepExecution::skipped(
                &step.id,
                host_plan.host.clone(),
                codes::GLOBAL_DEPENDENCY_UNMET,
                message.clone(),
            )
        })
        .collect();
    let report = ExecutionReport::from_steps(plan_id, steps);
    executor.notify_skipped_host(&host_plan.host, &report);
    report
}
