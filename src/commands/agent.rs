//! `deckhand agent` - run a host plan received from a controller

use anyhow::{Context as AnyhowContext, Result};
use hostplan::{ExecutionReport, HostExecutor, HostPlan, decode_host_plan, peek_plan_id};
use std::path::Path;
use std::sync::Arc;

use super::{emit_report, read_input};
use crate::Context;
use crate::cli::RunArgs;
use crate::config::DeckhandConfig;
use crate::engine::{self, ConsoleObserver, ExecuteOverrides};

pub fn run(ctx: &Context, hostplan: &Path, args: RunArgs) -> Result<()> {
    let config = ctx.config()?;
    let host_plan = load_host_plan(hostplan)?;
    let overrides = ExecuteOverrides {
        dry_run: args.dry_run,
        jobs: None,
        steps: args.steps,
    };

    if ctx.verbose > 0 {
        log::info!(
            "Running {} steps of plan {} on {}",
            host_plan.steps.len(),
            host_plan.plan_id,
            host_plan.host.logical_id
        );
    }

    let report = execute(&config, &host_plan, overrides, ConsoleObserver::new(ctx.quiet))?;
    emit_report(ctx, &report, args.output.as_deref())
}

/// Strictly decode a host plan file, naming its plan in errors when possible
pub fn load_host_plan(path: &Path) -> Result<HostPlan> {
    let data = read_input(path)?;
    let plan_id = peek_plan_id(&data);
    decode_host_plan(&data, plan_id.as_deref())
        .with_context(|| format!("Invalid host plan {}", path.display()))
}

pub fn execute(
    config: &DeckhandConfig,
    host_plan: &HostPlan,
    overrides: ExecuteOverrides,
    observer: ConsoleObserver,
) -> Result<ExecutionReport> {
    let registry = engine::build_registry(&config.execution)?;
    let executor = HostExecutor::new(registry)
        .with_options(engine::exec_options(&config.execution, overrides))
        .with_observer(Arc::new(observer));

    let mut report = executor
        .execute_host_plan(host_plan)
        .with_context(|| format!("Cannot run host plan for {}", host_plan.host.logical_id))?;
    if executor.options().dry_run {
        report.meta.insert("dryRun".into(), "true".into());
    }
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
