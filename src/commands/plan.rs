//! `deckhand plan` - validate, identify, slice and apply plans

use anyhow::{Context as AnyhowContext, Result, bail};
use hostplan::{
    Engine, ExecutePlanRequest, ExecutionReport, LocalEngine, Plan, PlanStep, SliceResult,
    decode_plan, derive_plan_id, encode_host_plan, slice_plan,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{emit_report, read_input, to_json, write_stdout};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::DeckhandConfig;
use crate::engine::{self, ConsoleObserver, ExecuteOverrides};
use crate::ui;

/// File holding the controller-side steps of a sliced plan
pub const GLOBAL_STEPS_FILE: &str = "global-steps.json";

/// Strictly decode a plan file
pub fn load_plan(path: &Path) -> Result<Plan> {
    let data = read_input(path)?;
    decode_plan(&data).with_context(|| format!("Invalid plan {}", path.display()))
}

fn load_and_slice(path: &Path) -> Result<(Plan, SliceResult)> {
    let plan = load_plan(path)?;
    let slice = slice_plan(&plan).with_context(|| format!("Cannot slice {}", path.display()))?;
    Ok((plan, slice))
}

// ============================================================================
// validate / id
// ============================================================================

pub fn validate(ctx: &Context, file: &Path) -> Result<()> {
    let (plan, slice) = load_and_slice(file)?;

    if !ctx.quiet {
        engine::display_slice(&plan.id, &slice);
        ui::success(&format!(
            "{} is valid: {} steps, {} hosts, {} global",
            file.display(),
            slice.total_steps(),
            slice.host_plans.len(),
            slice.global_steps.len()
        ));
    }
    Ok(())
}

pub fn id(ctx: &Context, file: &Path, environment: &str) -> Result<()> {
    let plan = load_plan(file)?;
    let derived = derive_plan_id(&plan, environment);

    if !plan.id.is_empty() && plan.id != derived && ctx.verbose > 0 {
        ui::kv("declared id", &plan.id);
    }
    println!("{derived}");
    Ok(())
}

// ============================================================================
// slice
// ============================================================================

/// Controller-side half of a sliced plan
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GlobalSteps<'a> {
    plan_id: &'a str,
    steps: &'a [PlanStep],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    dependency_refs: &'a BTreeMap<String, Vec<String>>,
}

pub fn slice(ctx: &Context, file: &Path, output_dir: Option<&Path>) -> Result<()> {
    let config = ctx.config()?;
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| config.slice_output_dir());

    let (plan, slice) = load_and_slice(file)?;

    match output_dir {
        Some(dir) => {
            let written = write_slice(&dir, &plan.id, &slice)?;
            if !ctx.quiet {
                for path in &written {
                    ui::kv("wrote", &path.display().to_string());
                }
                ui::success(&format!(
                    "Sliced {} into {} host plans",
                    plan.id,
                    slice.host_plans.len()
                ));
            }
            Ok(())
        }
        None => write_stdout(&to_json(&slice)?),
    }
}

/// Write one `hostplan-<host>.json` per host plus the global steps file
pub fn write_slice(dir: &Path, plan_id: &str, slice: &SliceResult) -> Result<Vec<PathBuf>> {
    // Resolve every file name up front so a collision writes nothing
    let mut files: BTreeMap<String, &str> = BTreeMap::new();
    for host in slice.host_plans.keys() {
        let name = host_plan_file_name(host);
        if let Some(other) = files.insert(name.clone(), host.as_str()) {
            bail!("Hosts {other:?} and {host:?} would both be written to {name}");
        }
    }

    fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;

    let mut written = Vec::with_capacity(files.len() + 1);
    for (name, host) in &files {
        let host_plan = &slice.host_plans[*host];
        let path = dir.join(name);
        let bytes = encode_host_plan(host_plan).context("Failed to encode host plan")?;
        fs::write(&path, bytes).with_context(|| format!("Could not write {}", path.display()))?;
        written.push(path);
    }

    let globals = GlobalSteps {
        plan_id,
        steps: &slice.global_steps,
        dependency_refs: &slice.global_dependency_refs,
    };
    let path = dir.join(GLOBAL_STEPS_FILE);
    fs::write(&path, to_json(&globals)?)
        .with_context(|| format!("Could not write {}", path.display()))?;
    written.push(path);

    log::debug!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

/// `hostplan-<host>.json`, with characters unsafe in file names replaced
pub fn host_plan_file_name(host: &str) -> String {
    let safe: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("hostplan-{safe}.json")
}

// ============================================================================
// apply
// ============================================================================

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = ctx.config()?;
    let plan = load_plan(&args.file)?;
    let overrides = ExecuteOverrides {
        dry_run: args.run.dry_run,
        jobs: args.jobs,
        steps: args.run.steps,
    };

    let report = execute(&config, plan, overrides, ConsoleObserver::new(ctx.quiet))?;
    emit_report(ctx, &report, args.run.output.as_deref())
}

/// Run a plan in-process with the configured executors
pub fn execute(
    config: &DeckhandConfig,
    plan: Plan,
    overrides: ExecuteOverrides,
    observer: ConsoleObserver,
) -> Result<ExecutionReport> {
    let registry = engine::build_registry(&config.execution)?;
    let options = engine::exec_options(&config.execution, overrides);
    let local = LocalEngine::new(registry).with_observer(Arc::new(observer));

    let plan_id = plan.id.clone();
    let response = local
        .execute_plan(ExecutePlanRequest { plan, options })
        .with_context(|| format!("Failed to execute plan {plan_id}"))?;
    Ok(response.report)
}

// ============================================================================
// Tests
// ============================================================================
