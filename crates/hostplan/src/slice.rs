//! Slicer - partitions a plan into per-host work orders
//!
//! Three passes over the input, none of which mutate it:
//! 1. index every step id by owner (global or a host) and reject duplicates
//! 2. order global steps by `(index, id)` and validate their dependencies
//! 3. assign host steps to host plans, splitting dependencies into local
//!    ones and global refs while rejecting anything that crosses hosts

use crate::error::SliceError;
use crate::types::{
    Annotations, HOST_PLAN_SCHEMA_VERSION, HostPlan, HostPlanStep, Plan, PlanStep, SliceResult,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Who owns a step id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner<'a> {
    Global,
    Host(&'a str),
}

/// Partition `plan` into host plans and global steps
///
/// Pure and deterministic: slicing the same plan twice yields results that
/// serialize byte-identically. Failure is all-or-nothing.
///
/// Stricter than a pass-through slicer: a global step may only depend on
/// other global steps. Plans where a global step waits on a host step are
/// rejected with [`SliceError::GlobalDependsOnHost`], since global steps run
/// before any host plan is dispatched and that ordering could never hold.
/// Producers that emit such plans must move the step onto a host.
pub fn slice_plan(plan: &Plan) -> Result<SliceResult, SliceError> {
    let owners = index_owners(plan)?;

    // Global steps run first, in canonical order
    let mut global_steps: Vec<&PlanStep> = plan.steps.iter().filter(|s| s.is_global()).collect();
    global_steps.sort_by(|a, b| step_order(a.index, &a.id, b.index, &b.id));

    for step in &global_steps {
        for dep in &step.depends_on {
            match owners.get(dep.as_str()) {
                None => {
                    return Err(SliceError::UnknownStep {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                Some(Owner::Host(dep_host)) => {
                    return Err(SliceError::GlobalDependsOnHost {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                        dependency_host: (*dep_host).to_string(),
                    });
                }
                Some(Owner::Global) => {}
            }
        }
    }

    let mut host_plans: BTreeMap<String, HostPlan> = BTreeMap::new();
    let mut global_refs: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

    for step in plan.steps.iter().filter(|s| !s.is_global()) {
        let host = step.host.logical_id.as_str();
        let mut local: BTreeSet<&str> = BTreeSet::new();

        for dep in &step.depends_on {
            match owners.get(dep.as_str()) {
                None => {
                    return Err(SliceError::UnknownStep {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                Some(Owner::Global) => {
                    global_refs
                        .entry(step.id.clone())
                        .or_default()
                        .insert(dep.as_str());
                }
                Some(Owner::Host(dep_host)) if *dep_host == host => {
                    local.insert(dep.as_str());
                }
                Some(Owner::Host(dep_host)) => {
                    return Err(SliceError::CrossHost {
                        step: step.id.clone(),
                        host: host.to_string(),
                        dependency: dep.clone(),
                        dependency_host: (*dep_host).to_string(),
                    });
                }
            }
        }

        let mut host_step = HostPlanStep::from(step);
        host_step.depends_on = local.into_iter().map(str::to_string).collect();

        host_plans
            .entry(host.to_string())
            .or_insert_with(|| HostPlan {
                version: HOST_PLAN_SCHEMA_VERSION.to_string(),
                plan_id: plan.id.clone(),
                host: step.host.clone(),
                steps: Vec::new(),
                meta: Annotations::new(),
            })
            .steps
            .push(host_step);
    }

    for host_plan in host_plans.values_mut() {
        host_plan
            .steps
            .sort_by(|a, b| step_order(a.index, &a.id, b.index, &b.id));
    }

    let result = SliceResult {
        host_plans,
        global_step_ids: global_steps.iter().map(|s| s.id.clone()).collect(),
        global_steps: global_steps.into_iter().cloned().collect(),
        global_dependency_refs: global_refs
            .into_iter()
            .map(|(step, deps)| (step, deps.into_iter().map(str::to_string).collect()))
            .collect(),
    };

    log::debug!(
        "Sliced plan {:?}: {} host plan(s), {} global step(s), {} step(s) waiting on globals",
        plan.id,
        result.host_plans.len(),
        result.global_steps.len(),
        result.global_dependency_refs.len()
    );

    Ok(result)
}

fn index_owners(plan: &Plan) -> Result<HashMap<&str, Owner<'_>>, SliceError> {
    let mut owners = HashMap::with_capacity(plan.steps.len());
    for step in &plan.steps {
        let owner = if step.is_global() {
            Owner::Global
        } else {
            Owner::Host(step.host.logical_id.as_str())
        };
        if owners.insert(step.id.as_str(), owner).is_some() {
            return Err(SliceError::DuplicateStep {
                plan_id: plan.id.clone(),
                step: step.id.clone(),
            });
        }
    }
    Ok(owners)
}

/// Canonical step order: index ascending, then id
pub(crate) fn step_order(a_index: i64, a_id: &str, b_index: i64, b_id: &str) -> Ordering {
    a_index.cmp(&b_index).then_with(|| a_id.cmp(b_id))
}
