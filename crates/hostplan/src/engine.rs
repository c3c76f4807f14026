//! Engine facade - plan computation, local execution and state inspection
//!
//! [`LocalEngine`] composes constructor-injected collaborators: a
//! [`Planner`], an [`ExecutorRegistry`], a table of [`StateInspector`]s
//! keyed by runtime name and an [`ExecutionObserver`].

use crate::context::{ExecutionObserver, ExecutorRegistry, NoObserver};
use crate::dispatch::dispatch;
use crate::error::EngineError;
use crate::executor::HostExecutor;
use crate::plan_id::derive_plan_id;
use crate::report::ExecutionReport;
use crate::slice::slice_plan;
use crate::types::{HostRef, PLAN_SCHEMA_VERSION, Plan, StateSnapshot, TopologySnapshot};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Planning options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlanOptions {
    /// Target environment; part of the derived plan id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub environment: String,
}

/// Execution options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecOptions {
    /// Passed to every step executor
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
    /// Upper bound on concurrently running hosts; 0 means one worker per host
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_parallel: usize,
    /// When non-empty, only these step ids run; the rest are skipped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_filter: Vec<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ExecOptions {
    /// Whether the step filter lets `step_id` through
    pub fn includes(&self, step_id: &str) -> bool {
        self.step_filter.is_empty() || self.step_filter.iter().any(|id| id == step_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ComputePlanRequest {
    pub topology: TopologySnapshot,
    pub state: StateSnapshot,
    #[serde(default)]
    pub options: PlanOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ComputePlanResponse {
    pub plan: Plan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecutePlanRequest {
    pub plan: Plan,
    #[serde(default)]
    pub options: ExecOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecutePlanResponse {
    pub report: ExecutionReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InspectStateRequest {
    pub host: HostRef,
    /// Runtime selector, e.g. "docker-compose"
    pub runtime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InspectStateResponse {
    pub state: StateSnapshot,
}

/// Turns desired and observed state into an ordered plan
///
/// Snapshots arrive canonicalized. Diffing is entirely the planner's business.
pub trait Planner: Send + Sync {
    fn plan(
        &self,
        topology: &TopologySnapshot,
        state: &StateSnapshot,
        options: &PlanOptions,
    ) -> Result<Plan>;
}

/// Reads the current state of one runtime on one host
pub trait StateInspector: Send + Sync {
    fn inspect(&self, host: &HostRef) -> Result<StateSnapshot>;
}

/// The orchestration contract
pub trait Engine {
    /// Generate a plan from topology and current state
    fn compute_plan(&self, req: ComputePlanRequest) -> Result<ComputePlanResponse, EngineError>;

    /// Slice and execute a plan in-process
    fn execute_plan(&self, req: ExecutePlanRequest) -> Result<ExecutePlanResponse, EngineError>;

    /// Read current state from a runtime
    fn inspect_state(&self, req: InspectStateRequest) -> Result<InspectStateResponse, EngineError>;
}

/// In-process [`Engine`]
pub struct LocalEngine {
    planner: Option<Arc<dyn Planner>>,
    registry: ExecutorRegistry,
    inspectors: BTreeMap<String, Arc<dyn StateInspector>>,
    observer: Arc<dyn ExecutionObserver>,
}

impl LocalEngine {
    /// An engine that can execute plans; add a planner to compute them
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self {
            planner: None,
            registry,
            inspectors: BTreeMap::new(),
            observer: Arc::new(NoObserver),
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Register the inspector used for `runtime`
    pub fn with_inspector(mut self, runtime: impl Into<String>, inspector: Arc<dyn StateInspector>) -> Self {
        self.inspectors.insert(runtime.into(), inspector);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }
}

fn check_plan_version(plan: &Plan) -> Result<(), EngineError> {
    if plan.version == PLAN_SCHEMA_VERSION {
        Ok(())
    } else {
        Err(EngineError::PlanVersion {
            plan_id: plan.id.clone(),
            expected: PLAN_SCHEMA_VERSION,
            found: plan.version.clone(),
        })
    }
}

impl Engine for LocalEngine {
    fn compute_plan(&self, req: ComputePlanRequest) -> Result<ComputePlanResponse, EngineError> {
        let planner = self.planner.as_ref().ok_or(EngineError::MissingPlanner)?;

        let ComputePlanRequest {
            mut topology,
            mut state,
            options,
        } = req;
        topology.canonicalize();
        state.canonicalize();

        let mut plan = planner
            .plan(&topology, &state, &options)
            .map_err(|cause| EngineError::Collaborator {
                stage: "compute plan",
                cause,
            })?;
        check_plan_version(&plan)?;

        if plan.id.is_empty() {
            plan.id = derive_plan_id(&plan, &options.environment);
        }

        // Surface validation errors now rather than at execution time
        let slice = slice_plan(&plan)?;
        log::info!(
            "Computed plan {}: {} step(s) across {} host(s)",
            plan.id,
            plan.steps.len(),
            slice.host_plans.len()
        );

        Ok(ComputePlanResponse { plan })
    }

    fn execute_plan(&self, req: ExecutePlanRequest) -> Result<ExecutePlanResponse, EngineError> {
        let ExecutePlanRequest { plan, options } = req;
        check_plan_version(&plan)?;

        let slice = slice_plan(&plan)?;
        let executor = HostExecutor::new(self.registry.clone())
            .with_options(options)
            .with_observer(Arc::clone(&self.observer));

        let mut report = dispatch(&slice, &plan.id, &executor)?;
        if executor.options().dry_run {
            report.meta.insert("dryRun".into(), "true".into());
        }
        log::info!("Plan {} finished: {}", plan.id, report.status);

        Ok(ExecutePlanResponse { report })
    }

    fn inspect_state(&self, req: InspectStateRequest) -> Result<InspectStateResponse, EngineError> {
        let inspector = self
            .inspectors
            .get(&req.runtime)
            .ok_or_else(|| EngineError::UnknownRuntime(req.runtime.clone()))?;

        let mut state = inspector
            .inspect(&req.host)
            .map_err(|cause| EngineError::Collaborator {
                stage: "inspect state",
                cause,
            })?;
        state.canonicalize();

        Ok(InspectStateResponse { state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{StepContext, StepExecutor};
    use crate::error::SliceError;
    use crate::report::{ExecutionStatus, LogLine};
    use crate::types::{HostPlanStep, PlanStep, ResourceRef, ResourceState, StepAction};
    use std::sync::Mutex;

    /// Emits one host step per topology resource, in snapshot order
    struct OneStepPerResource {
        seen: Mutex<Vec<String>>,
    }

    impl Planner for OneStepPerResource {
        fn plan(
            &self,
            topology: &TopologySnapshot,
            _state: &StateSnapshot,
            _options: &PlanOptions,
        ) -> Result<Plan> {
            let mut plan = Plan::new("");
            for (i, spec) in topology.resources.iter().enumerate() {
                self.seen.lock().unwrap().push(spec.resource.name.clone());
                let id = format!("apply-{}", spec.resource.name);
                plan.steps.push(
                    PlanStep::new(id, i as i64, StepAction::Noop, HostRef::new("host-a"))
                        .with_target(spec.resource.clone()),
                );
            }
            Ok(plan)
        }
    }

    struct FixedPlan(Plan);

    impl Planner for FixedPlan {
        fn plan(&self, _: &TopologySnapshot, _: &StateSnapshot, _: &PlanOptions) -> Result<Plan> {
            Ok(self.0.clone())
        }
    }

    struct Succeed;

    impl StepExecutor for Succeed {
        fn execute(&self, _step: &HostPlanStep, _ctx: &StepContext<'_>) -> Result<Vec<LogLine>> {
            Ok(Vec::new())
        }
    }

    struct Inspector;

    impl StateInspector for Inspector {
        fn inspect(&self, _host: &HostRef) -> Result<StateSnapshot> {
            let state = |name: &str| ResourceState {
                resource: ResourceRef::new("service", name, "docker-compose"),
                data: None,
                meta: Default::default(),
            };
            Ok(StateSnapshot {
                version: "v1".into(),
                meta: Default::default(),
                resources: vec![state("web"), state("api")],
            })
        }
    }

    struct Broken;

    impl StateInspector for Broken {
        fn inspect(&self, _host: &HostRef) -> Result<StateSnapshot> {
            anyhow::bail!("daemon unreachable")
        }
    }

    fn topology() -> TopologySnapshot {
        let spec = |name: &str| crate::types::ResourceSpec {
            resource: ResourceRef::new("service", name, "docker-compose"),
            data: None,
            meta: Default::default(),
        };
        TopologySnapshot {
            version: "v1".into(),
            meta: Default::default(),
            resources: vec![spec("web"), spec("api")],
        }
    }

    fn compute_request(environment: &str) -> ComputePlanRequest {
        ComputePlanRequest {
            topology: topology(),
            state: StateSnapshot::default(),
            options: PlanOptions {
                environment: environment.into(),
            },
        }
    }

    #[test]
    fn test_compute_plan_canonicalizes_and_derives_id() {
        let planner = Arc::new(OneStepPerResource {
            seen: Mutex::new(Vec::new()),
        });
        let engine = LocalEngine::new(ExecutorRegistry::new()).with_planner(planner.clone());

        let first = engine.compute_plan(compute_request("staging")).unwrap().plan;
        assert_eq!(*planner.seen.lock().unwrap(), ["api", "web"]);
        assert_eq!(first.id.len(), 24);

        let again = engine.compute_plan(compute_request("staging")).unwrap().plan;
        assert_eq!(first.id, again.id);

        let prod = engine.compute_plan(compute_request("prod")).unwrap().plan;
        assert_ne!(first.id, prod.id);
    }

    #[test]
    fn test_compute_plan_keeps_planner_id_and_validates() {
        let mut plan = Plan::new("given-id");
        plan.steps = vec![
            PlanStep::new("a", 0, StepAction::Noop, HostRef::new("host-a")),
            PlanStep::new("b", 1, StepAction::Noop, HostRef::new("host-b")).depends_on(["a"]),
        ];
        let engine = LocalEngine::new(ExecutorRegistry::new()).with_planner(Arc::new(FixedPlan(plan)));
        let err = engine.compute_plan(compute_request("staging")).unwrap_err();
        assert!(matches!(err, EngineError::Slice(SliceError::CrossHost { .. })));

        let engine = LocalEngine::new(ExecutorRegistry::new())
            .with_planner(Arc::new(FixedPlan(Plan::new("given-id"))));
        assert_eq!(engine.compute_plan(compute_request("staging")).unwrap().plan.id, "given-id");
    }

    #[test]
    fn test_compute_plan_requires_planner_and_version() {
        let engine = LocalEngine::new(ExecutorRegistry::new());
        assert!(matches!(
            engine.compute_plan(compute_request("staging")),
            Err(EngineError::MissingPlanner)
        ));

        let mut plan = Plan::new("p");
        plan.version = "v9".into();
        let engine = LocalEngine::new(ExecutorRegistry::new()).with_planner(Arc::new(FixedPlan(plan)));
        assert!(matches!(
            engine.compute_plan(compute_request("staging")),
            Err(EngineError::PlanVersion { .. })
        ));
    }

    #[test]
    fn test_execute_plan() {
        let mut plan = Plan::new("exec-1");
        plan.steps = vec![
            PlanStep::new("g", 0, StepAction::Noop, HostRef::global()),
            PlanStep::new("a", 1, StepAction::Noop, HostRef::new("host-a")).depends_on(["g"]),
            PlanStep::new("b", 2, StepAction::Build, HostRef::new("host-b")),
        ];
        let engine = LocalEngine::new(ExecutorRegistry::new().with(StepAction::Noop, Arc::new(Succeed)));

        let report = engine
            .execute_plan(ExecutePlanRequest {
                plan,
                options: ExecOptions {
                    dry_run: true,
                    ..Default::default()
                },
            })
            .unwrap()
            .report;

        assert_eq!(report.plan_id, "exec-1");
        assert_eq!(report.status, ExecutionStatus::Partial);
        assert_eq!(report.meta["dryRun"], "true");
        assert_eq!(report.steps.len(), 3);
    }

    #[test]
    fn test_inspect_state() {
        let engine = LocalEngine::new(ExecutorRegistry::new())
            .with_inspector("docker-compose", Arc::new(Inspector))
            .with_inspector("broken", Arc::new(Broken));

        let state = engine
            .inspect_state(InspectStateRequest {
                host: HostRef::new("host-a"),
                runtime: "docker-compose".into(),
            })
            .unwrap()
            .state;
        let names: Vec<_> = state.resources.iter().map(|r| r.resource.name.as_str()).collect();
        assert_eq!(names, ["api", "web"]);

        let err = engine
            .inspect_state(InspectStateRequest {
                host: HostRef::new("host-a"),
                runtime: "kubernetes".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownRuntime(ref r) if r == "kubernetes"));

        let err = engine
            .inspect_state(InspectStateRequest {
                host: HostRef::new("host-a"),
                runtime: "broken".into(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "inspect state failed: daemon unreachable");
    }

    #[test]
    fn test_exec_options_wire_format() {
        assert_eq!(serde_json::to_string(&ExecOptions::default()).unwrap(), "{}");
        let options: ExecOptions =
            serde_json::from_str(r#"{"dryRun":true,"maxParallel":2,"stepFilter":["a"]}"#).unwrap();
        assert!(options.dry_run);
        assert_eq!(options.max_parallel, 2);
        assert!(options.includes("a"));
        assert!(!options.includes("b"));
    }
}
