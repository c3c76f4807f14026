//! # Hostplan
//!
//! Portable deployment plans: a strict wire format, per-host slicing and
//! the execution contracts that run the resulting work.
//!
//! ## Core Concepts
//!
//! - **Plan**: one ordered list of steps produced by a planner
//! - **HostPlan**: the self-contained subset of a plan sent to a single host
//! - **Global steps**: steps with no host affinity, run before any host plan
//! - **ExecutionReport**: the per-step outcome of running a plan
//!
//! ## Example
//!
//! ```ignore
//! use hostplan::{decode_plan, slice_plan, dispatch, ExecutorRegistry, HostExecutor, StepAction};
//! use std::sync::Arc;
//!
//! let plan = decode_plan(&std::fs::read("plan.json")?)?;
//! let slice = slice_plan(&plan)?;
//!
//! for (host, host_plan) in &slice.host_plans {
//!     println!("{host}: {} step(s)", host_plan.steps.len());
//! }
//!
//! let registry = ExecutorRegistry::new().with(StepAction::Build, Arc::new(MyBuilder));
//! let report = dispatch(&slice, &plan.id, &HostExecutor::new(registry))?;
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`Planner`]: turns topology and state snapshots into a plan
//! - [`StepExecutor`]: performs the work of one step action
//! - [`StateInspector`]: reads current state from a runtime
//! - [`ExecutionObserver`]: receives progress updates
//!
//! Registries are plain values built by the caller; nothing is global.

pub mod codec;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod executor;
pub mod inputs;
pub mod plan_id;
pub mod report;
pub mod slice;
pub mod types;

// Re-export main types at crate root
pub use codec::{decode_host_plan, decode_plan, encode_host_plan, encode_plan, peek_plan_id};
pub use context::{ExecutionObserver, ExecutorRegistry, NoObserver, StepContext, StepExecutor};
pub use dispatch::dispatch;
pub use engine::{
    ComputePlanRequest, ComputePlanResponse, Engine, ExecOptions, ExecutePlanRequest,
    ExecutePlanResponse, InspectStateRequest, InspectStateResponse, LocalEngine, PlanOptions,
    Planner, StateInspector,
};
pub use error::{DecodeError, DecodeErrorKind, EngineError, ExecuteError, InputsError, SliceError};
pub use executor::HostExecutor;
pub use plan_id::derive_plan_id;
pub use report::{
    ExecutionError, ExecutionReport, ExecutionStatus, LogLine, LogStream, ReportSummary,
    StepExecution, StepStatus,
};
pub use slice::slice_plan;
pub use types::{
    Annotations, HOST_PLAN_SCHEMA_VERSION, HostPlan, HostPlanStep, HostRef, PLAN_SCHEMA_VERSION,
    Plan, PlanStep, RawPayload, ResourceRef, ResourceSpec, ResourceState, SliceResult,
    StateSnapshot, StepAction, TopologySnapshot,
};
