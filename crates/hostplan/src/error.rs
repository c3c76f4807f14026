//! Error types for plan decoding, slicing and execution.
//!
//! Every message embeds the offending step and host ids verbatim so a
//! failure in a multi-host run can be traced from production logs alone.

use crate::types::StepAction;
use thiserror::Error;

/// Validation failures raised by [`crate::slice_plan`].
///
/// Any of these aborts the whole slice; no partial result is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    /// Two steps share the same id
    #[error("plan {plan_id:?} contains step {step:?} more than once")]
    DuplicateStep {
        /// Id of the plan being sliced
        plan_id: String,
        /// The repeated step id
        step: String,
    },

    /// A dependency names a step that does not exist in the plan
    #[error("step {step:?} depends on unknown step {dependency:?}")]
    UnknownStep {
        /// The dependent step
        step: String,
        /// The id that did not resolve
        dependency: String,
    },

    /// A host step depends on a step assigned to another host
    #[error(
        "step {step:?} on host {host:?} depends on step {dependency:?} on host {dependency_host:?} (cross-host dependencies are not allowed)"
    )]
    CrossHost {
        step: String,
        host: String,
        dependency: String,
        dependency_host: String,
    },

    /// A global step depends on a host-scoped step
    #[error(
        "global step {step:?} depends on step {dependency:?} on host {dependency_host:?} (global steps cannot wait on host steps)"
    )]
    GlobalDependsOnHost {
        step: String,
        dependency: String,
        dependency_host: String,
    },
}

/// What went wrong while strictly decoding a payload
#[derive(Debug, Error)]
pub enum DecodeErrorKind {
    /// A field name that is not part of the schema
    #[error("{0}")]
    UnknownField(serde_json::Error),

    /// Syntax error, wrong type, missing field or truncated input
    #[error("{0}")]
    Malformed(serde_json::Error),

    /// Non-whitespace content after the value
    #[error("trailing content after JSON value")]
    TrailingContent,

    /// The `version` field did not match
    #[error("schema version mismatch: expected {expected:?}, found {found:?}")]
    VersionMismatch {
        expected: &'static str,
        found: String,
    },
}

/// A strict decode failure, with optional plan context
#[derive(Debug, Error)]
#[error("strict decode {target}{}: {kind}", plan_context(.plan_id.as_deref()))]
pub struct DecodeError {
    /// What was being decoded ("plan", "host plan", "step inputs")
    pub target: &'static str,
    /// Plan id supplied by the caller for context only
    pub plan_id: Option<String>,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(target: &'static str, plan_id: Option<&str>, kind: DecodeErrorKind) -> Self {
        Self {
            target,
            plan_id: plan_id.filter(|id| !id.is_empty()).map(str::to_string),
            kind,
        }
    }

    pub fn is_unknown_field(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::UnknownField(_))
    }

    pub fn is_trailing_content(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::TrailingContent)
    }

    pub fn is_version_mismatch(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::VersionMismatch { .. })
    }
}

fn plan_context(plan_id: Option<&str>) -> String {
    plan_id
        .map(|id| format!(" (planId: {id:?})"))
        .unwrap_or_default()
}

/// Step input decoding and validation failures
#[derive(Debug, Error)]
pub enum InputsError {
    /// The step carries no inputs but its action requires them
    #[error("{action} inputs are missing")]
    Missing { action: StepAction },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A field failed normalization or validation
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl InputsError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Structural problems that prevent a step list from being executed at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteError {
    /// Host plans must name their host
    #[error("host plan for plan {plan_id:?} has an empty host.logicalId")]
    MissingHost { plan_id: String },

    /// A dependency is not part of the step list being executed
    #[error("step {step:?} on host {host:?} depends on {dependency:?}, which is not in the same step list")]
    UnresolvedDependency {
        step: String,
        host: String,
        dependency: String,
    },

    /// A dependency is ordered at or after the step that needs it
    #[error("step {step:?} on host {host:?} depends on {dependency:?}, which is not ordered before it")]
    DependencyOrder {
        step: String,
        host: String,
        dependency: String,
    },

    /// The worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    WorkerPool(String),
}

/// Failures surfaced by [`crate::Engine`] implementations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("plan {plan_id:?} has schema version {found:?}, expected {expected:?}")]
    PlanVersion {
        plan_id: String,
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Slice(#[from] SliceError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    /// `compute_plan` was called on an engine built without a planner
    #[error("no planner configured")]
    MissingPlanner,

    /// No state inspector registered for the requested runtime
    #[error("no state inspector registered for runtime {0:?}")]
    UnknownRuntime(String),

    /// A planner or inspector returned an error
    #[error("{stage} failed: {cause:#}")]
    Collaborator {
        stage: &'static str,
        cause: anyhow::Error,
    },
}
