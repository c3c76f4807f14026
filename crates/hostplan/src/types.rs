//! Wire types for plans, host plans and the resources they act on
//!
//! Field names are part of the wire contract: a plan written by one
//! producer must decode byte-for-byte the same way everywhere else.
//! Maps are `BTreeMap` so serialization order never depends on hashing.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Schema version carried by every [`Plan`]
pub const PLAN_SCHEMA_VERSION: &str = "v1";

/// Schema version carried by every [`HostPlan`]
pub const HOST_PLAN_SCHEMA_VERSION: &str = "v1";

/// Small, stable string annotations
pub type Annotations = BTreeMap<String, String>;

// ============================================================================
// Opaque payloads
// ============================================================================

/// Provider-owned JSON payload kept as raw text
///
/// The core never interprets it; equality is textual so a decoded payload
/// compares equal to the one that was encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Box<RawValue>);

impl RawPayload {
    /// Serialize any value into a raw payload
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::value::to_raw_value(value).map(Self)
    }

    /// Wrap an already-encoded JSON document
    pub fn from_json(json: impl Into<String>) -> serde_json::Result<Self> {
        RawValue::from_string(json.into()).map(Self)
    }

    /// The raw JSON text
    pub fn get(&self) -> &str {
        self.0.get()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }
}

impl PartialEq for RawPayload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for RawPayload {}

// ============================================================================
// Resource model
// ============================================================================

/// Identity of a managed resource
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRef {
    /// e.g. "service", "network", "volume", "droplet"
    pub kind: String,
    /// Logical name
    pub name: String,
    /// e.g. "docker-compose", "kubernetes", "digitalocean"
    pub provider: String,
    /// Optional grouping
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            provider: provider.into(),
            namespace: String::new(),
        }
    }

    /// Canonical ordering key: kind, then name, then provider and namespace
    fn sort_key(&self) -> (&str, &str, &str, &str) {
        (&self.kind, &self.name, &self.provider, &self.namespace)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}.{}", self.provider, self.kind, self.name)
        } else {
            write!(
                f,
                "{}/{}.{}.{}",
                self.provider, self.namespace, self.kind, self.name
            )
        }
    }
}

/// A desired resource in the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    #[serde(rename = "ref")]
    pub resource: ResourceRef,
    pub data: Option<RawPayload>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

/// An observed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceState {
    #[serde(rename = "ref")]
    pub resource: ResourceRef,
    pub data: Option<RawPayload>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

/// Desired state handed to the planner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologySnapshot {
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
    pub resources: Vec<ResourceSpec>,
}

impl TopologySnapshot {
    /// Sort resources by kind, then name, so identical topologies hash identically
    pub fn canonicalize(&mut self) {
        self.resources
            .sort_by(|a, b| a.resource.sort_key().cmp(&b.resource.sort_key()));
    }
}

/// Observed runtime state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSnapshot {
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
    pub resources: Vec<ResourceState>,
}

impl StateSnapshot {
    /// Sort resources by kind, then name
    pub fn canonicalize(&mut self) {
        self.resources
            .sort_by(|a, b| a.resource.sort_key().cmp(&b.resource.sort_key()));
    }
}

// ============================================================================
// Plan model
// ============================================================================

/// The operation a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Create,
    Update,
    Delete,
    Noop,
    RenderCompose,
    ApplyCompose,
    Rollout,
    Build,
    Migrate,
    HealthCheck,
}

impl StepAction {
    pub const ALL: [StepAction; 10] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Noop,
        Self::RenderCompose,
        Self::ApplyCompose,
        Self::Rollout,
        Self::Build,
        Self::Migrate,
        Self::HealthCheck,
    ];

    /// Wire name of the action
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Noop => "noop",
            Self::RenderCompose => "render_compose",
            Self::ApplyCompose => "apply_compose",
            Self::Rollout => "rollout",
            Self::Build => "build",
            Self::Migrate => "migrate",
            Self::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown step action: {s:?}"))
    }
}

/// Where a step executes
///
/// An empty `logical_id` marks a global step with no host affinity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostRef {
    pub logical_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Annotations,
}

impl HostRef {
    pub fn new(logical_id: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            labels: Annotations::new(),
        }
    }

    /// The "no host" target used for global steps
    pub fn global() -> Self {
        Self::default()
    }

    pub fn is_global(&self) -> bool {
        self.logical_id.is_empty()
    }
}

/// The full, ordered plan produced by a planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Must equal [`PLAN_SCHEMA_VERSION`]
    pub version: String,
    /// Content-derived, stable for identical inputs (see [`crate::derive_plan_id`])
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    pub steps: Vec<PlanStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

impl Plan {
    /// An empty v1 plan
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            version: PLAN_SCHEMA_VERSION.to_string(),
            id: id.into(),
            summary: String::new(),
            steps: Vec::new(),
            meta: Annotations::new(),
        }
    }
}

/// One operation in a [`Plan`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlanStep {
    /// Unique within the plan
    pub id: String,
    /// Total order across the full plan
    pub index: i64,
    pub action: StepAction,
    pub target: ResourceRef,
    pub host: HostRef,
    pub inputs: Option<RawPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

impl PlanStep {
    pub fn new(id: impl Into<String>, index: i64, action: StepAction, host: HostRef) -> Self {
        Self {
            id: id.into(),
            index,
            action,
            target: ResourceRef::default(),
            host,
            inputs: None,
            depends_on: Vec::new(),
            meta: Annotations::new(),
        }
    }

    pub fn with_target(mut self, target: ResourceRef) -> Self {
        self.target = target;
        self
    }

    pub fn with_inputs(mut self, inputs: RawPayload) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_global(&self) -> bool {
        self.host.is_global()
    }
}

/// The self-contained sub-plan sent to a single host
///
/// An agent receiving it needs no knowledge of other hosts or global sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostPlan {
    /// Must equal [`HOST_PLAN_SCHEMA_VERSION`]
    pub version: String,
    pub plan_id: String,
    pub host: HostRef,
    pub steps: Vec<HostPlanStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

/// A step inside a [`HostPlan`]; `depends_on` only names steps of the same host plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostPlanStep {
    pub id: String,
    pub index: i64,
    pub action: StepAction,
    pub target: ResourceRef,
    pub inputs: Option<RawPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

impl From<&PlanStep> for HostPlanStep {
    /// Drops the host; dependencies are copied as-is
    fn from(step: &PlanStep) -> Self {
        Self {
            id: step.id.clone(),
            index: step.index,
            action: step.action,
            target: step.target.clone(),
            inputs: step.inputs.clone(),
            depends_on: step.depends_on.clone(),
            meta: step.meta.clone(),
        }
    }
}

/// Output of [`crate::slice_plan`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceResult {
    /// Host logical id to that host's plan
    pub host_plans: BTreeMap<String, HostPlan>,

    /// Steps without a host, ordered by index then id
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_steps: Vec<PlanStep>,

    /// Ids of `global_steps`, same order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_step_ids: Vec<String>,

    /// Host step id to the global step ids it waits on (sorted, deduplicated)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub global_dependency_refs: BTreeMap<String, Vec<String>>,
}

impl SliceResult {
    /// Total number of steps across host plans and global steps
    pub fn total_steps(&self) -> usize {
        self.global_steps.len()
            + self
                .host_plans
                .values()
                .map(|hp| hp.steps.len())
                .sum::<usize>()
    }

    /// Global step ids a host plan must wait for before it can be dispatched
    pub fn required_globals(&self, host_plan: &HostPlan) -> Vec<String> {
        let mut required: Vec<String> = host_plan
            .steps
            .iter()
            .filter_map(|step| self.global_dependency_refs.get(&step.id))
            .flatten()
            .cloned()
            .collect();
        required.sort();
        required.dedup();
        required
    }
}
