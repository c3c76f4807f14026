//! Content-derived plan identifiers

use crate::slice::step_order;
use crate::types::{Plan, RawPayload};
use serde::Serialize;
use serde_json::Value;

/// Hex characters kept from the digest
const PLAN_ID_LEN: usize = 24;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdDocument<'a> {
    environment: &'a str,
    steps: Vec<IdStep<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdStep<'a> {
    id: &'a str,
    index: i64,
    action: &'static str,
    target: IdTarget<'a>,
    host: &'a str,
    inputs: Value,
    depends_on: Vec<&'a str>,
}

#[derive(Serialize)]
struct IdTarget<'a> {
    kind: &'a str,
    name: &'a str,
    provider: &'a str,
}

/// Derive a stable identifier from a plan's steps and target environment
///
/// The digest covers step ids, order, actions, targets, hosts, inputs and
/// dependencies. Step order, dependency order, input key order and input
/// whitespace do not affect the result; `plan.id`, `summary` and `meta`
/// are ignored.
pub fn derive_plan_id(plan: &Plan, environment: &str) -> String {
    let mut steps: Vec<IdStep<'_>> = plan
        .steps
        .iter()
        .map(|step| {
            let mut depends_on: Vec<&str> = step.depends_on.iter().map(String::as_str).collect();
            depends_on.sort_unstable();
            IdStep {
                id: &step.id,
                index: step.index,
                action: step.action.as_str(),
                target: IdTarget {
                    kind: &step.target.kind,
                    name: &step.target.name,
                    provider: &step.target.provider,
                },
                host: &step.host.logical_id,
                inputs: canonical_inputs(step.inputs.as_ref()),
                depends_on,
            }
        })
        .collect();
    steps.sort_by(|a, b| step_order(a.index, a.id, b.index, b.id));

    let document = IdDocument { environment, steps };
    // Serializing borrowed strings and `Value`s into a Vec cannot fail
    let bytes = serde_json::to_vec(&document).unwrap_or_default();

    let mut hex = blake3::hash(&bytes).to_hex().to_string();
    hex.truncate(PLAN_ID_LEN);
    hex
}

/// Re-encode inputs through `Value` so key order and whitespace are normalized
fn canonical_inputs(inputs: Option<&RawPayload>) -> Value {
    inputs
        .map(|raw| serde_json::from_str(raw.get()).unwrap_or_else(|_| Value::String(raw.get().to_string())))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostRef, PlanStep, ResourceRef, StepAction};

    fn sample_plan() -> Plan {
        let mut plan = Plan::new("");
        plan.steps = vec![
            PlanStep::new("build-api", 0, StepAction::Build, HostRef::new("host-a"))
                .with_target(ResourceRef::new("image", "api", "docker"))
                .with_inputs(RawPayload::from_json(r#"{"provider":"docker","workdir":"."}"#).unwrap()),
            PlanStep::new("migrate-db", 1, StepAction::Migrate, HostRef::global())
                .with_target(ResourceRef::new("database", "main", "postgres")),
            PlanStep::new("deploy-api", 2, StepAction::ApplyCompose, HostRef::new("host-a"))
                .with_target(ResourceRef::new("service", "api", "docker-compose"))
                .depends_on(["migrate-db", "build-api"]),
        ];
        plan
    }

    #[test]
    fn test_plan_id_is_stable() {
        let plan = sample_plan();
        let id = derive_plan_id(&plan, "staging");
        assert_eq!(id.len(), PLAN_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(id, derive_plan_id(&plan.clone(), "staging"));
    }

    #[test]
    fn test_plan_id_depends_on_environment() {
        let plan = sample_plan();
        assert_ne!(derive_plan_id(&plan, "staging"), derive_plan_id(&plan, "prod"));
    }

    #[test]
    fn test_plan_id_ignores_ordering_noise() {
        let plan = sample_plan();
        let mut shuffled = plan.clone();
        shuffled.steps.reverse();
        shuffled.steps[0].depends_on.reverse();
        shuffled.steps[2].inputs =
            Some(RawPayload::from_json(r#"{ "workdir": ".", "provider": "docker" }"#).unwrap());
        shuffled.summary = "Deploy to staging".into();
        shuffled.meta.insert("source".into(), "test".into());

        assert_eq!(derive_plan_id(&plan, "staging"), derive_plan_id(&shuffled, "staging"));
    }

    #[test]
    fn test_plan_id_tracks_content() {
        let plan = sample_plan();
        let mut changed = plan.clone();
        changed.steps[1].host = HostRef::new("host-b");
        assert_ne!(derive_plan_id(&plan, "staging"), derive_plan_id(&changed, "staging"));

        let mut changed = plan.clone();
        changed.steps[0].inputs = None;
        assert_ne!(derive_plan_id(&plan, "staging"), derive_plan_id(&changed, "staging"));
    }
}
