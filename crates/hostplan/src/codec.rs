//! Strict wire codec for plans and host plans
//!
//! Plans cross process and machine boundaries, so decoding is paranoid:
//! unknown fields are rejected at every nesting level, nothing but
//! whitespace may follow the value, and the schema version must match.

use crate::error::{DecodeError, DecodeErrorKind};
use crate::types::{HOST_PLAN_SCHEMA_VERSION, HostPlan, PLAN_SCHEMA_VERSION, Plan};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Decode a [`Plan`], rejecting unknown fields, trailing content and foreign versions
pub fn decode_plan(data: &[u8]) -> Result<Plan, DecodeError> {
    let plan: Plan = from_slice_strict(data).map_err(|kind| DecodeError::new("plan", None, kind))?;
    check_version(&plan.version, PLAN_SCHEMA_VERSION)
        .map_err(|kind| DecodeError::new("plan", Some(plan.id.as_str()), kind))?;
    Ok(plan)
}

/// Decode a [`HostPlan`] with the same rules as [`decode_plan`]
///
/// `plan_id` only enriches error messages; it never affects whether
/// decoding succeeds.
pub fn decode_host_plan(data: &[u8], plan_id: Option<&str>) -> Result<HostPlan, DecodeError> {
    let host_plan: HostPlan =
        from_slice_strict(data).map_err(|kind| DecodeError::new("host plan", plan_id, kind))?;
    check_version(&host_plan.version, HOST_PLAN_SCHEMA_VERSION)
        .map_err(|kind| DecodeError::new("host plan", plan_id, kind))?;
    Ok(host_plan)
}

/// Encode a plan as pretty, deterministic JSON
pub fn encode_plan(plan: &Plan) -> serde_json::Result<Vec<u8>> {
    encode_pretty(plan)
}

/// Encode a host plan as pretty, deterministic JSON
pub fn encode_host_plan(host_plan: &HostPlan) -> serde_json::Result<Vec<u8>> {
    encode_pretty(host_plan)
}

pub(crate) fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(value)?;
    out.push(b'\n');
    Ok(out)
}

/// Best-effort lookup of `planId` for error context
///
/// Lenient on purpose: unknown fields are ignored and any failure
/// yields `None`. Never use the result for anything but messages.
pub fn peek_plan_id(data: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct PlanIdOnly {
        #[serde(rename = "planId", default)]
        plan_id: String,
    }

    serde_json::from_slice::<PlanIdOnly>(data)
        .ok()
        .map(|doc| doc.plan_id)
        .filter(|id| !id.is_empty())
}

/// Deserialize exactly one JSON value and require nothing but whitespace after it
///
/// Unknown-field rejection comes from `deny_unknown_fields` on the target types.
pub(crate) fn from_slice_strict<T: DeserializeOwned>(data: &[u8]) -> Result<T, DecodeErrorKind> {
    let mut de = serde_json::Deserializer::from_slice(data);
    let value = T::deserialize(&mut de).map_err(classify)?;
    de.end().map_err(|_| DecodeErrorKind::TrailingContent)?;
    Ok(value)
}

fn classify(err: serde_json::Error) -> DecodeErrorKind {
    if err.is_data() && err.to_string().starts_with("unknown field") {
        DecodeErrorKind::UnknownField(err)
    } else {
        DecodeErrorKind::Malformed(err)
    }
}

fn check_version(found: &str, expected: &'static str) -> Result<(), DecodeErrorKind> {
    if found == expected {
        Ok(())
    } else {
        Err(DecodeErrorKind::VersionMismatch {
            expected,
            found: found.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostRef, PlanStep, RawPayload, ResourceRef, StepAction};

    const HOST_PLAN_JSON: &str = r#"{
        "version": "v1",
        "planId": "test-plan",
        "host": {"logicalId": "host-a"},
        "steps": []
    }"#;

    fn sample_plan() -> Plan {
        let mut plan = Plan::new("plan-123");
        plan.summary = "Deploy to staging".into();
        plan.meta.insert("environment".into(), "staging".into());
        plan.steps = vec![
            PlanStep::new("build-api", 0, StepAction::Build, HostRef::new("host-a"))
                .with_target(ResourceRef::new("image", "api", "docker"))
                .with_inputs(RawPayload::from_json(r#"{"provider":"docker"}"#).unwrap()),
            PlanStep::new("deploy-api", 1, StepAction::ApplyCompose, HostRef::new("host-a"))
                .with_target(ResourceRef::new("service", "api", "docker-compose"))
                .depends_on(["build-api"]),
        ];
        plan
    }

    #[test]
    fn test_plan_round_trip() {
        let plan = sample_plan();
        let bytes = encode_plan(&plan).unwrap();
        let decoded = decode_plan(&bytes).unwrap();
        assert_eq!(decoded, plan);
    }

    #[test]
    fn test_host_plan_accepts_valid() {
        let host_plan = decode_host_plan(HOST_PLAN_JSON.as_bytes(), Some("test-plan")).unwrap();
        assert_eq!(host_plan.plan_id, "test-plan");
        assert_eq!(host_plan.host.logical_id, "host-a");
        assert!(host_plan.steps.is_empty());
    }

    #[test]
    fn test_host_plan_rejects_unknown_top_level_field() {
        let json = r#"{
            "version": "v1",
            "planId": "test-plan",
            "host": {"logicalId": "host-a"},
            "steps": [],
            "unknown_field": "should be rejected"
        }"#;
        let err = decode_host_plan(json.as_bytes(), Some("test-plan")).unwrap_err();
        assert!(err.is_unknown_field(), "got {err}");
    }

    #[test]
    fn test_plan_rejects_unknown_nested_field() {
        let json = r#"{
            "version": "v1",
            "id": "p",
            "steps": [{
                "id": "s1", "index": 0, "action": "noop",
                "target": {"kind": "k", "name": "n", "provider": "p", "region": "x"},
                "host": {"logicalId": ""},
                "inputs": null
            }]
        }"#;
        let err = decode_plan(json.as_bytes()).unwrap_err();
        assert!(err.is_unknown_field(), "got {err}");
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_host_plan_rejects_trailing_tokens() {
        let json = format!("{HOST_PLAN_JSON} extra tokens");
        let err = decode_host_plan(json.as_bytes(), Some("test-plan")).unwrap_err();
        assert!(err.is_trailing_content(), "got {err}");
    }

    #[test]
    fn test_plan_rejects_second_value() {
        let mut bytes = encode_plan(&sample_plan()).unwrap();
        bytes.extend_from_slice(b"{}");
        let err = decode_plan(&bytes).unwrap_err();
        assert!(err.is_trailing_content(), "got {err}");
    }

    #[test]
    fn test_trailing_whitespace_is_allowed() {
        let json = format!("{HOST_PLAN_JSON}\n\n  \t");
        assert!(decode_host_plan(json.as_bytes(), None).is_ok());
    }

    #[test]
    fn test_version_mismatch() {
        let mut plan = sample_plan();
        plan.version = "v2".into();
        let bytes = serde_json::to_vec(&plan).unwrap();
        let err = decode_plan(&bytes).unwrap_err();
        assert!(err.is_version_mismatch(), "got {err}");
        assert!(err.to_string().contains(r#"found "v2""#));

        let json = HOST_PLAN_JSON.replace("\"v1\"", "\"v0\"");
        let err = decode_host_plan(json.as_bytes(), None).unwrap_err();
        assert!(err.is_version_mismatch(), "got {err}");
    }

    #[test]
    fn test_structural_mismatch_is_malformed() {
        let json = HOST_PLAN_JSON.replace("\"steps\": []", "\"steps\": {}");
        let err = decode_host_plan(json.as_bytes(), None).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::Malformed(_)), "got {err}");

        let err = decode_host_plan(b"{\"version\": \"v1\"", None).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::Malformed(_)), "got {err}");
    }

    #[test]
    fn test_error_context_includes_plan_id() {
        let json = HOST_PLAN_JSON.replace("\"steps\": []", "\"steps\": [], \"bad_field\": true");
        let err = decode_host_plan(json.as_bytes(), Some("my-plan-123")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("planId"), "got {message}");
        assert!(message.contains("my-plan-123"), "got {message}");
    }

    #[test]
    fn test_peek_plan_id_is_lenient() {
        let json = HOST_PLAN_JSON.replace("\"steps\": []", "\"steps\": [], \"extra\": 1");
        assert_eq!(peek_plan_id(json.as_bytes()).as_deref(), Some("test-plan"));
        assert_eq!(peek_plan_id(b"not json"), None);
        assert_eq!(peek_plan_id(br#"{"planId": ""}"#), None);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let plan = sample_plan();
        assert_eq!(encode_plan(&plan).unwrap(), encode_plan(&plan.clone()).unwrap());
    }
}
