//! Typed step inputs
//!
//! `PlanStep.inputs` is opaque to the slicer. Executors that care about it
//! decode it into one of these schemas with [`decode_inputs`], which uses the
//! same strict rules as the plan codec, then normalizes and validates.
//!
//! | Action | Schema |
//! |---|---|
//! | `build` | [`BuildInputs`] |
//! | `migrate` | [`MigrateInputs`] |
//! | `apply_compose` | [`ApplyComposeInputs`] |
//! | `render_compose` | [`RenderComposeInputs`] |
//! | `rollout` | [`RolloutInputs`] |
//! | `health_check` | [`HealthCheckInputs`] |

mod apply_compose;
mod build;
mod common;
mod health_check;
mod migrate;
mod render_compose;
mod rollout;
mod validator;

pub use apply_compose::ApplyComposeInputs;
pub use build::BuildInputs;
pub use common::{
    HASH_ALG_SHA256, KeyValue, normalize_list, normalize_pairs, normalize_path, normalize_string,
    validate_sha256_hex,
};
pub use health_check::{HealthCheckInputs, HealthEndpoint};
pub use migrate::MigrateInputs;
pub use render_compose::{ComposeOverlay, RenderComposeInputs};
pub use rollout::RolloutInputs;
pub use validator::ValidatingExecutor;

use crate::codec::from_slice_strict;
use crate::error::{DecodeError, InputsError};
use crate::types::{RawPayload, StepAction};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed inputs schema for one [`StepAction`]
pub trait ActionInputs: DeserializeOwned + Serialize {
    /// The action whose steps carry this schema
    const ACTION: StepAction;

    /// Canonicalize in place: trim strings, sort lists, normalize paths
    fn normalize(&mut self) -> Result<(), InputsError>;

    /// Check required fields and cross-field rules on normalized inputs
    fn validate(&self) -> Result<(), InputsError>;
}

/// Strictly decode, normalize and validate a step's inputs
pub fn decode_inputs<T: ActionInputs>(raw: Option<&RawPayload>) -> Result<T, InputsError> {
    let raw = raw.ok_or(InputsError::Missing { action: T::ACTION })?;
    let mut inputs: T = from_slice_strict(raw.as_bytes())
        .map_err(|kind| DecodeError::new("step inputs", None, kind))?;
    inputs.normalize()?;
    inputs.validate()?;
    Ok(inputs)
}

/// Normalize, validate and encode inputs for embedding in a plan step
pub fn encode_inputs<T: ActionInputs>(mut inputs: T) -> Result<RawPayload, InputsError> {
    inputs.normalize()?;
    inputs.validate()?;
    RawPayload::from_value(&inputs)
        .map_err(|e| InputsError::invalid(T::ACTION.as_str(), format!("failed to encode: {e}")))
}

/// Validate inputs for actions that have a typed schema
///
/// Returns `Ok(false)` for actions without one; their inputs are opaque.
pub fn validate_action_inputs(
    action: StepAction,
    raw: Option<&RawPayload>,
) -> Result<bool, InputsError> {
    match action {
        StepAction::Build => decode_inputs::<BuildInputs>(raw).map(|_| true),
        StepAction::Migrate => decode_inputs::<MigrateInputs>(raw).map(|_| true),
        StepAction::ApplyCompose => decode_inputs::<ApplyComposeInputs>(raw).map(|_| true),
        StepAction::RenderCompose => decode_inputs::<RenderComposeInputs>(raw).map(|_| true),
        StepAction::Rollout => decode_inputs::<RolloutInputs>(raw).map(|_| true),
        StepAction::HealthCheck => decode_inputs::<HealthCheckInputs>(raw).map(|_| true),
        StepAction::Create | StepAction::Update | StepAction::Delete | StepAction::Noop => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs() {
        let err = decode_inputs::<RolloutInputs>(None).unwrap_err();
        assert_eq!(err.to_string(), "rollout inputs are missing");
    }

    #[test]
    fn test_strict_decode_applies_to_inputs() {
        let raw = RawPayload::from_json(r#"{"mode":"all","surprise":1}"#).unwrap();
        let err = decode_inputs::<RolloutInputs>(Some(&raw)).unwrap_err();
        assert!(matches!(err, InputsError::Decode(ref e) if e.is_unknown_field()), "got {err}");
        assert!(err.to_string().starts_with("strict decode step inputs"));
    }

    #[test]
    fn test_encode_inputs_normalizes() {
        let raw = encode_inputs(RolloutInputs {
            mode: " rolling ".into(),
            batch_size: Some(2),
            targets: vec!["web-2".into(), "web-1".into()],
        })
        .unwrap();
        assert_eq!(
            raw.get(),
            r#"{"mode":"rolling","batch_size":2,"targets":["web-1","web-2"]}"#
        );
    }

    #[test]
    fn test_validate_action_inputs_dispatch() {
        assert!(!validate_action_inputs(StepAction::Noop, None).unwrap());
        assert!(validate_action_inputs(StepAction::Build, None).is_err());

        let raw = RawPayload::from_json(r#"{"mode":"all"}"#).unwrap();
        assert!(validate_action_inputs(StepAction::Rollout, Some(&raw)).unwrap());
    }
}
