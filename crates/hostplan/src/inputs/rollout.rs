use super::ActionInputs;
use super::common::{normalize_list, normalize_string, require, require_entries, require_positive};
use crate::error::InputsError;
use crate::types::StepAction;
use serde::{Deserialize, Serialize};

/// Inputs for a `rollout` step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolloutInputs {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

impl ActionInputs for RolloutInputs {
    const ACTION: StepAction = StepAction::Rollout;

    fn normalize(&mut self) -> Result<(), InputsError> {
        normalize_string(&mut self.mode);
        normalize_list(&mut self.targets);
        Ok(())
    }

    fn validate(&self) -> Result<(), InputsError> {
        require("mode", &self.mode)?;
        require_positive("batch_size", self.batch_size)?;
        require_entries("targets", &self.targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::decode_inputs;
    use crate::types::RawPayload;

    fn decode(json: &str) -> Result<RolloutInputs, InputsError> {
        decode_inputs(Some(&RawPayload::from_json(json).unwrap()))
    }

    #[test]
    fn test_rollout_inputs() {
        let inputs = decode(r#"{"mode":"rolling","batch_size":1,"targets":["web-b"," web-a"]}"#).unwrap();
        assert_eq!(inputs.targets, ["web-a", "web-b"]);

        let inputs = decode(r#"{"mode":"rolling","batch_size":0}"#).unwrap();
        assert_eq!(inputs.batch_size, Some(0));

        assert!(decode(r#"{"mode":" "}"#).is_err());
        assert!(decode(r#"{"mode":"rolling","batch_size":-1}"#).is_err());
        assert!(decode(r#"{"mode":"rolling","targets":[""]}"#).is_err());
    }
}
