use super::ActionInputs;
use super::common::{
    KeyValue, normalize_list, normalize_pairs, normalize_path_field, normalize_string, require,
    require_entries, require_keys,
};
use crate::error::InputsError;
use crate::types::StepAction;
use serde::{Deserialize, Serialize};

/// Inputs for a `build` step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildInputs {
    pub provider: String,
    pub workdir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    pub dockerfile: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_args: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<KeyValue>,
}

impl ActionInputs for BuildInputs {
    const ACTION: StepAction = StepAction::Build;

    fn normalize(&mut self) -> Result<(), InputsError> {
        normalize_string(&mut self.provider);
        normalize_string(&mut self.target);
        normalize_list(&mut self.tags);
        normalize_pairs(&mut self.build_args);
        normalize_pairs(&mut self.labels);

        for (field, value) in [
            ("workdir", &mut self.workdir),
            ("dockerfile", &mut self.dockerfile),
            ("context", &mut self.context),
        ] {
            normalize_string(value);
            // Emptiness is reported by validate
            if !value.is_empty() {
                normalize_path_field(field, value)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), InputsError> {
        require("provider", &self.provider)?;
        require("workdir", &self.workdir)?;
        require("dockerfile", &self.dockerfile)?;
        require("context", &self.context)?;
        require_entries("tags", &self.tags)?;
        require_keys("build_args", &self.build_args)?;
        require_keys("labels", &self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::decode_inputs;
    use crate::types::RawPayload;

    fn decode(json: &str) -> Result<BuildInputs, InputsError> {
        decode_inputs(Some(&RawPayload::from_json(json).unwrap()))
    }

    #[test]
    fn test_build_inputs_normalized() {
        let inputs = decode(
            r#"{
                "provider": " docker ",
                "workdir": "apps//backend",
                "dockerfile": "Dockerfile",
                "context": ".",
                "tags": ["app:v2", "app:latest"],
                "build_args": [{"key": "B", "value": "2"}, {"key": "A", "value": " 1 "}]
            }"#,
        )
        .unwrap();

        assert_eq!(inputs.provider, "docker");
        assert_eq!(inputs.workdir, "apps/backend");
        assert_eq!(inputs.context, ".");
        assert_eq!(inputs.tags, ["app:latest", "app:v2"]);
        assert_eq!(inputs.build_args[0], KeyValue::new("A", "1"));
        assert!(inputs.labels.is_empty());
    }

    #[test]
    fn test_build_inputs_required_fields() {
        let err = decode(r#"{"provider":"docker","workdir":".","dockerfile":"","context":"."}"#).unwrap_err();
        assert_eq!(err.to_string(), "dockerfile: is required");

        let err = decode(r#"{"provider":"docker","workdir":"."}"#).unwrap_err();
        assert!(matches!(err, InputsError::Decode(_)), "got {err}");
    }

    #[test]
    fn test_build_inputs_reject_bad_path() {
        let err = decode(r#"{"provider":"docker","workdir":"../up","dockerfile":"Dockerfile","context":"."}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("workdir: "), "got {err}");
    }

    #[test]
    fn test_build_inputs_reject_empty_keys() {
        let err = decode(
            r#"{"provider":"docker","workdir":".","dockerfile":"Dockerfile","context":".",
                "labels":[{"key":" ","value":"x"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "labels.key: is required");
    }
}
