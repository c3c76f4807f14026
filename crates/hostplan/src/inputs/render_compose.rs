use super::ActionInputs;
use super::common::{
    KeyValue, normalize_pairs, normalize_path_field, normalize_string, require, require_keys,
    validate_expected_hash,
};
use crate::error::InputsError;
use crate::types::StepAction;
use serde::{Deserialize, Serialize};

/// A compose overlay file applied on top of the base
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeOverlay {
    pub name: String,
    pub path: String,
}

/// Inputs for a `render_compose` step
///
/// Exactly one of `base_compose_path` and `base_compose_inline` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderComposeInputs {
    pub environment: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_compose_path: String,
    /// Multi-line compose document; only outer whitespace is trimmed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_compose_inline: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<ComposeOverlay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<KeyValue>,
    pub output_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_compose_hash_alg: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_compose_hash: String,
}

impl ActionInputs for RenderComposeInputs {
    const ACTION: StepAction = StepAction::RenderCompose;

    fn normalize(&mut self) -> Result<(), InputsError> {
        normalize_string(&mut self.environment);
        normalize_string(&mut self.base_compose_path);
        normalize_string(&mut self.base_compose_inline);
        normalize_string(&mut self.expected_compose_hash_alg);
        normalize_string(&mut self.expected_compose_hash);
        normalize_pairs(&mut self.variables);

        for overlay in &mut self.overlays {
            normalize_string(&mut overlay.name);
        }
        self.overlays.sort_by(|a, b| a.name.cmp(&b.name));
        for (i, overlay) in self.overlays.iter_mut().enumerate() {
            normalize_path_field(&format!("overlays[{i}].path"), &mut overlay.path)?;
        }

        if !self.base_compose_path.is_empty() {
            normalize_path_field("base_compose_path", &mut self.base_compose_path)?;
        }
        normalize_path_field("output_path", &mut self.output_path)
    }

    fn validate(&self) -> Result<(), InputsError> {
        require("environment", &self.environment)?;
        require("output_path", &self.output_path)?;
        if self.base_compose_path.is_empty() == self.base_compose_inline.is_empty() {
            return Err(InputsError::invalid(
                "base_compose_path",
                "exactly one of base_compose_path or base_compose_inline must be provided",
            ));
        }
        validate_expected_hash(&self.expected_compose_hash_alg, &self.expected_compose_hash)?;
        if self.overlays.iter().any(|o| o.name.is_empty()) {
            return Err(InputsError::invalid("overlays.name", "is required"));
        }
        require_keys("variables", &self.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::decode_inputs;
    use crate::types::RawPayload;

    fn decode(json: &str) -> Result<RenderComposeInputs, InputsError> {
        decode_inputs(Some(&RawPayload::from_json(json).unwrap()))
    }

    #[test]
    fn test_render_compose_normalizes() {
        let inputs = decode(
            r#"{"environment":"prod","base_compose_path":"docker-compose.yml",
                "overlays":[{"name":"z-prod","path":"overlays\\prod.yml"},{"name":" a-common","path":"overlays/common.yml"}],
                "variables":[{"key":"TAG","value":"v2"},{"key":"HOST","value":"example.com"}],
                "output_path":".deckhand/compose.yml"}"#,
        )
        .unwrap();

        let overlay_names: Vec<_> = inputs.overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(overlay_names, ["a-common", "z-prod"]);
        assert_eq!(inputs.overlays[1].path, "overlays/prod.yml");
        assert_eq!(inputs.variables[0].key, "HOST");
        assert_eq!(inputs.output_path, ".deckhand/compose.yml");
    }

    #[test]
    fn test_render_compose_inline_keeps_inner_whitespace() {
        let inputs = decode(
            r#"{"environment":"dev","base_compose_inline":"\nservices:\n  web:\n    image: nginx\n",
                "output_path":"compose.yml"}"#,
        )
        .unwrap();
        assert_eq!(inputs.base_compose_inline, "services:\n  web:\n    image: nginx");
    }

    #[test]
    fn test_render_compose_requires_exactly_one_base() {
        for json in [
            r#"{"environment":"dev","output_path":"compose.yml"}"#,
            r#"{"environment":"dev","base_compose_path":"a.yml","base_compose_inline":"x","output_path":"compose.yml"}"#,
        ] {
            let err = decode(json).unwrap_err();
            assert!(err.to_string().contains("exactly one of"), "got {err}");
        }
    }

    #[test]
    fn test_render_compose_overlay_path_error_names_index() {
        let err = decode(
            r#"{"environment":"dev","base_compose_path":"a.yml",
                "overlays":[{"name":"x","path":"/abs.yml"}],"output_path":"compose.yml"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("overlays[0].path: "), "got {err}");
    }
}
