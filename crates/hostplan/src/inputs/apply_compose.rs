use super::ActionInputs;
use super::common::{
    normalize_list, normalize_path_field, normalize_string, require, require_entries,
    validate_expected_hash,
};
use crate::error::InputsError;
use crate::types::StepAction;
use serde::{Deserialize, Serialize};

/// Inputs for an `apply_compose` step
///
/// `pull` and `detach` must be present on the wire even when false, so a
/// producer can never rely on an implicit default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyComposeInputs {
    pub environment: String,
    pub compose_path: String,
    pub project_name: String,
    pub pull: Option<bool>,
    pub detach: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_compose_hash_alg: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_compose_hash: String,
}

impl ActionInputs for ApplyComposeInputs {
    const ACTION: StepAction = StepAction::ApplyCompose;

    fn normalize(&mut self) -> Result<(), InputsError> {
        normalize_string(&mut self.environment);
        normalize_string(&mut self.project_name);
        normalize_string(&mut self.expected_compose_hash_alg);
        normalize_string(&mut self.expected_compose_hash);
        normalize_list(&mut self.services);
        normalize_path_field("compose_path", &mut self.compose_path)
    }

    fn validate(&self) -> Result<(), InputsError> {
        require("environment", &self.environment)?;
        require("compose_path", &self.compose_path)?;
        require("project_name", &self.project_name)?;
        if self.pull.is_none() {
            return Err(InputsError::invalid("pull", "is required (set it explicitly)"));
        }
        if self.detach.is_none() {
            return Err(InputsError::invalid("detach", "is required (set it explicitly)"));
        }
        require_entries("services", &self.services)?;
        validate_expected_hash(&self.expected_compose_hash_alg, &self.expected_compose_hash)
    }
}
