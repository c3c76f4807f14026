use super::ActionInputs;
use super::common::{
    KeyValue, normalize_list, normalize_pairs, normalize_string, require, require_entries,
    require_keys, require_positive,
};
use crate::error::InputsError;
use crate::types::StepAction;
use serde::{Deserialize, Serialize};

/// An HTTP endpoint polled by a health check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthEndpoint {
    pub name: String,
    pub url: String,
    pub expected_status: u16,
    pub method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValue>,
}

/// Inputs for a `health_check` step
///
/// Exactly one of `endpoints` and `services` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheckInputs {
    pub environment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<HealthEndpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
}

impl ActionInputs for HealthCheckInputs {
    const ACTION: StepAction = StepAction::HealthCheck;

    fn normalize(&mut self) -> Result<(), InputsError> {
        normalize_string(&mut self.environment);
        normalize_list(&mut self.services);
        for endpoint in &mut self.endpoints {
            normalize_string(&mut endpoint.name);
            normalize_string(&mut endpoint.url);
            normalize_string(&mut endpoint.method);
            normalize_pairs(&mut endpoint.headers);
        }
        self.endpoints.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    fn validate(&self) -> Result<(), InputsError> {
        require("environment", &self.environment)?;
        if self.endpoints.is_empty() == self.services.is_empty() {
            return Err(InputsError::invalid(
                "endpoints",
                "exactly one of endpoints or services must be provided",
            ));
        }
        require_positive("timeout_seconds", self.timeout_seconds)?;
        require_positive("interval_seconds", self.interval_seconds)?;
        if self.retries.is_some_and(|n| n < 0) {
            return Err(InputsError::invalid("retries", "must be >= 0 if present"));
        }
        require_entries("services", &self.services)?;

        for endpoint in &self.endpoints {
            require("endpoints.name", &endpoint.name)?;
            require("endpoints.url", &endpoint.url)?;
            if endpoint.expected_status == 0 {
                return Err(InputsError::invalid("endpoints.expected_status", "must be > 0"));
            }
            require("endpoints.method", &endpoint.method)?;
            require_keys("endpoints.headers", &endpoint.headers)?;
        }
        Ok(())
    }
}
