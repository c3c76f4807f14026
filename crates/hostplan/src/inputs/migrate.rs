use super::ActionInputs;
use super::common::{normalize_path_field, normalize_string, require, require_positive};
use crate::error::InputsError;
use crate::types::StepAction;
use serde::{Deserialize, Serialize};

/// Inputs for a `migrate` step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateInputs {
    pub database: String,
    pub strategy: String,
    pub engine: String,
    pub path: String,
    /// Name of the environment variable holding the connection string
    pub conn_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
    /// Passed to the migration engine in order; never sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ActionInputs for MigrateInputs {
    const ACTION: StepAction = StepAction::Migrate;

    fn normalize(&mut self) -> Result<(), InputsError> {
        normalize_string(&mut self.database);
        normalize_string(&mut self.strategy);
        normalize_string(&mut self.engine);
        normalize_string(&mut self.conn_env);
        self.args.iter_mut().for_each(normalize_string);
        normalize_path_field("path", &mut self.path)
    }

    fn validate(&self) -> Result<(), InputsError> {
        require("database", &self.database)?;
        require("strategy", &self.strategy)?;
        require("engine", &self.engine)?;
        require("path", &self.path)?;
        require("conn_env", &self.conn_env)?;
        require_positive("timeout_seconds", self.timeout_seconds)
    }
}
