//! Execution report - the output contract of every executor

use crate::types::{Annotations, HostRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Machine-readable codes carried in [`ExecutionError::code`]
pub mod codes {
    /// The step executor returned an error
    pub const EXECUTION_ERROR: &str = "EXECUTION_ERROR";
    /// No executor is registered for the step's action
    pub const NO_EXECUTOR: &str = "NO_EXECUTOR";
    /// A local dependency did not succeed
    pub const DEPENDENCY_NOT_COMPLETED: &str = "DEPENDENCY_NOT_COMPLETED";
    /// A global step this host plan waits on did not succeed
    pub const GLOBAL_DEPENDENCY_UNMET: &str = "GLOBAL_DEPENDENCY_UNMET";
    /// An earlier step in the same list failed
    pub const HALTED: &str = "HALTED";
    /// Excluded by the step filter
    pub const FILTERED: &str = "FILTERED";
}

/// Current time as an RFC 3339 UTC timestamp
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    Partial,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Partial => "partial",
        })
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// Why a step failed or was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionError {
    /// One of [`codes`]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    pub message: String,
}

impl ExecutionError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
    System,
}

/// A single line of step output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogLine {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time: String,
    pub stream: LogStream,
    pub message: String,
}

impl LogLine {
    /// A timestamped line on `stream`
    pub fn new(stream: LogStream, message: impl Into<String>) -> Self {
        Self {
            time: timestamp(),
            stream,
            message: message.into(),
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(LogStream::System, message)
    }

    pub fn stdout(message: impl Into<String>) -> Self {
        Self::new(LogStream::Stdout, message)
    }

    pub fn stderr(message: impl Into<String>) -> Self {
        Self::new(LogStream::Stderr, message)
    }
}

/// Result of executing (or not executing) one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StepExecution {
    pub step_id: String,
    pub host: HostRef,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub started_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub completed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogLine>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

impl StepExecution {
    /// A step that has not started yet
    pub fn pending(step_id: impl Into<String>, host: HostRef) -> Self {
        Self {
            step_id: step_id.into(),
            host,
            status: StepStatus::Pending,
            started_at: String::new(),
            completed_at: String::new(),
            error: None,
            logs: Vec::new(),
            meta: Annotations::new(),
        }
    }

    /// A step that was never attempted
    pub fn skipped(
        step_id: impl Into<String>,
        host: HostRef,
        code: &str,
        message: impl Into<String>,
    ) -> Self {
        let mut exec = Self::pending(step_id, host);
        exec.status = StepStatus::Skipped;
        exec.error = Some(ExecutionError::new(code, message));
        exec
    }

    /// The error code, if any
    pub fn code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// Counts per step status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub other: usize,
}

impl ReportSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.other
    }
}

/// Aggregated result of running a plan, a host plan or the global steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecutionReport {
    pub plan_id: String,
    pub status: ExecutionStatus,
    pub steps: Vec<StepExecution>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Annotations,
}

impl ExecutionReport {
    /// Build a report whose status is derived from `steps`
    pub fn from_steps(plan_id: impl Into<String>, steps: Vec<StepExecution>) -> Self {
        Self {
            plan_id: plan_id.into(),
            status: aggregate_status(&steps),
            steps,
            meta: Annotations::new(),
        }
    }

    /// Append another report's steps and recompute the status
    pub fn merge(&mut self, other: Self) {
        self.steps.extend(other.steps);
        self.status = aggregate_status(&self.steps);
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for step in &self.steps {
            match step.status {
                StepStatus::Succeeded => summary.succeeded += 1,
                StepStatus::Failed => summary.failed += 1,
                StepStatus::Skipped => summary.skipped += 1,
                StepStatus::Pending | StepStatus::Running => summary.other += 1,
            }
        }
        summary
    }

    /// Look up the execution record for a step id
    pub fn step(&self, step_id: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

/// Any failure wins, then any step that did not succeed makes the run partial
pub fn aggregate_status(steps: &[StepExecution]) -> ExecutionStatus {
    if steps.iter().any(|s| s.status == StepStatus::Failed) {
        ExecutionStatus::Failed
    } else if steps.iter().any(|s| s.status != StepStatus::Succeeded) {
        ExecutionStatus::Partial
    } else {
        ExecutionStatus::Succeeded
    }
}
