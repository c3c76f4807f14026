use super::validate_action_inputs;
use crate::context::{StepContext, StepExecutor};
use crate::report::LogLine;
use crate::types::HostPlanStep;
use anyhow::{Context, Result};

/// A [`StepExecutor`] that checks inputs without touching infrastructure
///
/// Typed inputs are strictly decoded, normalized and validated; a step
/// fails when its inputs would be rejected by a real executor. Actions
/// without a typed schema pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatingExecutor;

impl StepExecutor for ValidatingExecutor {
    fn execute(&self, step: &HostPlanStep, ctx: &StepContext<'_>) -> Result<Vec<LogLine>> {
        let typed = validate_action_inputs(step.action, step.inputs.as_ref())
            .with_context(|| format!("invalid inputs for step {:?}", step.id))?;

        let mut logs = vec![LogLine::system(if typed {
            format!("{} inputs valid", step.action)
        } else {
            format!("{} has no typed inputs to validate", step.action)
        })];
        if ctx.dry_run {
            logs.push(LogLine::system("dry run: no changes applied"));
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostRef, RawPayload, StepAction};

    fn step(action: StepAction, inputs: Option<&str>) -> HostPlanStep {
        HostPlanStep {
            id: "s1".into(),
            index: 0,
            action,
            target: Default::default(),
            inputs: inputs.map(|json| RawPayload::from_json(json).unwrap()),
            depends_on: Vec::new(),
            meta: Default::default(),
        }
    }

    #[test]
    fn test_validating_executor() {
        let host = HostRef::new("host-a");
        let ctx = StepContext {
            plan_id: "p",
            host: &host,
            dry_run: true,
        };

        let logs = ValidatingExecutor
            .execute(&step(StepAction::Rollout, Some(r#"{"mode":"all"}"#)), &ctx)
            .unwrap();
        assert_eq!(logs[0].message, "rollout inputs valid");
        assert_eq!(logs.len(), 2);

        let logs = ValidatingExecutor.execute(&step(StepAction::Noop, None), &ctx).unwrap();
        assert_eq!(logs[0].message, "noop has no typed inputs to validate");

        let err = ValidatingExecutor
            .execute(&step(StepAction::Rollout, Some(r#"{"mode":""}"#)), &ctx)
            .unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            r#"invalid inputs for step "s1": mode: is required"#
        );
    }
}
