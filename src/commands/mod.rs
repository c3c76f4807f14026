//! Command implementations

pub mod agent;
pub mod plan;

use anyhow::{Context as AnyhowContext, Result, bail};
use hostplan::{ExecutionReport, ExecutionStatus};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::Context;
use crate::{engine, ui};

/// Read a plan or host plan file
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Could not read {}", path.display()))
}

/// Serialize `value` as pretty JSON with a trailing newline
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(value).context("Failed to serialize JSON")?;
    out.push(b'\n');
    Ok(out)
}

/// Show a report, write it out, and fail the command when the run failed
pub(crate) fn emit_report(ctx: &Context, report: &ExecutionReport, output: Option<&Path>) -> Result<()> {
    if !ctx.quiet {
        engine::display_report(report);
    }

    let json = to_json(report)?;
    match output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Could not write report to {}", path.display()))?;
            if !ctx.quiet {
                ui::success(&format!("Report written to {}", path.display()));
            }
        }
        None => write_stdout(&json)?,
    }

    match report.status {
        ExecutionStatus::Succeeded => Ok(()),
        ExecutionStatus::Partial => {
            ui::warn(&format!("Plan {} finished partially", report.plan_id));
            Ok(())
        }
        ExecutionStatus::Failed => bail!("Plan {} failed", report.plan_id),
    }
}

pub(crate) fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes).context("Failed to write to stdout")?;
    stdout.flush().context("Failed to write to stdout")
}
