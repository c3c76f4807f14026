//! Box-drawn summaries for slices and execution reports

use colored::{ColoredString, Colorize};
use hostplan::{ExecutionReport, ExecutionStatus, SliceResult, StepStatus};

use crate::ui;

const RULE: &str = "─────────────────────────────────────────────────────";

/// Display how a plan was partitioned across hosts
pub fn display_slice(plan_id: &str, slice: &SliceResult) {
    eprintln!();
    eprintln!("┌─ {} {} ─────────────────────┐", "Plan".bold(), ui::short_id(plan_id, 24));
    eprintln!("│");

    if !slice.global_steps.is_empty() {
        eprintln!("│ {}", "Global steps".bold());
        for step in &slice.global_steps {
            eprintln!("│   {} {:<30} {}", "◆".cyan(), step.id, step.action.to_string().dimmed());
        }
        eprintln!("│");
    }

    for (host, host_plan) in &slice.host_plans {
        let waits = slice.required_globals(host_plan);
        let waits = if waits.is_empty() {
            String::new()
        } else {
            format!(" (waits on {})", waits.join(", ")).dimmed().to_string()
        };
        eprintln!("│ {}{}", host.bold(), waits);

        for step in &host_plan.steps {
            let deps = if step.depends_on.is_empty() {
                String::new()
            } else {
                format!("after {}", step.depends_on.join(", "))
            };
            eprintln!(
                "│   {} {:<30} {:<16} {}",
                "•".green(),
                step.id,
                step.action.to_string(),
                deps.dimmed()
            );
        }
        eprintln!("│");
    }

    eprintln!("├{RULE}┤");
    eprintln!(
        "│ Summary: {} steps ({} global, {} hosts)",
        slice.total_steps().to_string().bold(),
        slice.global_steps.len().to_string().cyan(),
        slice.host_plans.len().to_string().green()
    );
    eprintln!("└{RULE}┘");
}

/// Display the outcome of an execution
pub fn display_report(report: &ExecutionReport) {
    eprintln!();
    eprintln!(
        "┌─ {} {} ─────────────────────┐",
        "Report".bold(),
        ui::short_id(&report.plan_id, 24)
    );
    eprintln!("│");

    for step in &report.steps {
        let host = if step.host.is_global() {
            "(global)".to_string()
        } else {
            step.host.logical_id.clone()
        };
        let detail = step
            .error
            .as_ref()
            .map(|e| {
                if e.code.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.code, e.message)
                }
            })
            .unwrap_or_default();

        eprintln!(
            "│   {} {:<24} {:<16} {}",
            step_symbol(step.status),
            step.step_id,
            host.dimmed(),
            detail.dimmed()
        );
    }

    let summary = report.summary();
    eprintln!("│");
    eprintln!("├{RULE}┤");
    eprintln!(
        "│ {}: {} steps, {} succeeded, {} failed, {} skipped",
        status_label(report.status),
        summary.total().to_string().bold(),
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red(),
        summary.skipped.to_string().yellow()
    );
    eprintln!("└{RULE}┘");
}

fn step_symbol(status: StepStatus) -> ColoredString {
    match status {
        StepStatus::Succeeded => "✓".green(),
        StepStatus::Failed => "✗".red(),
        StepStatus::Skipped => "-".yellow(),
        StepStatus::Pending | StepStatus::Running => "?".dimmed(),
    }
}

fn status_label(status: ExecutionStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ExecutionStatus::Succeeded => label.green().bold(),
        ExecutionStatus::Failed => label.red().bold(),
        _ => label.yellow().bold(),
    }
}
