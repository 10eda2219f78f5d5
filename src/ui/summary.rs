//! End-of-run summary.

use std::time::Duration;

use crate::report::{RunReport, StepStatus};

use super::output::format_duration;
use super::table::{Align, Table};
use super::theme::Theme;

/// Summary printed to stdout after a run: one table row per step, then
/// totals and the overall status.
pub fn render_summary(report: &RunReport, theme: &Theme) -> String {
    let mut table = Table::new(&["Phase", "Step", "Status", "Exit", "Time"])
        .align(3, Align::Right)
        .align(4, Align::Right);

    for phase in &report.phases {
        if phase.steps.is_empty() {
            table.add_row(vec![
                phase.name.clone(),
                String::new(),
                theme.status_label(phase.status),
                String::new(),
                String::new(),
            ]);
            continue;
        }
        for (i, step) in phase.steps.iter().enumerate() {
            let mut status = theme.status_label(step.status);
            if step.retries > 0 {
                status.push_str(&format!(" (retried {}x)", step.retries));
            }
            table.add_row(vec![
                if i == 0 { phase.name.clone() } else { String::new() },
                step.id.clone(),
                status,
                step.exit_code.map(|c| c.to_string()).unwrap_or_default(),
                if step.duration_ms > 0 {
                    format_duration(Duration::from_millis(step.duration_ms))
                } else {
                    String::new()
                },
            ]);
        }
    }

    let mut out = String::new();
    let title = if report.dry_run {
        format!("{} (dry run, profile {})", report.playbook, report.profile)
    } else {
        format!("{} (profile {})", report.playbook, report.profile)
    };
    out.push_str(&theme.format_header(&title));
    out.push('\n');
    out.push_str(&table.render());
    out.push('\n');

    let counts: Vec<String> = [
        StepStatus::Succeeded,
        StepStatus::Failed,
        StepStatus::Skipped,
        StepStatus::Cancelled,
    ]
    .into_iter()
    .filter_map(|status| {
        let n = report.count(status);
        (n > 0).then(|| format!("{} {}", n, status))
    })
    .collect();
    if !counts.is_empty() {
        out.push_str(&theme.dim.apply_to(counts.join(", ")).to_string());
        out.push('\n');
    }

    if let Some(error) = &report.error {
        out.push_str(&theme.format_error(error));
        out.push('\n');
    }

    out.push_str(&format!(
        "{} {}",
        theme.format_overall(report.overall_status),
        theme.duration.apply_to(format!(
            "in {}",
            format_duration(Duration::from_millis(report.duration_ms))
        ))
    ));
    out
}
