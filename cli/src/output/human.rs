//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{Outcome, ReportEntry, RunReport, RunStatus};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

/// Per-group tally used by the summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTally {
    pub group: String,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the end-of-run summary.
    ///
    /// Failures and credentials are printed even in quiet mode: the
    /// credentials cannot be recovered once the process exits.
    pub fn render_report(&self, report: &RunReport) {
        let status = report.status();
        if !self.ctx.quiet {
            println!();
            self.ctx.header("Provisioning summary");
            println!();
            self.ctx.kv("Status:  ", &status.to_string());
            self.ctx.kv("Policy:  ", &report.policy.to_string());
            self.ctx.kv("Steps:   ", &format_step_counts(report));
            if let Some(finished) = report.finished_at {
                let secs = (finished - report.started_at).num_seconds().max(0);
                self.ctx
                    .kv("Duration:", &format_duration(u64::try_from(secs).unwrap_or(0)));
            }
            println!();
            for tally in group_tallies(report) {
                self.render_tally(&tally);
            }
        }

        let failures: Vec<&ReportEntry> = report.failures().collect();
        if !failures.is_empty() {
            println!();
            println!("  {}", "Failures:".style(self.ctx.styles.bold));
            for entry in failures {
                self.render_failure(entry);
            }
        }

        let credentials: Vec<_> = report.credentials().collect();
        if !credentials.is_empty() {
            println!();
            println!("  {}", "Credentials:".style(self.ctx.styles.bold));
            for c in &credentials {
                println!(
                    "    {:<6} {:<16} {}",
                    c.label.to_uppercase(),
                    c.username,
                    c.secret.style(self.ctx.styles.secret)
                );
            }
            println!();
            self.ctx.warn(
                "Credentials are printed once and not stored. Move them to a secret store.",
            );
        }

        if !self.ctx.quiet {
            println!();
            match status {
                RunStatus::Succeeded => self.ctx.success("Host provisioned."),
                RunStatus::CompletedWithFailures(_) => self
                    .ctx
                    .warn("Remediate the failures above, then re-run. Completed steps are safe to repeat."),
                RunStatus::Aborted { .. } => self
                    .ctx
                    .info("Fix the failing step and re-run. Completed steps are safe to repeat."),
                RunStatus::Planned => self.ctx.info("Dry run: no changes were made."),
            }
        }
    }

    fn render_tally(&self, tally: &GroupTally) {
        let total = tally.succeeded + tally.failed + tally.skipped;
        let line = format!("{:<10} {}/{total}", tally.group, tally.succeeded);
        if tally.failed > 0 {
            self.ctx.warn(&format!("{line}  ({} failed)", tally.failed));
        } else if tally.skipped == total {
            self.ctx.info(&format!("{:<10} {total} planned", tally.group));
        } else {
            self.ctx.success(&line);
        }
    }

    fn render_failure(&self, entry: &ReportEntry) {
        eprintln!(
            "  {} {}",
            "✗".style(self.ctx.styles.error),
            format_failure_line(entry)
        );
        eprintln!("      {}", entry.command.style(self.ctx.styles.dim));
        let tail = entry.result.stderr_tail(3);
        for line in tail.lines() {
            eprintln!("      {line}");
        }
    }
}

#[must_use]
pub fn format_failure_line(entry: &ReportEntry) -> String {
    format!(
        "[{}] {} (exit {}, policy {})",
        entry.index, entry.name, entry.result.exit_code, entry.policy
    )
}

#[must_use]
pub fn format_step_counts(report: &RunReport) -> String {
    let count = |o: Outcome| report.entries().iter().filter(|e| e.outcome == o).count();
    let skipped = count(Outcome::Skipped);
    if skipped > 0 {
        return format!("{skipped} planned");
    }
    format!(
        "{} run, {} succeeded, {} failed",
        report.len(),
        count(Outcome::Succeeded),
        count(Outcome::Failed)
    )
}

/// Tally outcomes per group, keeping first-seen group order.
#[must_use]
pub fn group_tallies(report: &RunReport) -> Vec<GroupTally> {
    let mut out: Vec<GroupTally> = Vec::new();
    for entry in report.entries() {
        let idx = match out.iter().position(|t| t.group == entry.group) {
            Some(i) => i,
            None => {
                out.push(GroupTally {
                    group: entry.group.clone(),
                    succeeded: 0,
                    failed: 0,
                    skipped: 0,
                });
                out.len() - 1
            }
        };
        let tally = &mut out[idx];
        match entry.outcome {
            Outcome::Succeeded => tally.succeeded += 1,
            Outcome::Failed => tally.failed += 1,
            Outcome::Skipped => tally.skipped += 1,
        }
    }
    out
}

#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let m = seconds / 60;
    let s = seconds % 60;
    if m > 0 { format!("{m}m {s}s") } else { format!("{s}s") }
}
