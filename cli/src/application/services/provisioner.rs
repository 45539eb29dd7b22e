//! Application service: the sequential provisioning engine.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through the injected `CommandRunner`.

use std::collections::HashMap;

use crate::application::ports::{CommandRunner, ProgressReporter};
use crate::domain::{
    Action, Credential, ExecResult, FailurePolicy, Input, Outcome, ProvisionError, ReportEntry,
    RunReport, Step, StepPolicy, Verdict, generate_secret,
};

/// Runs an ordered step list, one step at a time, under a run policy.
///
/// Steps are never reordered or run concurrently: each one may rely on the
/// host state left by the ones before it.
pub struct Provisioner<'a, R: CommandRunner, P: ProgressReporter> {
    runner: &'a R,
    reporter: &'a P,
    policy: StepPolicy,
    dry_run: bool,
}

impl<'a, R: CommandRunner, P: ProgressReporter> Provisioner<'a, R, P> {
    #[must_use]
    pub fn new(runner: &'a R, reporter: &'a P, policy: FailurePolicy) -> Self {
        Self {
            runner,
            reporter,
            policy: StepPolicy::new(policy),
            dry_run: false,
        }
    }

    /// Record every step as `Skipped` instead of executing it.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Execute `steps` in order and return the report.
    ///
    /// Under an effective `Abort` policy the first failing step halts the run
    /// and the report holds exactly the steps executed so far, with the
    /// failure recorded as the abort cause. Under `Continue` every step runs.
    pub async fn run(&self, steps: &[Step]) -> RunReport {
        let mut report = RunReport::begin(self.policy.run_policy(), self.dry_run);
        let mut credentials: HashMap<String, Credential> = HashMap::new();
        let total = steps.len();

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let label = format!("[{index}/{total}] {}", step.name);
            let command = step.action.display();
            let policy = self.policy.effective(step);

            if self.dry_run {
                tracing::debug!(step = %step.name, %command, "dry run, not executed");
                self.reporter.success(&format!("{label} (planned)"));
                report.push(ReportEntry {
                    index,
                    name: step.name.clone(),
                    group: step.group.clone(),
                    command,
                    policy,
                    outcome: Outcome::Skipped,
                    result: ExecResult::ok(),
                    credential: None,
                });
                continue;
            }

            self.reporter.step(&label);
            tracing::debug!(step = %step.name, %command, %policy, "running step");
            let (result, credential) = self.execute(step, &mut credentials).await;
            let verdict = self.policy.evaluate(step, &result);

            let outcome = match verdict {
                Verdict::Succeeded => Outcome::Succeeded,
                Verdict::Tolerated | Verdict::Fatal => Outcome::Failed,
            };
            let exit_code = result.exit_code;
            let stderr_tail = result.stderr_tail(5);

            report.push(ReportEntry {
                index,
                name: step.name.clone(),
                group: step.group.clone(),
                command,
                policy,
                outcome,
                result,
                credential,
            });

            match verdict {
                Verdict::Succeeded => self.reporter.success(&label),
                Verdict::Tolerated => {
                    tracing::warn!(step = %step.name, exit_code, stderr = %stderr_tail, "step failed, continuing");
                    self.reporter
                        .warn(&format!("{label} failed (exit {exit_code}), continuing"));
                }
                Verdict::Fatal => {
                    tracing::error!(step = %step.name, exit_code, stderr = %stderr_tail, "step failed, aborting run");
                    self.reporter
                        .error(&format!("{label} failed (exit {exit_code}), aborting"));
                    report.abort(ProvisionError::StepFailed {
                        step: step.name.clone(),
                        exit_code,
                    });
                    break;
                }
            }
        }

        report.finish();
        report
    }

    async fn execute(
        &self,
        step: &Step,
        credentials: &mut HashMap<String, Credential>,
    ) -> (ExecResult, Option<Credential>) {
        match &step.action {
            Action::GenerateSecret {
                label,
                username,
                spec,
            } => match generate_secret(spec) {
                Ok(secret) => {
                    let credential = Credential {
                        label: label.clone(),
                        username: username.clone(),
                        secret,
                    };
                    credentials.insert(label.clone(), credential.clone());
                    (ExecResult::ok(), Some(credential))
                }
                Err(e) => (ExecResult::failure(1, &format!("{e:#}")), None),
            },
            Action::Exec {
                program,
                args,
                input,
            } => {
                let payload = match input {
                    None => None,
                    Some(Input::Bytes(bytes)) => Some(bytes.clone()),
                    Some(Input::Credential { label }) => match credentials.get(label) {
                        Some(c) => Some(format!("{}:{}\n", c.username, c.secret).into_bytes()),
                        None => {
                            let msg = format!("credential '{label}' was not generated");
                            return (ExecResult::failure(1, &msg), None);
                        }
                    },
                };
                let argv: Vec<&str> = args.iter().map(String::as_str).collect();
                let result = match step.timeout {
                    Some(timeout) => {
                        self.runner
                            .run_with_timeout(program, &argv, payload.as_deref(), timeout)
                            .await
                    }
                    None => self.runner.run(program, &argv, payload.as_deref()).await,
                };
                (result, None)
            }
        }
    }
}
