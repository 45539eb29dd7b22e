//! Step model: the unit of work a provisioning run is made of.
//!
//! Pure data only. Executing a step is the job of
//! `application::services::provisioner`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::report::ExecResult;
use crate::domain::secret::SecretSpec;

// ── FailurePolicy ─────────────────────────────────────────────────────────────

/// What a failing step does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Halt the run and propagate the failure.
    #[default]
    Abort,
    /// Record the failure and proceed to the next step.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Continue => f.write_str("continue"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other => Err(format!("unknown policy '{other}' (expected abort or continue)")),
        }
    }
}

// ── Action ────────────────────────────────────────────────────────────────────

/// Payload piped to a command's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Literal bytes, e.g. a rendered configuration file.
    Bytes(Vec<u8>),
    /// `username:password\n` for the credential generated under `label`.
    ///
    /// Resolved at execution time from the run context, so the secret never
    /// exists in the step list itself.
    Credential { label: String },
}

/// What a step does when it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Launch an external program.
    Exec {
        program: String,
        args: Vec<String>,
        input: Option<Input>,
    },
    /// Generate a credential and keep it in the run context under `label`.
    GenerateSecret {
        label: String,
        username: String,
        spec: SecretSpec,
    },
}

impl Action {
    /// Human-readable rendering of the action for logs and reports.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Exec { program, args, .. } => {
                let mut out = program.clone();
                for arg in args {
                    out.push(' ');
                    if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('\'') {
                        out.push('\'');
                        out.push_str(&arg.replace('\'', r"'\''"));
                        out.push('\'');
                    } else {
                        out.push_str(arg);
                    }
                }
                out
            }
            Self::GenerateSecret { label, spec, .. } => {
                format!("generate {label} credential ({} chars)", spec.length)
            }
        }
    }
}

// ── Step ──────────────────────────────────────────────────────────────────────

/// A named, idempotent host mutation with its failure handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    /// Section the step belongs to, used to group the summary.
    pub group: String,
    pub action: Action,
    /// Overrides the run policy for this step when set.
    pub policy: Option<FailurePolicy>,
    /// Non-zero exit codes that mean "already in the target state".
    pub accepted_codes: Vec<i32>,
    /// Overrides the runner's default timeout when set.
    pub timeout: Option<Duration>,
}

impl Step {
    /// A step that runs `program` with `args`.
    pub fn exec<I, S>(name: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            Action::Exec {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
                input: None,
            },
        )
    }

    /// A step that generates a credential for `username`.
    pub fn generate_secret(
        name: impl Into<String>,
        label: impl Into<String>,
        username: impl Into<String>,
        spec: SecretSpec,
    ) -> Self {
        Self::new(
            name,
            Action::GenerateSecret {
                label: label.into(),
                username: username.into(),
                spec,
            },
        )
    }

    fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            action,
            policy: None,
            accepted_codes: Vec::new(),
            timeout: None,
        }
    }

    /// Pipe `input` to the command's stdin. No effect on non-exec actions.
    #[must_use]
    pub fn with_input(mut self, input: Input) -> Self {
        if let Action::Exec { input: slot, .. } = &mut self.action {
            *slot = Some(input);
        }
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Treat these exit codes as success.
    #[must_use]
    pub fn accept_codes(mut self, codes: &[i32]) -> Self {
        self.accepted_codes.extend_from_slice(codes);
        self
    }

    /// Never abort the run because of this step.
    #[must_use]
    pub fn best_effort(mut self) -> Self {
        self.policy = Some(FailurePolicy::Continue);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ── StepPolicy ────────────────────────────────────────────────────────────────

/// Result of evaluating one step's `ExecResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Succeeded,
    /// Failed, run continues.
    Tolerated,
    /// Failed, run halts.
    Fatal,
}

/// Decides, per step, whether a non-zero exit is fatal or tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    run: FailurePolicy,
}

impl StepPolicy {
    #[must_use]
    pub fn new(run: FailurePolicy) -> Self {
        Self { run }
    }

    #[must_use]
    pub fn run_policy(&self) -> FailurePolicy {
        self.run
    }

    /// Policy in force for `step`: its override, else the run policy.
    #[must_use]
    pub fn effective(&self, step: &Step) -> FailurePolicy {
        step.policy.unwrap_or(self.run)
    }

    #[must_use]
    pub fn evaluate(&self, step: &Step, result: &ExecResult) -> Verdict {
        if result.exit_code == 0 || step.accepted_codes.contains(&result.exit_code) {
            return Verdict::Succeeded;
        }
        match self.effective(step) {
            FailurePolicy::Abort => Verdict::Fatal,
            FailurePolicy::Continue => Verdict::Tolerated,
        }
    }
}
