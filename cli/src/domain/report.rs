//! Run results: per-step `ExecResult`s and the ordered `RunReport`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::domain::error::ProvisionError;
use crate::domain::step::FailurePolicy;

/// Exit code reported when a command cannot be launched at all.
pub const EXIT_NOT_LAUNCHED: i32 = 127;
/// Exit code reported when a command exceeds its timeout.
pub const EXIT_TIMED_OUT: i32 = 124;

// ── ExecResult ────────────────────────────────────────────────────────────────

/// Captured result of one step execution. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecResult {
    pub exit_code: i32,
    #[serde(serialize_with = "lossy_utf8")]
    pub stdout: Vec<u8>,
    #[serde(serialize_with = "lossy_utf8")]
    pub stderr: Vec<u8>,
}

impl ExecResult {
    #[must_use]
    pub fn new(exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
        }
    }

    /// Successful result with no output.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(0, Vec::new(), Vec::new())
    }

    /// Failed result carrying `message` on stderr.
    #[must_use]
    pub fn failure(exit_code: i32, message: &str) -> Self {
        Self::new(exit_code, Vec::new(), message.as_bytes().to_vec())
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last `lines` lines of stderr, for log and summary excerpts.
    #[must_use]
    pub fn stderr_tail(&self, lines: usize) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

fn lossy_utf8<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

// ── Outcome / Credential / ReportEntry ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
    /// Recorded but not executed (dry run).
    Skipped,
}

/// A credential generated during the run.
///
/// Held only in the report; it cannot be derived again after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub label: String,
    pub username: String,
    pub secret: String,
}

/// One executed (or skipped) step.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    /// 1-based position in the step list.
    pub index: usize,
    pub name: String,
    pub group: String,
    pub command: String,
    /// Effective policy the step ran under.
    pub policy: FailurePolicy,
    pub outcome: Outcome,
    pub result: ExecResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
}

// ── RunStatus ─────────────────────────────────────────────────────────────────

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    CompletedWithFailures(usize),
    Aborted { step: String, exit_code: i32 },
    /// Dry run: nothing was executed.
    Planned,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("success"),
            Self::CompletedWithFailures(1) => f.write_str("completed with 1 failure"),
            Self::CompletedWithFailures(n) => write!(f, "completed with {n} failures"),
            Self::Aborted { step, exit_code } => {
                write!(f, "aborted at '{step}' (exit code {exit_code})")
            }
            Self::Planned => f.write_str("planned (dry run)"),
        }
    }
}

// ── RunReport ─────────────────────────────────────────────────────────────────

/// Ordered outcome record for a provisioning run.
///
/// Built incrementally by the provisioner; read-only for everyone else.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub policy: FailurePolicy,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    entries: Vec<ReportEntry>,
    #[serde(serialize_with = "error_message")]
    aborted: Option<ProvisionError>,
}

fn error_message<S: Serializer>(
    err: &Option<ProvisionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl RunReport {
    pub(crate) fn begin(policy: FailurePolicy, dry_run: bool) -> Self {
        Self {
            policy,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            aborted: None,
        }
    }

    pub(crate) fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn abort(&mut self, error: ProvisionError) {
        self.aborted = Some(error);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome vector in step order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.entries.iter().map(|e| e.outcome).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome == Outcome::Failed)
    }

    pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
        self.entries.iter().filter_map(|e| e.credential.as_ref())
    }

    /// The fatal failure that halted the run, if any.
    #[must_use]
    pub fn aborted(&self) -> Option<&ProvisionError> {
        self.aborted.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        if let Some(ProvisionError::StepFailed { step, exit_code }) = &self.aborted {
            return RunStatus::Aborted {
                step: step.clone(),
                exit_code: *exit_code,
            };
        }
        if self.dry_run {
            return RunStatus::Planned;
        }
        match self.failures().count() {
            0 => RunStatus::Succeeded,
            n => RunStatus::CompletedWithFailures(n),
        }
    }

    /// Process exit code: the aborting step's code, otherwise 0.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.aborted.as_ref().map_or(0, ProvisionError::exit_code)
    }

    /// Surface the abort as an error; completed runs are `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the `StepFailed` that halted the run.
    pub fn into_result(self) -> Result<Self, ProvisionError> {
        match self.aborted.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
