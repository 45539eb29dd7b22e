//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{ExecResult, ProvisionConfig};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
///
/// A runner is a dumb process launcher: it never interprets the command, and
/// a program that cannot be launched is reported as a non-zero `ExecResult`
/// rather than as a distinct error.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program under the runner's default timeout and capture its output.
    ///
    /// `input`, when present, is written to the child's stdin.
    async fn run(&self, program: &str, args: &[&str], input: Option<&[u8]>) -> ExecResult;

    /// Run a program with a custom timeout override.
    ///
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> ExecResult;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message (failure that does not stop the run).
    fn warn(&self, message: &str);
    /// Emit an error message (failure that stops the run).
    fn error(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts loading the provisioning configuration.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<ProvisionConfig>;
    /// Path the configuration is read from.
    fn path(&self) -> PathBuf;
}
