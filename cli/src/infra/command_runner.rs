//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::application::ports::CommandRunner;
use crate::domain::ExecResult;
use crate::domain::report::{EXIT_NOT_LAUNCHED, EXIT_TIMED_OUT};

/// Default per-step timeout when the configuration does not set one.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(1800);

/// Production `CommandRunner`.
///
/// A command that exceeds its timeout is killed with `child.kill()` inside a
/// `tokio::select!`, not merely abandoned, so no orphan keeps mutating the
/// host after the run has moved on.
pub struct TokioCommandRunner {
    timeout: Option<Duration>,
}

impl TokioCommandRunner {
    /// `None` disables the default timeout.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(Some(DEFAULT_STEP_TIMEOUT))
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], input: Option<&[u8]>) -> ExecResult {
        execute(program, args, input, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> ExecResult {
        execute(program, args, input, Some(timeout)).await
    }
}

async fn execute(
    program: &str,
    args: &[&str],
    input: Option<&[u8]>,
    timeout: Option<Duration>,
) -> ExecResult {
    let started = Instant::now();
    let spawned = tokio::process::Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!(program, error = %e, "spawn failed");
            return ExecResult::failure(EXIT_NOT_LAUNCHED, &format!("failed to spawn {program}: {e}"));
        }
    };

    // Writer runs on its own task so a child that fills its stdout pipe
    // before draining stdin cannot deadlock us. Dropping the handle closes
    // the pipe, which the child sees as EOF.
    let stdin_task = match (child.stdin.take(), input) {
        (Some(mut stdin), Some(bytes)) => {
            let owned = bytes.to_vec();
            Some(tokio::spawn(async move {
                let _ = stdin.write_all(&owned).await;
            }))
        }
        _ => None,
    };

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let result = tokio::select! {
        (status, stdout, stderr) = async {
            tokio::join!(child.wait(), read_all(stdout_handle), read_all(stderr_handle))
        } => {
            match status {
                Ok(status) => ExecResult::new(exit_code(status), stdout, stderr),
                Err(e) => ExecResult::failure(1, &format!("waiting for {program}: {e}")),
            }
        }
        () = deadline(timeout) => {
            let _ = child.kill().await;
            let secs = timeout.map_or(0, |t| t.as_secs());
            ExecResult::failure(EXIT_TIMED_OUT, &format!("{program} timed out after {secs}s"))
        }
    };

    if let Some(task) = stdin_task {
        let _ = task.await;
    }
    tracing::debug!(
        program,
        exit_code = result.exit_code,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "command finished"
    );
    result
}

async fn read_all<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(t) => tokio::time::sleep(t).await,
        None => std::future::pending::<()>().await,
    }
}

/// Exit code of `status`; signal deaths map to `128 + signal` like a shell.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
