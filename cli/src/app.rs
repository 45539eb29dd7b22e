//! Application context: unified state passed to the command handler.
//!
//! `AppContext` gathers the output context, the command runner, and the
//! effective configuration (file values overridden by CLI flags) so the
//! handler takes one argument instead of a loose parameter list.

use anyhow::Result;

use crate::domain::{FailurePolicy, ProvisionConfig};
use crate::infra::TokioCommandRunner;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `HOSTPROV_YES` env vars).
    pub yes: bool,
    /// Record steps without executing them.
    pub dry_run: bool,
    /// Overrides the configured run policy.
    pub policy: Option<FailurePolicy>,
    /// Overrides the configured per-step timeout (seconds, `0` disables).
    pub step_timeout_secs: Option<u64>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to the command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Effective configuration.
    pub config: ProvisionConfig,
    /// Host command runner with the configured per-step timeout.
    pub runner: TokioCommandRunner,
    /// When `true`, record steps without executing them.
    pub dry_run: bool,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `HOSTPROV_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and the loaded
    /// configuration. Flags win over file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged configuration is invalid.
    pub fn new(flags: &AppFlags, mut config: ProvisionConfig) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("HOSTPROV_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        if let Some(policy) = flags.behaviour.policy {
            config.policy = policy;
        }
        if let Some(secs) = flags.behaviour.step_timeout_secs {
            config.step_timeout_secs = secs;
        }
        config.validate()?;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        // JSON mode owns stdout, so progress lines are suppressed.
        let quiet = flags.output.quiet || flags.output.json;

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            runner: TokioCommandRunner::new(config.step_timeout()),
            config,
            dry_run: flags.behaviour.dry_run,
            non_interactive,
        })
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Returns a `TerminalReporter` that borrows this context's output.
    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `HOSTPROV_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
