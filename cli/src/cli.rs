//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::application::ports::ConfigStore;
use crate::commands;
use crate::domain::FailurePolicy;
use crate::infra::YamlConfigStore;

/// Provision an Ubuntu web host: Nginx reverse proxy, TLS, firewall, FTP and SSH
#[derive(Parser)]
#[command(name = "hostprov", version)]
pub struct Cli {
    /// Site domain, e.g. example.com
    pub domain: String,

    /// Upstream the site proxies to, e.g. 127.0.0.1:8080
    pub upstream: String,

    /// Contact email for certificate registration
    pub email: String,

    /// Failure policy: abort on the first failing step, or continue and report
    #[arg(long, env = "HOSTPROV_POLICY", value_name = "abort|continue")]
    pub policy: Option<FailurePolicy>,

    /// Per-step timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub step_timeout: Option<u64>,

    /// Configuration file
    #[arg(long, env = "HOSTPROV_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List the steps without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Output the run report in JSON format
    #[arg(long)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl Cli {
    /// Execute the provisioning run and return the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration, the parameters, or a
    /// prerequisite is invalid. Step failures are reported through the exit
    /// code, not as errors.
    pub async fn run(self) -> Result<i32> {
        let store = YamlConfigStore::new(self.config.clone());
        let config = store.load()?;
        tracing::debug!(path = %store.path().display(), "configuration loaded");

        let flags = AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            behaviour: BehaviourFlags {
                yes: self.yes,
                dry_run: self.dry_run,
                policy: self.policy,
                step_timeout_secs: self.step_timeout,
            },
        };
        let ctx = AppContext::new(&flags, config)?;
        let args = commands::provision::ProvisionArgs {
            domain: self.domain,
            upstream: self.upstream,
            email: self.email,
        };
        commands::provision::run(&args, &ctx).await
    }
}
