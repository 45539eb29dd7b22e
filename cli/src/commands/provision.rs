//! `hostprov <domain> <upstream> <email>`: build the plan and run it.

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::services::plan::build_plan;
use crate::application::services::prerequisites::ensure_root;
use crate::application::services::provisioner::Provisioner;
use crate::domain::SiteParams;
use crate::output::OutputContext;

/// Positional site parameters.
pub struct ProvisionArgs {
    pub domain: String,
    pub upstream: String,
    pub email: String,
}

/// Run a provisioning pass and return the process exit code.
///
/// # Errors
///
/// Returns an error if the parameters are invalid, the plan cannot be built,
/// the process is not root, or the user declines the confirmation. Step
/// failures are carried by the returned exit code.
pub async fn run(args: &ProvisionArgs, app: &AppContext) -> Result<i32> {
    let params = SiteParams::new(&args.domain, &args.upstream, &args.email)?;
    let steps = build_plan(&params, &app.config).context("building the provisioning plan")?;
    tracing::info!(
        domain = %params.domain,
        upstream = %params.upstream,
        steps = steps.len(),
        policy = %app.config.policy,
        dry_run = app.dry_run,
        "plan built"
    );

    if !app.dry_run {
        ensure_root(&app.runner).await?;
        print_intro(&params, steps.len(), app);
        let prompt = format!("Provision {} now?", params.domain);
        if !app.confirm(&prompt, true)? {
            anyhow::bail!("provisioning cancelled");
        }
    }

    let reporter = app.terminal_reporter();
    let report = Provisioner::new(&app.runner, &reporter, app.config.policy)
        .dry_run(app.dry_run)
        .run(&steps)
        .await;

    app.renderer().render_report(&report)?;
    tracing::info!(status = %report.status(), "run finished");
    Ok(report.exit_code())
}

fn print_intro(params: &SiteParams, step_count: usize, app: &AppContext) {
    let ctx: &OutputContext = &app.output;
    if ctx.quiet {
        return;
    }
    ctx.header(&format!("Provisioning {}", params.domain));
    ctx.kv("Upstream:", &params.upstream);
    ctx.kv("Contact: ", &params.email);
    ctx.kv("Steps:   ", &step_count.to_string());
    ctx.kv("Policy:  ", &app.config.policy.to_string());
    println!();
}
