//! hostprov - Provision an Ubuntu host as a TLS-terminating reverse proxy

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use hostprov_cli::cli::Cli;
use hostprov_cli::domain::{ParamError, ProvisionError};
use hostprov_cli::output::json::format_error;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    init_tracing();

    let json = cli.json;
    match cli.run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if json {
                match format_error(&format!("{e:#}"), error_code(&e)) {
                    Ok(doc) => println!("{doc}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HOSTPROV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn error_code(e: &anyhow::Error) -> &'static str {
    if let Some(p) = e.downcast_ref::<ProvisionError>() {
        return p.code();
    }
    if e.downcast_ref::<ParamError>().is_some() {
        return "invalid_parameter";
    }
    "error"
}
