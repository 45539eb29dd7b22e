//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod ops;
pub mod params;
pub mod report;
pub mod secret;
pub mod step;
pub mod template;

pub use config::ProvisionConfig;
pub use error::{ConfigError, ParamError, ProvisionError, TemplateError};
pub use params::SiteParams;
pub use report::{Credential, ExecResult, Outcome, ReportEntry, RunReport, RunStatus};
pub use secret::{SecretSpec, generate_secret};
pub use step::{Action, FailurePolicy, Input, Step, StepPolicy, Verdict};
