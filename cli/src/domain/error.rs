//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// The two error kinds a provisioning run can surface to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("Step '{step}' failed with exit code {exit_code}.")]
    StepFailed { step: String, exit_code: i32 },

    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),
}

impl ProvisionError {
    /// Process exit code for this error.
    ///
    /// A failed step propagates its own exit code, clamped into `1..=255`
    /// so a negative or oversized code never reads as success.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { exit_code, .. } => (*exit_code).clamp(1, 255),
            Self::PrerequisiteMissing(_) => 1,
        }
    }

    /// Short machine-readable code used in JSON error objects.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::StepFailed { .. } => "step_failed",
            Self::PrerequisiteMissing(_) => "prerequisite_missing",
        }
    }
}

// ── Parameter errors ──────────────────────────────────────────────────────────

/// Errors related to the positional site parameters.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("Invalid domain '{0}': expected a hostname such as example.com")]
    InvalidDomain(String),

    #[error("Invalid upstream '{0}': expected host:port such as 127.0.0.1:8080")]
    InvalidUpstream(String),

    #[error("Invalid email '{0}': expected an address such as admin@example.com")]
    InvalidEmail(String),
}

// ── Template errors ───────────────────────────────────────────────────────────

/// Errors raised while rendering a configuration template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{template}' has an unresolved placeholder: {placeholder}")]
    UnresolvedPlaceholder {
        template: String,
        placeholder: String,
    },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
