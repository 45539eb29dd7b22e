//! Domain types and validators for hostprov configuration.
//!
//! Pure functions only: no I/O or filesystem access.

use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::domain::error::ConfigError;
use crate::domain::secret::{ALPHANUMERIC, DEFAULT_SECRET_LENGTH, SecretSpec};
use crate::domain::step::FailurePolicy;

/// Default config file location when neither `--config` nor `HOSTPROV_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostprov/config.yaml";

pub const MIN_SECRET_LENGTH: usize = 8;
pub const MAX_SECRET_LENGTH: usize = 128;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `/etc/hostprov/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Run policy when `--policy` is not given.
    pub policy: FailurePolicy,
    /// Per-step timeout in seconds; `0` disables it.
    pub step_timeout_secs: u64,
    /// Parent directory of the site web root.
    pub web_root_base: String,
    pub credentials: CredentialConfig,
    pub accounts: AccountsConfig,
    pub ssh: SshConfig,
    pub node: NodeConfig,
    pub renewal: RenewalConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::Abort,
            step_timeout_secs: 1800,
            web_root_base: "/var/www".to_string(),
            credentials: CredentialConfig::default(),
            accounts: AccountsConfig::default(),
            ssh: SshConfig::default(),
            node: NodeConfig::default(),
            renewal: RenewalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub length: usize,
    pub alphabet: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_SECRET_LENGTH,
            alphabet: ALPHANUMERIC.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    pub ftp_user: String,
    pub ssh_user: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            ftp_user: "ftpuser".to_string(),
            ssh_user: "deploy".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub port: u16,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self { port: 22 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node.js major version installed from NodeSource.
    pub major: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { major: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalConfig {
    /// Five-field cron schedule for `certbot renew`.
    pub schedule: String,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            schedule: "0 3 * * *".to_string(),
        }
    }
}

impl ProvisionConfig {
    /// Per-step timeout, `None` when disabled.
    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_secs > 0).then(|| Duration::from_secs(self.step_timeout_secs))
    }

    #[must_use]
    pub fn secret_spec(&self) -> SecretSpec {
        SecretSpec::new(self.credentials.length, &self.credentials.alphabet)
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        validate_secret_length(self.credentials.length)?;
        validate_alphabet(&self.credentials.alphabet)?;
        validate_username("accounts.ftp_user", &self.accounts.ftp_user)?;
        validate_username("accounts.ssh_user", &self.accounts.ssh_user)?;
        if self.accounts.ftp_user == self.accounts.ssh_user {
            return Err(invalid(
                "accounts.ssh_user",
                &self.accounts.ssh_user,
                "a name different from accounts.ftp_user",
            ));
        }
        if self.ssh.port == 0 {
            return Err(invalid("ssh.port", "0", "a port between 1 and 65535"));
        }
        if self.node.major == 0 {
            return Err(invalid("node.major", "0", "a Node.js major version such as 20"));
        }
        validate_cron_schedule(&self.renewal.schedule)?;
        if !self.web_root_base.starts_with('/') || self.web_root_base.contains(char::is_whitespace)
        {
            return Err(invalid(
                "web_root_base",
                &self.web_root_base,
                "an absolute path without whitespace",
            ));
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

fn invalid(key: &str, value: &str, expected: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

/// # Errors
///
/// Returns an error if `length` is outside the supported range.
pub fn validate_secret_length(length: usize) -> Result<()> {
    if !(MIN_SECRET_LENGTH..=MAX_SECRET_LENGTH).contains(&length) {
        return Err(invalid(
            "credentials.length",
            &length.to_string(),
            &format!("{MIN_SECRET_LENGTH}..={MAX_SECRET_LENGTH}"),
        ));
    }
    Ok(())
}

/// The alphabet must be printable ASCII without whitespace or `:`, which
/// would break the `user:password` line fed to `chpasswd`.
///
/// # Errors
///
/// Returns an error if the alphabet is too small, has duplicates, or
/// contains a forbidden character.
pub fn validate_alphabet(alphabet: &str) -> Result<()> {
    let bad = alphabet
        .chars()
        .any(|c| !c.is_ascii_graphic() || c == ':');
    let mut sorted: Vec<char> = alphabet.chars().collect();
    sorted.sort_unstable();
    sorted.dedup();
    if bad || sorted.len() != alphabet.len() || sorted.len() < 10 {
        return Err(invalid(
            "credentials.alphabet",
            alphabet,
            "at least 10 distinct printable ASCII characters, no ':' or whitespace",
        ));
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if `name` is not a portable Linux user name.
pub fn validate_username(key: &str, name: &str) -> Result<()> {
    if !USERNAME_RE.is_match(name) {
        return Err(invalid(key, name, "^[a-z_][a-z0-9_-]{0,31}$"));
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if `schedule` is not five cron fields.
pub fn validate_cron_schedule(schedule: &str) -> Result<()> {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    let ok = fields.len() == 5
        && fields
            .iter()
            .all(|f| f.chars().all(|c| c.is_ascii_digit() || "*/,-".contains(c)));
    if !ok {
        return Err(invalid(
            "renewal.schedule",
            schedule,
            "five cron fields such as '0 3 * * *'",
        ));
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
