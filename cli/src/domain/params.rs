//! Positional site parameters and their validation.
//!
//! Every value here ends up inside configuration files and command lines, so
//! it is checked against a strict pattern before any step is built.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::error::ParamError;

/// Hostname: dot-separated labels, at least two, no leading/trailing hyphen.
pub static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("valid regex")
});

/// `host:port` where host is a hostname, an IPv4 address, or a bracketed IPv6.
pub static UPSTREAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(?:\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?):([0-9]{1,5})$")
        .expect("valid regex")
});

pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9._%+-]+@(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,63}$").expect("valid regex")
});

/// Validated `<domain> <upstream> <email>` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteParams {
    pub domain: String,
    pub upstream: String,
    pub email: String,
}

impl SiteParams {
    /// Validate and build the parameter set.
    ///
    /// # Errors
    ///
    /// Returns a `ParamError` naming the first invalid value.
    pub fn new(domain: &str, upstream: &str, email: &str) -> Result<Self, ParamError> {
        if domain.len() > 253 || !DOMAIN_RE.is_match(domain) {
            return Err(ParamError::InvalidDomain(domain.to_string()));
        }
        let port_ok = UPSTREAM_RE
            .captures(upstream)
            .and_then(|c| c.get(1))
            .and_then(|p| p.as_str().parse::<u16>().ok())
            .is_some_and(|p| p != 0);
        if !port_ok {
            return Err(ParamError::InvalidUpstream(upstream.to_string()));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(ParamError::InvalidEmail(email.to_string()));
        }
        Ok(Self {
            domain: domain.to_ascii_lowercase(),
            upstream: upstream.to_string(),
            email: email.to_string(),
        })
    }

    /// Web root for this site under `base`.
    #[must_use]
    pub fn web_root(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.domain)
    }
}
