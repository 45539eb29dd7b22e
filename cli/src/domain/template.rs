//! Embedded configuration templates and literal placeholder substitution.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::config::ProvisionConfig;
use crate::domain::error::TemplateError;
use crate::domain::params::SiteParams;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{[A-Za-z0-9_]*\}\}").expect("valid regex")
});

/// A static configuration file body with `{{NAME}}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub name: &'static str,
    pub body: &'static str,
}

pub const NGINX_SITE: Template = Template {
    name: "nginx-site.conf",
    body: include_str!("../../templates/nginx-site.conf.tmpl"),
};

pub const TLS_HARDENING: Template = Template {
    name: "tls-hardening.conf",
    body: include_str!("../../templates/tls-hardening.conf.tmpl"),
};

pub const SSHD_CONFIG: Template = Template {
    name: "sshd_config",
    body: include_str!("../../templates/sshd_config.tmpl"),
};

pub const VSFTPD_CONFIG: Template = Template {
    name: "vsftpd.conf",
    body: include_str!("../../templates/vsftpd.conf.tmpl"),
};

pub const LOGROTATE_NGINX: Template = Template {
    name: "logrotate-nginx-custom",
    body: include_str!("../../templates/logrotate-nginx-custom.tmpl"),
};

/// Substitution values for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars(Vec<(&'static str, String)>);

impl TemplateVars {
    #[must_use]
    pub fn new(pairs: Vec<(&'static str, String)>) -> Self {
        Self(pairs)
    }

    /// Values every template may reference.
    #[must_use]
    pub fn for_site(params: &SiteParams, config: &ProvisionConfig) -> Self {
        Self(vec![
            ("DOMAIN", params.domain.clone()),
            ("UPSTREAM", params.upstream.clone()),
            ("WEB_ROOT", params.web_root(&config.web_root_base)),
            ("SSH_PORT", config.ssh.port.to_string()),
            ("SSH_USER", config.accounts.ssh_user.clone()),
            ("FTP_USER", config.accounts.ftp_user.clone()),
        ])
    }
}

/// Replace every `{{NAME}}` with its value.
///
/// # Errors
///
/// Returns `TemplateError::UnresolvedPlaceholder` if a placeholder has no
/// value in `vars`.
pub fn render(template: &Template, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = template.body.to_string();
    for (name, value) in &vars.0 {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    if let Some(m) = PLACEHOLDER_RE.find(&out) {
        return Err(TemplateError::UnresolvedPlaceholder {
            template: template.name.to_string(),
            placeholder: m.as_str().to_string(),
        });
    }
    Ok(out)
}
