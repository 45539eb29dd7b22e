//! Application service: the ordered provisioning plan for one site.
//!
//! Pure step construction: nothing here touches the host. The order is
//! significant, later groups rely on artifacts produced by earlier ones
//! (the site must exist before Certbot rewrites it, the web root before the
//! FTP account is chrooted into it).

use anyhow::{Context, Result};

use crate::domain::ops;
use crate::domain::template::{self, TemplateVars};
use crate::domain::{ProvisionConfig, SiteParams, Step};

pub const STEP_ISSUE_CERTIFICATE: &str = "issue TLS certificate";
pub const STEP_INSERT_HARDENING: &str = "insert TLS hardening";
pub const STEP_DELETE_CERTBOT_OPTIONS: &str = "remove conflicting Certbot options";

/// Anchor line Certbot writes into the HTTPS listener.
pub const CERTBOT_LISTEN_ANCHOR: &str = "listen 443 ssl; # managed by Certbot";
/// Certbot include whose directives clash with the hardening snippet.
pub const CERTBOT_OPTIONS_INCLUDE: &str = "include /etc/letsencrypt/options-ssl-nginx.conf;";
/// First line of the hardening snippet; its presence means "already applied".
pub const HARDENING_MARKER: &str = "# hostprov: tls hardening";

pub const FTP_CREDENTIAL: &str = "ftp";
pub const SSH_CREDENTIAL: &str = "ssh";

const BASE_PACKAGES: &[&str] = &[
    "nginx",
    "certbot",
    "python3-certbot-nginx",
    "ufw",
    "vsftpd",
    "ffmpeg",
    "curl",
    "ca-certificates",
    "cron",
    "logrotate",
];

const NODESOURCE_SETUP: &str = r#"set -eu
if command -v node >/dev/null 2>&1 && node --version | grep -q "^v$1\."; then exit 0; fi
curl -fsSL "https://deb.nodesource.com/setup_$1.x" | bash -"#;

/// Build the full step list for `params` under `config`.
///
/// # Errors
///
/// Returns an error if a configuration template cannot be rendered.
pub fn build_plan(params: &SiteParams, config: &ProvisionConfig) -> Result<Vec<Step>> {
    let vars = TemplateVars::for_site(params, config);
    let mut steps = Vec::new();
    steps.extend(packages());
    steps.extend(nodejs(config));
    steps.extend(web_root(params, config));
    steps.extend(nginx_site(params, &vars)?);
    steps.extend(firewall(config));
    steps.extend(tls(params, config, &vars)?);
    steps.extend(ftp(params, config, &vars)?);
    steps.extend(ssh(config, &vars)?);
    steps.extend(logging(&vars)?);
    Ok(steps)
}

fn group(name: &str, steps: Vec<Step>) -> Vec<Step> {
    steps.into_iter().map(|s| s.in_group(name)).collect()
}

fn render(t: &template::Template, vars: &TemplateVars) -> Result<String> {
    template::render(t, vars).with_context(|| format!("rendering {}", t.name))
}

#[must_use]
pub fn site_path(params: &SiteParams) -> String {
    format!("/etc/nginx/sites-available/{}", params.domain)
}

fn packages() -> Vec<Step> {
    let mut install = vec!["install", "-y", "--no-install-recommends"];
    install.extend_from_slice(BASE_PACKAGES);
    group(
        "packages",
        vec![
            ops::apt_get("refresh package index", &["update"]),
            ops::apt_get("install base packages", &install),
        ],
    )
}

fn nodejs(config: &ProvisionConfig) -> Vec<Step> {
    let major = config.node.major.to_string();
    group(
        "nodejs",
        vec![
            ops::shell("add NodeSource repository", NODESOURCE_SETUP, &[&major]),
            ops::apt_get("install Node.js", &["install", "-y", "nodejs"]),
        ],
    )
}

fn web_root(params: &SiteParams, config: &ProvisionConfig) -> Vec<Step> {
    let root = params.web_root(&config.web_root_base);
    group(
        "web root",
        vec![
            Step::exec("create web root", "mkdir", ["-p", root.as_str()]),
            Step::exec(
                "set web root ownership",
                "chown",
                ["-R", "www-data:www-data", root.as_str()],
            ),
            Step::exec("set web root permissions", "chmod", ["2775", root.as_str()]),
        ],
    )
}

fn nginx_site(params: &SiteParams, vars: &TemplateVars) -> Result<Vec<Step>> {
    let available = site_path(params);
    let enabled = format!("/etc/nginx/sites-enabled/{}", params.domain);
    let site = render(&template::NGINX_SITE, vars)?;
    Ok(group(
        "nginx",
        vec![
            ops::install_file("write nginx site", &available, &site, "644"),
            ops::symlink("enable nginx site", &available, &enabled),
            ops::remove_file("disable default site", "/etc/nginx/sites-enabled/default"),
            Step::exec("check nginx configuration", "nginx", ["-t"]),
            ops::systemctl("enable nginx", "enable", "nginx"),
            ops::systemctl("reload nginx", "reload-or-restart", "nginx"),
        ],
    ))
}

fn firewall(config: &ProvisionConfig) -> Vec<Step> {
    let ssh_rule = format!("{}/tcp", config.ssh.port);
    group(
        "firewall",
        vec![
            Step::exec("allow SSH", "ufw", ["allow", ssh_rule.as_str()]),
            Step::exec("allow HTTP and HTTPS", "ufw", ["allow", "Nginx Full"]),
            Step::exec("allow FTP", "ufw", ["allow", "20:21/tcp"]),
            Step::exec("allow passive FTP", "ufw", ["allow", "40000:50000/tcp"]),
            Step::exec("enable firewall", "ufw", ["--force", "enable"]),
        ],
    )
}

fn tls(params: &SiteParams, config: &ProvisionConfig, vars: &TemplateVars) -> Result<Vec<Step>> {
    let site = site_path(params);
    let hardening = render(&template::TLS_HARDENING, vars)?;
    let cron = format!(
        "{} certbot renew --quiet --post-hook \"systemctl reload nginx\"",
        config.renewal.schedule
    );
    Ok(group(
        "tls",
        vec![
            Step::exec(
                STEP_ISSUE_CERTIFICATE,
                "certbot",
                [
                    "--nginx",
                    "-d",
                    params.domain.as_str(),
                    "--non-interactive",
                    "--agree-tos",
                    "-m",
                    params.email.as_str(),
                    "--redirect",
                    "--keep-until-expiring",
                ],
            ),
            ops::insert_after_anchor(
                STEP_INSERT_HARDENING,
                &site,
                CERTBOT_LISTEN_ANCHOR,
                HARDENING_MARKER,
                &hardening,
            ),
            ops::delete_matching_lines(STEP_DELETE_CERTBOT_OPTIONS, &site, CERTBOT_OPTIONS_INCLUDE),
            Step::exec("check hardened nginx configuration", "nginx", ["-t"]),
            ops::systemctl("reload hardened nginx", "reload", "nginx"),
            ops::append_cron_line("schedule certificate renewal", &cron),
            Step::exec("verify certificate renewal", "certbot", ["renew", "--dry-run", "--quiet"])
                .best_effort(),
        ],
    ))
}

fn ftp(params: &SiteParams, config: &ProvisionConfig, vars: &TemplateVars) -> Result<Vec<Step>> {
    let user = config.accounts.ftp_user.as_str();
    let root = params.web_root(&config.web_root_base);
    let vsftpd = render(&template::VSFTPD_CONFIG, vars)?;
    Ok(group(
        "ftp",
        vec![
            Step::generate_secret(
                "generate FTP password",
                FTP_CREDENTIAL,
                user,
                config.secret_spec(),
            ),
            ops::create_user(
                "create FTP user",
                user,
                &["-d", root.as_str(), "-s", "/usr/sbin/nologin", "-G", "www-data"],
            ),
            ops::set_password("set FTP password", FTP_CREDENTIAL),
            ops::ensure_line("register nologin shell", "/etc/shells", "/usr/sbin/nologin"),
            ops::install_file(
                "write vsftpd user list",
                "/etc/vsftpd.userlist",
                &format!("{user}\n"),
                "644",
            ),
            ops::backup_once("back up vsftpd.conf", "/etc/vsftpd.conf"),
            ops::install_file("write vsftpd.conf", "/etc/vsftpd.conf", &vsftpd, "644"),
            ops::systemctl("enable vsftpd", "enable", "vsftpd"),
            ops::systemctl("restart vsftpd", "restart", "vsftpd"),
        ],
    ))
}

fn ssh(config: &ProvisionConfig, vars: &TemplateVars) -> Result<Vec<Step>> {
    let user = config.accounts.ssh_user.as_str();
    let sshd = render(&template::SSHD_CONFIG, vars)?;
    Ok(group(
        "ssh",
        vec![
            Step::generate_secret(
                "generate SSH password",
                SSH_CREDENTIAL,
                user,
                config.secret_spec(),
            ),
            ops::create_user("create SSH user", user, &["-m", "-s", "/bin/bash"]),
            ops::set_password("set SSH password", SSH_CREDENTIAL),
            Step::exec("grant sudo to SSH user", "usermod", ["-aG", "sudo", user]),
            ops::backup_once("back up sshd_config", "/etc/ssh/sshd_config"),
            ops::install_file("write sshd_config", "/etc/ssh/sshd_config", &sshd, "644"),
            Step::exec("check sshd configuration", "sshd", ["-t"]),
            ops::systemctl("restart ssh", "restart", "ssh"),
        ],
    ))
}

fn logging(vars: &TemplateVars) -> Result<Vec<Step>> {
    let logrotate = render(&template::LOGROTATE_NGINX, vars)?;
    Ok(group(
        "logging",
        vec![
            ops::install_file(
                "write logrotate config",
                "/etc/logrotate.d/nginx-custom",
                &logrotate,
                "644",
            ),
            Step::exec(
                "check logrotate config",
                "logrotate",
                ["--debug", "/etc/logrotate.d/nginx-custom"],
            ),
        ],
    ))
}
