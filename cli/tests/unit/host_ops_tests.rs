//! Host operation scripts executed for real against a temporary directory.
//!
//! Each operation is run twice: the second run must succeed and leave the
//! file system exactly as the first one did.

#![cfg(unix)]
#![allow(clippy::expect_used)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use hostprov_cli::application::ports::CommandRunner;
use hostprov_cli::application::services::plan::{
    CERTBOT_LISTEN_ANCHOR, CERTBOT_OPTIONS_INCLUDE, HARDENING_MARKER,
};
use hostprov_cli::domain::ops::{self, EXIT_EDIT_TARGET_MISSING};
use hostprov_cli::domain::{Action, ExecResult, Input, Step};
use hostprov_cli::infra::TokioCommandRunner;

const CERTBOT_SITE: &str = "server {
    server_name a.com;
    listen 443 ssl; # managed by Certbot
    ssl_certificate /etc/letsencrypt/live/a.com/fullchain.pem; # managed by Certbot
    include /etc/letsencrypt/options-ssl-nginx.conf; # managed by Certbot
}
";

const HARDENING: &str = "    # hostprov: tls hardening for a.com
    ssl_protocols TLSv1.2 TLSv1.3;
";

const HARDENED_SITE: &str = "server {
    server_name a.com;
    listen 443 ssl; # managed by Certbot
    # hostprov: tls hardening for a.com
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_certificate /etc/letsencrypt/live/a.com/fullchain.pem; # managed by Certbot
}
";

const CRONTAB_STUB: &str = r#"#!/bin/sh
if [ "$1" = "-l" ]; then
  [ -f "$CRONTAB_FILE" ] || { echo "no crontab" >&2; exit 1; }
  cat "$CRONTAB_FILE"
else
  cat > "$CRONTAB_FILE"
fi
"#;

/// Execute `step` through the production runner, with `env` prepended via
/// `env(1)`.
async fn run_step(step: &Step, env: &[(&str, String)]) -> ExecResult {
    let Action::Exec {
        program,
        args,
        input,
    } = &step.action
    else {
        panic!("expected an exec step");
    };
    let stdin = match input {
        None => None,
        Some(Input::Bytes(bytes)) => Some(bytes.as_slice()),
        Some(Input::Credential { .. }) => panic!("credential input is not supported here"),
    };
    let mut argv: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();
    argv.push(program.clone());
    argv.extend(args.iter().cloned());
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    TokioCommandRunner::default().run("env", &argv, stdin).await
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read file")
}

fn assert_ok(result: &ExecResult) {
    assert!(
        result.success(),
        "exit {}: {}",
        result.exit_code,
        String::from_utf8_lossy(&result.stderr)
    );
}

// ─── TLS hardening edit ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_hardening_insert_then_delete_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let site = dir.path().join("a.com");
    fs::write(&site, CERTBOT_SITE).expect("write site");
    let insert = ops::insert_after_anchor(
        "insert",
        path_str(&site),
        CERTBOT_LISTEN_ANCHOR,
        HARDENING_MARKER,
        HARDENING,
    );
    let delete = ops::delete_matching_lines("delete", path_str(&site), CERTBOT_OPTIONS_INCLUDE);

    for _ in 0..2 {
        assert_ok(&run_step(&insert, &[]).await);
        assert_ok(&run_step(&delete, &[]).await);
        assert_eq!(read(&site), HARDENED_SITE);
    }
    assert_eq!(read(&site).matches(HARDENING_MARKER).count(), 1);
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
}

#[tokio::test]
async fn test_insert_without_anchor_fails_and_leaves_file_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let site = dir.path().join("a.com");
    let plain = "server {\n    listen 80;\n}\n";
    fs::write(&site, plain).expect("write site");
    let insert = ops::insert_after_anchor(
        "insert",
        path_str(&site),
        CERTBOT_LISTEN_ANCHOR,
        HARDENING_MARKER,
        HARDENING,
    );

    let result = run_step(&insert, &[]).await;
    assert_eq!(result.exit_code, EXIT_EDIT_TARGET_MISSING);
    assert!(String::from_utf8_lossy(&result.stderr).contains("anchor not found"));
    assert_eq!(read(&site), plain);
}

#[tokio::test]
async fn test_edits_on_missing_file_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let site = dir.path().join("absent");
    let insert = ops::insert_after_anchor(
        "insert",
        path_str(&site),
        CERTBOT_LISTEN_ANCHOR,
        HARDENING_MARKER,
        HARDENING,
    );
    let delete = ops::delete_matching_lines("delete", path_str(&site), CERTBOT_OPTIONS_INCLUDE);

    assert_eq!(run_step(&insert, &[]).await.exit_code, EXIT_EDIT_TARGET_MISSING);
    let result = run_step(&delete, &[]).await;
    assert_eq!(result.exit_code, EXIT_EDIT_TARGET_MISSING);
    assert!(String::from_utf8_lossy(&result.stderr).contains("file not found"));
    assert!(!site.exists());
}

// ─── File operations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_backup_once_keeps_the_first_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("sshd_config");
    let backup = dir.path().join("sshd_config.bak");
    fs::write(&config, "original\n").expect("write config");
    let step = ops::backup_once("backup", path_str(&config));

    assert_ok(&run_step(&step, &[]).await);
    fs::write(&config, "replaced\n").expect("rewrite config");
    assert_ok(&run_step(&step, &[]).await);
    assert_eq!(read(&backup), "original\n");
}

#[tokio::test]
async fn test_backup_once_without_source_is_a_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("vsftpd.conf");
    let step = ops::backup_once("backup", path_str(&config));
    assert_ok(&run_step(&step, &[]).await);
    assert!(!dir.path().join("vsftpd.conf.bak").exists());
}

#[tokio::test]
async fn test_ensure_line_appends_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let shells = dir.path().join("shells");
    fs::write(&shells, "/bin/sh\n/bin/bash\n").expect("write shells");
    let step = ops::ensure_line("shell", path_str(&shells), "/usr/sbin/nologin");

    for _ in 0..2 {
        assert_ok(&run_step(&step, &[]).await);
        assert_eq!(read(&shells), "/bin/sh\n/bin/bash\n/usr/sbin/nologin\n");
    }
}

#[tokio::test]
async fn test_install_file_sets_contents_and_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("conf.d").join("site.conf");
    let step = ops::install_file("install", path_str(&target), "listen 80;\n", "640");

    for _ in 0..2 {
        assert_ok(&run_step(&step, &[]).await);
        assert_eq!(read(&target), "listen 80;\n");
        let mode = fs::metadata(&target).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
    let leftovers = fs::read_dir(target.parent().expect("parent"))
        .expect("read dir")
        .count();
    assert_eq!(leftovers, 1, "temporary file left behind");
}

// ─── Crontab ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_append_cron_line_keeps_entries_and_adds_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).expect("mkdir bin");
    let stub = bin.join("crontab");
    fs::write(&stub, CRONTAB_STUB).expect("write stub");
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).expect("chmod stub");
    let table = dir.path().join("crontab.txt");
    fs::write(&table, "30 1 * * * /usr/local/bin/backup\n").expect("write table");

    let path = format!(
        "{}:{}",
        path_str(&bin),
        std::env::var("PATH").unwrap_or_default()
    );
    let env = [("PATH", path), ("CRONTAB_FILE", path_str(&table).to_string())];
    let line = "0 3 * * * certbot renew --quiet";
    let step = ops::append_cron_line("cron", line);

    for _ in 0..2 {
        assert_ok(&run_step(&step, &env).await);
        assert_eq!(
            read(&table),
            format!("30 1 * * * /usr/local/bin/backup\n{line}\n")
        );
    }
}

#[tokio::test]
async fn test_append_cron_line_creates_empty_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).expect("mkdir bin");
    let stub = bin.join("crontab");
    fs::write(&stub, CRONTAB_STUB).expect("write stub");
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).expect("chmod stub");
    let table = dir.path().join("crontab.txt");

    let path = format!(
        "{}:{}",
        path_str(&bin),
        std::env::var("PATH").unwrap_or_default()
    );
    let env = [("PATH", path), ("CRONTAB_FILE", path_str(&table).to_string())];
    let step = ops::append_cron_line("cron", "0 3 * * * certbot renew");

    assert_ok(&run_step(&step, &env).await);
    assert_ok(&run_step(&step, &env).await);
    assert_eq!(read(&table), "0 3 * * * certbot renew\n");
}
