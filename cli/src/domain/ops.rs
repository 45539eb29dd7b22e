//! Builders for idempotent host operations.
//!
//! Each function returns a `Step` whose command can be re-run against a host
//! already in the target state without failing. Paths and values are passed
//! as positional parameters to `sh -c`, never spliced into the script text.

use crate::domain::step::{Input, Step};

/// `useradd` exit code for "user already exists".
pub const USERADD_EXISTS: i32 = 9;

/// Exit code of `insert_after_anchor` and `delete_matching_lines` when the
/// file to edit (or the anchor line in it) is missing.
pub const EXIT_EDIT_TARGET_MISSING: i32 = 3;

const INSTALL_FILE: &str = r#"set -eu
target="$1"; mode="$2"
dir=$(dirname "$target")
mkdir -p "$dir"
tmp=$(mktemp "$dir/.hostprov.XXXXXX")
trap 'rm -f "$tmp"' EXIT
cat > "$tmp"
chmod "$mode" "$tmp"
mv -f "$tmp" "$target"
trap - EXIT"#;

const BACKUP_ONCE: &str = r#"set -eu
[ -e "$1" ] || exit 0
[ -e "$1.bak" ] && exit 0
cp -p "$1" "$1.bak""#;

const APPEND_CRON: &str = r#"set -eu
current=$(crontab -l 2>/dev/null || true)
printf '%s\n' "$current" | grep -qxF -- "$1" && exit 0
{ [ -n "$current" ] && printf '%s\n' "$current"; printf '%s\n' "$1"; } | crontab -"#;

const ENSURE_LINE: &str = r#"set -eu
touch "$1"
grep -qxF -- "$2" "$1" && exit 0
printf '%s\n' "$2" >> "$1""#;

const INSERT_AFTER_ANCHOR: &str = r#"set -eu
file="$1"; anchor="$2"; marker="$3"
[ -e "$file" ] || { echo "file not found: $file" >&2; exit 3; }
grep -qF -- "$marker" "$file" && exit 0
grep -qF -- "$anchor" "$file" || { echo "anchor not found in $file: $anchor" >&2; exit 3; }
tmp=$(mktemp "$file.XXXXXX")
trap 'rm -f "$tmp"' EXIT
awk -v anchor="$anchor" 'FNR == NR { buf = buf $0 "\n"; next } { print } !done && index($0, anchor) { printf "%s", buf; done = 1 }' - "$file" > "$tmp"
chmod 644 "$tmp"
mv -f "$tmp" "$file"
trap - EXIT"#;

const DELETE_MATCHING: &str = r#"set -eu
file="$1"; pattern="$2"
[ -e "$file" ] || { echo "file not found: $file" >&2; exit 3; }
grep -qF -- "$pattern" "$file" || exit 0
tmp=$(mktemp "$file.XXXXXX")
trap 'rm -f "$tmp"' EXIT
grep -vF -- "$pattern" "$file" > "$tmp" || true
chmod 644 "$tmp"
mv -f "$tmp" "$file"
trap - EXIT"#;

/// Run `script` with `sh -c`, passing `args` as `$1`, `$2`, ...
#[must_use]
pub fn shell(name: &str, script: &str, args: &[&str]) -> Step {
    let mut argv = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    argv.extend(args.iter().map(|a| (*a).to_string()));
    Step::exec(name, "sh", argv)
}

/// Write `contents` to `path` atomically (temp file in the same directory,
/// then rename).
#[must_use]
pub fn install_file(name: &str, path: &str, contents: &str, mode: &str) -> Step {
    shell(name, INSTALL_FILE, &[path, mode]).with_input(Input::Bytes(contents.as_bytes().to_vec()))
}

/// Copy `path` to `path.bak` unless a backup already exists or there is
/// nothing to back up.
#[must_use]
pub fn backup_once(name: &str, path: &str) -> Step {
    shell(name, BACKUP_ONCE, &[path])
}

/// Point `link` at `target`, replacing any existing link.
#[must_use]
pub fn symlink(name: &str, target: &str, link: &str) -> Step {
    Step::exec(name, "ln", ["-sfn", target, link])
}

#[must_use]
pub fn remove_file(name: &str, path: &str) -> Step {
    Step::exec(name, "rm", ["-f", path])
}

/// Append `line` to root's crontab unless an identical line is present.
/// Existing entries are kept.
#[must_use]
pub fn append_cron_line(name: &str, line: &str) -> Step {
    shell(name, APPEND_CRON, &[line])
}

/// Append `line` to `path` unless an identical line is present.
#[must_use]
pub fn ensure_line(name: &str, path: &str, line: &str) -> Step {
    shell(name, ENSURE_LINE, &[path, line])
}

/// Insert `snippet` after the first line of `path` containing `anchor`.
///
/// No-op when `marker` already appears in the file. Exits with
/// [`EXIT_EDIT_TARGET_MISSING`] when the file or the anchor is absent.
#[must_use]
pub fn insert_after_anchor(name: &str, path: &str, anchor: &str, marker: &str, snippet: &str) -> Step {
    shell(name, INSERT_AFTER_ANCHOR, &[path, anchor, marker])
        .with_input(Input::Bytes(snippet.as_bytes().to_vec()))
}

/// Remove every line of `path` containing `pattern`. No-op when none does;
/// exits with [`EXIT_EDIT_TARGET_MISSING`] when `path` does not exist.
#[must_use]
pub fn delete_matching_lines(name: &str, path: &str, pattern: &str) -> Step {
    shell(name, DELETE_MATCHING, &[path, pattern])
}

/// `useradd`, treating "already exists" as success.
#[must_use]
pub fn create_user(name: &str, user: &str, extra: &[&str]) -> Step {
    let mut args: Vec<&str> = extra.to_vec();
    args.push(user);
    Step::exec(name, "useradd", args).accept_codes(&[USERADD_EXISTS])
}

/// Set a password from the credential generated under `label`.
#[must_use]
pub fn set_password(name: &str, label: &str) -> Step {
    Step::exec(name, "chpasswd", Vec::<String>::new()).with_input(Input::Credential {
        label: label.to_string(),
    })
}

/// Non-interactive `apt-get` invocation.
#[must_use]
pub fn apt_get(name: &str, args: &[&str]) -> Step {
    let mut argv = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get"];
    argv.extend_from_slice(args);
    Step::exec(name, "env", argv)
}

#[must_use]
pub fn systemctl(name: &str, verb: &str, unit: &str) -> Step {
    Step::exec(name, "systemctl", [verb, unit])
}
