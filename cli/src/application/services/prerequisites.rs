//! Application service: checks that must pass before any step runs.

use crate::application::ports::CommandRunner;
use crate::domain::ProvisionError;

/// Fail unless the process runs with an effective UID of 0.
///
/// The probe goes through the `CommandRunner` (`id -u`) so it can be
/// stubbed in tests like every other host interaction.
///
/// # Errors
///
/// Returns `ProvisionError::PrerequisiteMissing` when not running as root or
/// when the UID cannot be determined.
pub async fn ensure_root(runner: &impl CommandRunner) -> Result<(), ProvisionError> {
    let result = runner.run("id", &["-u"], None).await;
    if !result.success() {
        return Err(ProvisionError::PrerequisiteMissing(format!(
            "cannot determine the current user (id -u exited {})",
            result.exit_code
        )));
    }
    let uid = String::from_utf8_lossy(&result.stdout).trim().to_string();
    if uid != "0" {
        return Err(ProvisionError::PrerequisiteMissing(
            "hostprov must be run as root (try: sudo hostprov ...)".to_string(),
        ));
    }
    Ok(())
}
