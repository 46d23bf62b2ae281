//! Commit creation via the git CLI.
//!
//! Shelling out keeps the user's hooks, signing and identity configuration in
//! effect, which git2 commits would bypass.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::ReviewError;

/// Run a git command inside `workdir`, mapping failures to
/// [`ReviewError::CommitFailed`].
fn run_git(workdir: &Path, args: &[&str], operation: &str) -> Result<String, ReviewError> {
    let output = Command::new("git")
        .current_dir(workdir)
        .args(args)
        .output()
        .map_err(|e| ReviewError::CommitFailed(format!("Failed to run git {}: {}", operation, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        return Err(ReviewError::CommitFailed(format!(
            "git {} failed: {}",
            operation,
            detail.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Commit the staged changes with `subject` and an optional `body`.
///
/// Equivalent to `git commit -m <subject> [-m <body>]`; git joins the two
/// with a blank line.
pub fn commit_staged(workdir: &Path, subject: &str, body: Option<&str>) -> Result<(), ReviewError> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(ReviewError::EmptySubject);
    }

    let mut args = vec!["commit", "-m", subject];
    if let Some(body) = body.map(str::trim).filter(|b| !b.is_empty()) {
        args.push("-m");
        args.push(body);
    }

    let output = run_git(workdir, &args, "commit")?;
    debug!("git commit: {}", output.trim());
    Ok(())
}
