//! Pre-flight checks performed before a bump touches a working copy.
//!
//! Unlike `rules`, these functions may perform I/O (checking git status,
//! verifying directories exist, etc.).

use crate::command::PublishArgs;
use crate::error::{BumpError, Result};
use crate::verify::rules::validate_repo_slug;
use std::path::Path;
use std::process::Command;

/// Checks that `path` is an existing directory.
pub fn check_working_dir(option: &str, path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(BumpError::InvalidOption(
            option.to_string(),
            format!("{} is not a directory", path.display()),
        ));
    }
    Ok(())
}

/// Checks if the git working directory has uncommitted **tracked** changes.
///
/// Preparing a bump resets the working copy, so tracked changes would be lost.
/// Untracked files are ignored.
///
/// # Behavior
///
/// - Returns `Err(InvalidOption)` if tracked files have uncommitted changes
/// - Returns `Ok(())` if the working copy is clean
/// - Returns `Ok(())` if git is not installed or the status cannot be read
pub fn check_git_status(option: &str, root: &Path) -> Result<()> {
    match Command::new("git")
        .args(["status", "--porcelain", "-uno"])
        .current_dir(root)
        .output()
    {
        Ok(output) if output.status.success() => {
            if !output.stdout.is_empty() {
                let status = String::from_utf8_lossy(&output.stdout);
                let modified_files: Vec<_> =
                    status.lines().take(5).map(|line| line.trim()).collect();

                log::warn!("Uncommitted changes detected:");
                for file in &modified_files {
                    log::warn!("  {}", file);
                }
                if status.lines().count() > 5 {
                    log::warn!("  ... and {} more files", status.lines().count() - 5);
                }

                return Err(BumpError::InvalidOption(
                    option.to_string(),
                    format!(
                        "{} has uncommitted changes that the bump would discard",
                        root.display()
                    ),
                ));
            }
            Ok(())
        }
        Ok(output) => {
            log::warn!(
                "Git status command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            Ok(())
        }
        Err(e) => {
            log::warn!("Failed to execute git status: {}", e);
            Ok(())
        }
    }
}

/// Validation shared by every command that commits, pushes and opens pull requests.
///
/// # Checks Performed
///
/// 1. Upstream repository slug is well formed
/// 2. Working directory exists
/// 3. Remote name and user name are given
/// 4. A token is available unless `--dry-run`
/// 5. The working copy is clean (unless `--allow-dirty`)
///
/// # Errors
///
/// Returns the first validation error encountered. Nothing is modified.
pub fn preflight_publish(
    args: &PublishArgs,
    upstream_option: &str,
    upstream_repo: &str,
    workdir_option: &str,
    workdir: &Path,
) -> Result<()> {
    validate_repo_slug(upstream_option, upstream_repo)?;
    check_working_dir(workdir_option, workdir)?;
    args.validate()?;

    if !args.allow_dirty
        && let Err(e) = check_git_status(workdir_option, workdir)
    {
        log::info!("Hint: Use --allow-dirty to bypass this check");
        return Err(e);
    }

    Ok(())
}
