//! `git` working copy driven through the command line.

use super::VersionControl;
use crate::error::{BumpError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A local clone that bump branches are prepared, committed and pushed from.
#[derive(Debug, Clone)]
pub struct GitWorkdir {
    root: PathBuf,
    dry_run: bool,
}

impl GitWorkdir {
    /// Opens the working copy at `root`.
    ///
    /// Fails when `git` is not installed or `root` is not inside a repository.
    pub fn open(root: impl Into<PathBuf>, dry_run: bool) -> Result<Self> {
        let root = root.into();
        let workdir = Self { root, dry_run };
        workdir.git(&["rev-parse", "--git-dir"]).map_err(|e| {
            BumpError::InvalidOption(
                workdir.root.display().to_string(),
                format!("not a git working copy ({})", e),
            )
        })?;
        Ok(workdir)
    }

    /// Runs `git` with `args` in the working copy and returns its stdout.
    fn git(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        log::debug!("$ {} (in {})", command, self.root.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| BumpError::Vcs {
                command: command.clone(),
                code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(BumpError::Vcs {
                command,
                code: output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            });
        }

        if !stdout.trim().is_empty() {
            log::debug!("{}", stdout.trim_end());
        }
        Ok(stdout)
    }

    fn local_branch_exists(&self, branch: &str) -> bool {
        self.git(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{}", branch),
        ])
        .is_ok()
    }

    /// Commit currently checked out.
    fn head(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }
}

impl VersionControl for GitWorkdir {
    fn root(&self) -> &Path {
        &self.root
    }

    fn prepare_working_directory(
        &self,
        remote: &str,
        remote_branch: &str,
        local_branch: &str,
    ) -> Result<()> {
        log::info!(
            "Preparing {} on {}/{}",
            local_branch,
            remote,
            remote_branch
        );

        self.git(&["reset", "--hard"])?;
        self.git(&["clean", "-fd"])?;
        self.git(&["fetch", remote])?;

        let upstream = format!("{}/{}", remote, remote_branch);
        if self.local_branch_exists(local_branch) {
            self.git(&["checkout", local_branch])?;
            self.git(&["reset", "--hard", &upstream])?;
        } else {
            self.git(&["checkout", "-b", local_branch, &upstream])?;
        }

        Ok(())
    }

    fn stage_file(&self, path: &Path) -> Result<()> {
        let relative = pathdiff::diff_paths(path, &self.root).unwrap_or_else(|| path.to_path_buf());
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.git(&["add", "--", &relative])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-m", message])?;
        log::info!("Committed {}", self.head()?);
        Ok(())
    }

    fn push(&self, remote: &str, local_branch: &str, remote_branch: &str) -> Result<()> {
        let refspec = format!("{}:{}", local_branch, remote_branch);
        if self.dry_run {
            self.git(&["push", "--dry-run", remote, &refspec])?;
        } else {
            self.git(&["push", remote, &refspec])?;
        }
        log::info!("Pushed {} to {}/{}", local_branch, remote, remote_branch);
        Ok(())
    }
}
