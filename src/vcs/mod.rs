//! Version control of the local working copy a bump is published from.

pub mod git;

pub use git::GitWorkdir;

use crate::error::Result;
use std::path::Path;

pub trait VersionControl {
    /// Working copy root.
    fn root(&self) -> &Path;

    /// Discards local changes, fetches `remote` and checks out `local_branch`
    /// pointing at `remote/remote_branch`, creating the branch when needed.
    fn prepare_working_directory(
        &self,
        remote: &str,
        remote_branch: &str,
        local_branch: &str,
    ) -> Result<()>;

    fn stage_file(&self, path: &Path) -> Result<()>;

    /// Commits staged changes with the configured identity.
    fn commit(&self, message: &str) -> Result<()>;

    fn push(&self, remote: &str, local_branch: &str, remote_branch: &str) -> Result<()>;
}
