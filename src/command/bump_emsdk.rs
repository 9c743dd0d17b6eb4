use super::PublishArgs;
use crate::error::{BumpError, Result};
use crate::github::ContentSource;
use crate::steps::emsdk::{EmsdkJob, EmsdkOutcome, IMAGE_INFO_PATH, PLATFORM_MATRIX_PATH, run_emsdk_bump};
use crate::steps::publish::PublishOutcome;
use crate::vcs::GitWorkdir;
use crate::verify::{preflight_publish, validate_repo_slug};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct BumpEmsdkArgs {
    /// Repository publishing the docker image info
    #[arg(long, default_value = "dotnet/versions")]
    pub versions_repo: String,

    /// Branch or commit sha of the versions repository
    #[arg(long, short = 'm', default_value = "master")]
    pub versions_branch: String,

    /// Image info file in the versions repository
    #[arg(long, default_value = IMAGE_INFO_PATH)]
    pub image_info_path: String,

    /// Runtime repository
    #[arg(long, default_value = "dotnet/runtime")]
    pub runtime_repo: String,

    /// Runtime branch to bump
    #[arg(long, short = 's', default_value = "master")]
    pub runtime_branch: String,

    /// Runtime working directory the bump is committed in
    #[arg(long, value_name = "DIR")]
    pub runtime_working_dir: Option<PathBuf>,

    /// Pipeline file naming the image
    #[arg(long, default_value = PLATFORM_MATRIX_PATH)]
    pub platform_path: String,

    /// Emscripten version, for the commit message and pull request title
    #[arg(long, default_value = "")]
    pub emsdk_ver: String,

    #[command(flatten)]
    pub publish: PublishArgs,
}

impl BumpEmsdkArgs {
    pub fn job(&self) -> Result<EmsdkJob> {
        Ok(EmsdkJob {
            versions_repo: self.versions_repo.clone(),
            versions_branch: self.versions_branch.clone(),
            image_info_path: self.image_info_path.clone(),
            runtime_repo: self.runtime_repo.clone(),
            runtime_branch: self.runtime_branch.clone(),
            platform_path: self.platform_path.clone(),
            emsdk_version: self.emsdk_ver.trim().to_string(),
            publish: self.publish.settings(&self.runtime_repo)?,
        })
    }
}

pub fn execute(args: BumpEmsdkArgs) -> Result<()> {
    let Some(workdir) = &args.runtime_working_dir else {
        return Err(BumpError::InvalidOption(
            "--runtime-working-dir".to_string(),
            "--runtime-working-dir required".to_string(),
        ));
    };

    validate_repo_slug("--versions-repo", &args.versions_repo)?;
    preflight_publish(
        &args.publish,
        "--runtime-repo",
        &args.runtime_repo,
        "--runtime-working-dir",
        workdir,
    )?;
    let job = args.job()?;

    let client = args.publish.client()?;
    let vcs = GitWorkdir::open(workdir, job.publish.dry_run)?;

    let source: &dyn ContentSource = &client;
    match run_emsdk_bump(source, &client, &vcs, &job) {
        Ok(EmsdkOutcome::UpToDate) => Ok(()),
        Ok(EmsdkOutcome::Published(outcome)) => {
            outcome.print();
            match outcome {
                PublishOutcome::CreateFailed(reason) => Err(BumpError::PullRequest(reason)),
                _ => Ok(()),
            }
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_defaults() {
        let args =
            BumpEmsdkArgs::try_parse_from(["bump-emsdk", "--git-user-name", "radical", "-n"]).unwrap();
        let job = args.job().unwrap();

        assert_eq!(job.versions_repo, "dotnet/versions");
        assert_eq!(job.image_info_path, IMAGE_INFO_PATH);
        assert_eq!(job.runtime_repo, "dotnet/runtime");
        assert_eq!(job.platform_path, PLATFORM_MATRIX_PATH);
        assert_eq!(job.emsdk_version, "");
        assert_eq!(job.publish.fork_repo, "radical/runtime");
        assert!(job.publish.dry_run);
    }

    #[test]
    fn test_missing_working_dir() {
        let args = BumpEmsdkArgs::try_parse_from(["bump-emsdk", "--git-user-name", "radical"]).unwrap();
        assert!(matches!(
            execute(args),
            Err(BumpError::InvalidOption(ref option, _)) if option == "--runtime-working-dir"
        ));
    }
}
