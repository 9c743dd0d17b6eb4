use super::PublishArgs;
use crate::error::{BumpError, Result};
use crate::github::ContentSource;
use crate::steps::msbuild::{MsbuildJob, MsbuildOutcome, run_msbuild_bump};
use crate::steps::publish::PublishOutcome;
use crate::vcs::GitWorkdir;
use crate::verify::{parse_pr_number, preflight_publish, validate_repo_slug};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct BumpMsbuildArgs {
    /// Specific pull request to update instead of searching for one
    ///
    /// The mono branch is then taken from the pull request's base branch.
    #[arg(value_name = "PR_NUMBER")]
    pub pr_number: Option<String>,

    /// Mono repository
    #[arg(long, default_value = "mono/mono")]
    pub mono_repo: String,

    /// Mono branch to bump
    #[arg(long, short = 'm', default_value = "master")]
    pub mono_branch: String,

    /// msbuild repository
    #[arg(long, default_value = "mono/msbuild")]
    pub msbuild_repo: String,

    /// msbuild branch or commit sha to track
    #[arg(long, short = 's', default_value = "xplat-master")]
    pub msbuild_branch: String,

    /// Mono working directory the bump is committed in
    #[arg(long, value_name = "DIR")]
    pub mono_working_dir: Option<PathBuf>,

    #[command(flatten)]
    pub publish: PublishArgs,
}

impl BumpMsbuildArgs {
    pub fn job(&self) -> Result<MsbuildJob> {
        Ok(MsbuildJob {
            mono_repo: self.mono_repo.clone(),
            mono_branch: self.mono_branch.clone(),
            msbuild_repo: self.msbuild_repo.clone(),
            msbuild_branch: self.msbuild_branch.clone(),
            pr_number: self.pr_number.as_deref().map(parse_pr_number).transpose()?,
            publish: self.publish.settings(&self.mono_repo)?,
        })
    }
}

pub fn execute(args: BumpMsbuildArgs) -> Result<()> {
    let Some(workdir) = &args.mono_working_dir else {
        return Err(BumpError::InvalidOption(
            "--mono-working-dir".to_string(),
            "--mono-working-dir required".to_string(),
        ));
    };

    validate_repo_slug("--msbuild-repo", &args.msbuild_repo)?;
    preflight_publish(
        &args.publish,
        "--mono-repo",
        &args.mono_repo,
        "--mono-working-dir",
        workdir,
    )?;
    let job = args.job()?;

    let client = args.publish.client()?;
    let vcs = GitWorkdir::open(workdir, job.publish.dry_run)?;

    let source: &dyn ContentSource = &client;
    let outcome = match run_msbuild_bump(source, &client, &vcs, &job) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return Err(e);
        }
    };

    if let MsbuildOutcome::Published { outcome, notes } = outcome {
        outcome.print();
        if let Some(notes) = notes {
            notes.print();
        }
        if let PublishOutcome::CreateFailed(reason) = outcome {
            return Err(BumpError::PullRequest(reason));
        }
    }

    Ok(())
}
