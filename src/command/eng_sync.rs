use super::{PublishArgs, read_only_client};
use crate::error::{BumpError, Result};
use crate::github::ContentSource;
use crate::steps::publish::{self, PublishOutcome};
use crate::steps::pull_request::locate_pull_request;
use crate::steps::sync::{
    Outcome, PACKAGES_PROPS_PATH, SyncJob, SyncPaths, SyncTarget, VERSION_DETAILS_PATH,
    VERSIONS_PROPS_PATH, run_sync,
};
use crate::steps::ENG_BRANCH_PREFIX;
use crate::vcs::GitWorkdir;
use crate::verify::{check_working_dir, preflight_publish, validate_repo_slug};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct EngSyncArgs {
    /// Working copy of the msbuild repository to write the updated manifests into
    ///
    /// Without it the updated documents are printed.
    #[arg(value_name = "MSBUILD_DIR")]
    pub path: Option<PathBuf>,

    /// Toolset repository versions are taken from
    #[arg(long, default_value = "dotnet/toolset")]
    pub toolset_repo: String,

    /// Toolset branch or commit sha to source from
    #[arg(long, default_value = "release/3.1.1xx")]
    pub toolset_branch: String,

    /// msbuild repository to update
    #[arg(long, default_value = "mono/msbuild")]
    pub msbuild_repo: String,

    /// msbuild branch to update
    #[arg(long, default_value = "mono-2019-08")]
    pub msbuild_branch: String,

    /// Property list with version pins
    #[arg(long, default_value = VERSIONS_PROPS_PATH)]
    pub versions_path: String,

    /// Second property list with version pins
    #[arg(long, default_value = PACKAGES_PROPS_PATH)]
    pub packages_path: String,

    /// Dependency list
    #[arg(long, default_value = VERSION_DETAILS_PATH)]
    pub version_details_path: String,

    /// Commit the update, push it and open or update a pull request
    #[arg(long, requires = "path")]
    pub push: bool,

    #[command(flatten)]
    pub publish: PublishArgs,
}

impl EngSyncArgs {
    pub fn job(&self) -> SyncJob {
        SyncJob {
            source_repo: self.toolset_repo.clone(),
            source_branch: self.toolset_branch.clone(),
            target_repo: self.msbuild_repo.clone(),
            target_branch: self.msbuild_branch.clone(),
            paths: SyncPaths {
                versions_props: self.versions_path.clone(),
                packages_props: Some(self.packages_path.clone())
                    .filter(|p| !p.trim().is_empty()),
                version_details: self.version_details_path.clone(),
            },
        }
    }
}

pub fn execute(args: EngSyncArgs) -> Result<()> {
    validate_repo_slug("--toolset-repo", &args.toolset_repo)?;
    validate_repo_slug("--msbuild-repo", &args.msbuild_repo)?;

    let job = args.job();
    let result = match (&args.path, args.push) {
        (Some(path), true) => publish_sync(&args, &job, path),
        (Some(path), false) => {
            check_working_dir("MSBUILD_DIR", path)?;
            let source = read_only_client()?;
            run_sync(
                &source,
                &job,
                SyncTarget::Workdir {
                    root: path,
                    dry_run: args.publish.dry_run,
                },
            )
        }
        (None, _) => {
            let source = read_only_client()?;
            run_sync(&source, &job, SyncTarget::Render)
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return Err(e);
        }
    };

    match &outcome {
        Outcome::NoChangeNeeded => {
            println!(
                "{}",
                format!(
                    "-> {} at {} is in sync with {} at {}, nothing to be done.",
                    job.target_repo, job.target_branch, job.source_repo, job.source_branch
                )
                .green()
            );
        }
        Outcome::Rendered(plan) | Outcome::Written(plan) => {
            println!("\n{}", plan.report(&job));
        }
        Outcome::Published(plan, published) => {
            println!("\n{}", plan.report(&job));
            published.print();
            if let PublishOutcome::CreateFailed(reason) = published {
                return Err(BumpError::PullRequest(reason.clone()));
            }
        }
    }

    Ok(())
}

fn publish_sync(args: &EngSyncArgs, job: &SyncJob, path: &Path) -> Result<Outcome> {
    preflight_publish(
        &args.publish,
        "--msbuild-repo",
        &args.msbuild_repo,
        "MSBUILD_DIR",
        path,
    )?;

    let client = args.publish.client()?;
    let settings = args.publish.settings(&job.target_repo)?;
    let vcs = GitWorkdir::open(path, settings.dry_run)?;

    publish::cleanup_stale_branches(
        &client,
        &settings,
        &job.target_repo,
        ENG_BRANCH_PREFIX,
    );

    let existing = locate_pull_request(
        &client,
        &job.target_repo,
        &job.target_branch,
        ENG_BRANCH_PREFIX,
        &settings.user,
        None,
    )?;
    let plan = settings.plan(
        &job.target_repo,
        &job.target_branch,
        ENG_BRANCH_PREFIX,
        job.title(),
        existing,
    );

    let source: &dyn ContentSource = &client;
    run_sync(
        source,
        job,
        SyncTarget::Publish {
            vcs: &vcs,
            pulls: &client,
            plan: &plan,
        },
    )
}
