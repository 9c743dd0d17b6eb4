//! Commit, push and pull request: the tail every publishing bump shares.

use super::{BumpState, branch_name};
use crate::error::Result;
use crate::fs::Transaction;
use crate::github::{
    NewPullRequest, PullRequest, PullRequestService, cleanup_unused_branches, open_pull_request,
};
use crate::vcs::VersionControl;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Where a bump branch comes from, where it goes and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    /// Repository pull requests are opened against.
    pub upstream_repo: String,
    /// Branch pull requests target.
    pub base_branch: String,
    /// Remote and branch the local branch is reset to.
    pub fetch_remote: String,
    pub fetch_branch: String,
    /// Remote of the user's fork that the branch is pushed to.
    pub push_remote: String,
    pub local_branch: String,
    /// Owner of the fork, used for the pull request head.
    pub user: String,
    /// Commit message and pull request title.
    pub title: String,
    pub reviewers: Vec<String>,
    pub dry_run: bool,
    /// Pull request the push updates; a new one is opened when `None`.
    pub existing: Option<PullRequest>,
}

/// Who publishes and where; shared by every publishing subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    /// GitHub user owning the fork.
    pub user: String,
    /// Local remote pointing at the fork.
    pub push_remote: String,
    /// Local remote pointing at the upstream repository.
    pub origin_remote: String,
    /// `owner/name` of the fork.
    pub fork_repo: String,
    pub reviewers: Vec<String>,
    pub dry_run: bool,
}

impl PublishSettings {
    /// Plans a publish onto `existing`'s head branch, or onto a fresh branch cut from
    /// `base_branch` when there is no pull request to reuse.
    pub fn plan(
        &self,
        upstream_repo: &str,
        base_branch: &str,
        prefix: &str,
        title: String,
        existing: Option<PullRequest>,
    ) -> PublishPlan {
        let (fetch_remote, fetch_branch, local_branch) = match &existing {
            Some(pr) => (
                self.push_remote.clone(),
                pr.head_ref.clone(),
                pr.head_ref.clone(),
            ),
            None => (
                self.origin_remote.clone(),
                base_branch.to_string(),
                branch_name(prefix, base_branch),
            ),
        };

        PublishPlan {
            upstream_repo: upstream_repo.to_string(),
            base_branch: base_branch.to_string(),
            fetch_remote,
            fetch_branch,
            push_remote: self.push_remote.clone(),
            local_branch,
            user: self.user.clone(),
            title,
            reviewers: self.reviewers.clone(),
            dry_run: self.dry_run,
            existing,
        }
    }
}

/// Removes the user's stale bump branches. Never fails the caller.
pub fn cleanup_stale_branches(
    pulls: &dyn PullRequestService,
    settings: &PublishSettings,
    upstream_repo: &str,
    prefix: &str,
) {
    match cleanup_unused_branches(
        pulls,
        &settings.user,
        &settings.fork_repo,
        upstream_repo,
        prefix,
        settings.dry_run,
    ) {
        Ok(branches) if settings.dry_run => {
            for branch in branches {
                println!("Would delete {}:{}", settings.user, branch);
            }
        }
        Ok(branches) => log::debug!("Deleted {} unused branch(es)", branches.len()),
        Err(e) => log::warn!("Cleaning up unused branches failed: {}", e),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Pushed with `--dry-run`; no pull request was touched.
    DryRun,
    Updated(PullRequest),
    Created(PullRequest),
    /// The branch was pushed but opening the pull request failed.
    CreateFailed(String),
}

impl PublishOutcome {
    pub fn print(&self) {
        match self {
            PublishOutcome::DryRun => {
                println!("{}", "DRY RUN - pushed with --dry-run, no pull request".yellow());
            }
            PublishOutcome::Updated(pr) => {
                println!("---- Updated PR: {} ---", pr.html_url.green());
            }
            PublishOutcome::Created(pr) => {
                println!("----------- Created new PR at {} ----------", pr.html_url.green());
            }
            PublishOutcome::CreateFailed(reason) => {
                eprintln!("{} {}", "Failed to create PR:".red().bold(), reason);
            }
        }
    }
}

/// Resets the working copy onto the branch the bump is built on.
pub fn prepare(vcs: &dyn VersionControl, plan: &PublishPlan) -> Result<()> {
    vcs.prepare_working_directory(&plan.fetch_remote, &plan.fetch_branch, &plan.local_branch)
}

/// Writes the staged files and adds them to the index.
///
/// Returns `false` when nothing was staged.
pub fn write_and_stage(vcs: &dyn VersionControl, txn: &mut Transaction) -> Result<bool> {
    if txn.is_empty() {
        return Ok(false);
    }

    if let Err(e) = txn.commit() {
        eprintln!("{} {}", "Error writing files:".red().bold(), e);
        return Err(e);
    }

    let written: Vec<PathBuf> = txn.paths().into_iter().map(Path::to_path_buf).collect();
    for path in &written {
        if let Err(e) = vcs.stage_file(path) {
            if let Err(restore) = txn.rollback() {
                log::error!("{}", restore);
            }
            return Err(e);
        }
    }
    Ok(true)
}

/// Commits, pushes and opens or reports the pull request.
///
/// A commit or push failure aborts; a local commit is left in place. A failure to
/// open the pull request is reported in the outcome, not as an error.
pub fn finish(
    vcs: &dyn VersionControl,
    pulls: &dyn PullRequestService,
    plan: &PublishPlan,
    body: Option<String>,
    state: &mut BumpState,
) -> Result<PublishOutcome> {
    vcs.commit(&plan.title)?;
    state.advance(BumpState::Committed);

    vcs.push(&plan.push_remote, &plan.local_branch, &plan.local_branch)?;
    state.advance(BumpState::Pushed);

    if plan.dry_run {
        return Ok(PublishOutcome::DryRun);
    }

    if let Some(pr) = &plan.existing {
        state.advance(BumpState::PrUpdated);
        return Ok(PublishOutcome::Updated(pr.clone()));
    }

    let request = NewPullRequest {
        title: plan.title.clone(),
        base: plan.base_branch.clone(),
        head: format!("{}:{}", plan.user, plan.local_branch),
        body,
    };

    match open_pull_request(pulls, &plan.upstream_repo, &request, &plan.reviewers) {
        Ok(pr) => {
            state.advance(BumpState::PrCreated);
            Ok(PublishOutcome::Created(pr))
        }
        Err(e) => {
            log::error!("Opening pull request in {} failed: {}", plan.upstream_repo, e);
            Ok(PublishOutcome::CreateFailed(e.to_string()))
        }
    }
}
