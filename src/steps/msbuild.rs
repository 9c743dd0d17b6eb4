//! Bumping the msbuild revision pinned in mono's MacSDK packaging script.

use super::publish::{self, PublishOutcome, PublishSettings};
use super::pull_request::locate_pull_request;
use super::{BumpState, MSBUILD_BRANCH_PREFIX};
use crate::error::{BumpError, Result};
use crate::fs::Transaction;
use crate::github::{ContentSource, PullRequestService};
use crate::manifest::{ROSLYN_PACKAGE_PROPERTY, parse_properties};
use crate::rewrite::{MSBUILD_PY_REVISION, NUGET_PY_VERSION, capture_group, replace_group};
use crate::vcs::VersionControl;
use crate::verify::repo_name;
use colored::Colorize;
use regex::Regex;
use std::fs;
use std::path::Path;

pub const MSBUILD_PY_PATH: &str = "packaging/MacSDK/msbuild.py";
pub const NUGET_PY_PATH: &str = "packaging/MacSDK/nuget.py";
pub const VERSIONS_PROPS_PATH: &str = "eng/Versions.props";

const NUGET_BUILD_TASKS_PROPERTY: &str = "NuGetBuildTasksPackageVersion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpCheck {
    pub required: bool,
    /// Commit the msbuild branch points at.
    pub branch_head: String,
    /// Revision currently pinned in the runtime.
    pub pinned: String,
}

/// Revision pinned in `msbuild.py` at `repo@branch`.
pub fn pinned_msbuild_revision(
    source: &dyn ContentSource,
    repo: &str,
    branch: &str,
) -> Result<String> {
    let contents = source.get_raw(repo, branch, MSBUILD_PY_PATH)?;
    match capture_group(&contents, MSBUILD_PY_REVISION)? {
        Some(revision) if !revision.is_empty() => Ok(revision),
        _ => Err(BumpError::KeyNotFound(format!(
            "msbuild reference in {}@{}:{}",
            repo, branch, MSBUILD_PY_PATH
        ))),
    }
}

/// Head commit of `branch`, or `branch` itself when it already looks like a commit.
fn msbuild_branch_head(source: &dyn ContentSource, repo: &str, branch: &str) -> Result<String> {
    if let Some(sha) = source.branch_head(repo, branch)? {
        return Ok(sha);
    }
    let commit = Regex::new(r"^[0-9a-fA-F]{7,40}$")?;
    if commit.is_match(branch) {
        log::debug!("{} has no branch '{}', using it as a commit", repo, branch);
        return Ok(branch.to_string());
    }
    Err(BumpError::KeyNotFound(format!("branch {} in {}", branch, repo)))
}

/// Compares the msbuild branch head with the revision the runtime pins.
///
/// Both values are fetched concurrently.
pub fn is_bump_required(
    source: &dyn ContentSource,
    msbuild_repo: &str,
    msbuild_branch: &str,
    mono_repo: &str,
    mono_branch: &str,
) -> Result<BumpCheck> {
    log::debug!(
        "Checking msbuild HEAD for {} {}, and ref in mono {} {}",
        msbuild_repo,
        msbuild_branch,
        mono_repo,
        mono_branch
    );

    let (head, pinned) = rayon::join(
        || msbuild_branch_head(source, msbuild_repo, msbuild_branch),
        || pinned_msbuild_revision(source, mono_repo, mono_branch),
    );
    let (branch_head, pinned) = (head?, pinned?);

    log::debug!(
        "Expected msbuild reference: {} (from {}/{})",
        branch_head,
        msbuild_repo,
        msbuild_branch
    );
    log::debug!("                  Mono has: {} in {}/{}", pinned, mono_repo, mono_branch);

    Ok(BumpCheck {
        required: branch_head != pinned,
        branch_head,
        pinned,
    })
}

/// Stages `msbuild.py` under `root` with its revision set to `sha`.
///
/// Returns the revision that was replaced.
pub fn update_msbuild_py(root: &Path, sha: &str, txn: &mut Transaction) -> Result<String> {
    let path = root.join(MSBUILD_PY_PATH);
    let contents = fs::read_to_string(&path)?;

    let Some((old, updated)) = replace_group(&contents, MSBUILD_PY_REVISION, sha)? else {
        return Err(BumpError::KeyNotFound(format!(
            "{} in {}",
            MSBUILD_PY_REVISION,
            path.display()
        )));
    };

    txn.update_file(path, updated)?;
    Ok(old)
}

/// Versions worth a look after msbuild moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpNotes {
    /// Compiler package version before and after; `None` when either side lacks it.
    pub roslyn: Option<(String, String)>,
    /// NuGet.Build.Tasks version of the new msbuild, with the nuget.exe version mono
    /// ships.
    pub nuget: Option<(String, String)>,
}

impl FollowUpNotes {
    pub fn print(&self) {
        match &self.roslyn {
            Some((old, new)) if old != new => println!(
                "\n{} It changed from '{}' to '{}'\n",
                "** NOTE: Roslyn will need an update.".yellow().bold(),
                old,
                new
            ),
            Some(_) => {}
            None => eprintln!("{} Could not read roslyn versions.", "Error:".red().bold()),
        }

        if let Some((tasks, exe)) = &self.nuget {
            println!("** NOTE: NuGet.Build.Tasks version: {}", tasks);
            println!("         nuget.exe version in mono: {}", exe);
        }
    }
}

pub fn follow_up_notes(
    source: &dyn ContentSource,
    mono_repo: &str,
    mono_branch: &str,
    msbuild_repo: &str,
    old_ref: &str,
    new_ref: &str,
) -> Result<FollowUpNotes> {
    let (new_props, old_props) = rayon::join(
        || source.get_raw(msbuild_repo, new_ref, VERSIONS_PROPS_PATH),
        || source.get_raw(msbuild_repo, old_ref, VERSIONS_PROPS_PATH),
    );
    let new_props = parse_properties(&new_props?)?;
    let old_props = parse_properties(&old_props?)?;

    let roslyn = match (
        old_props.get(ROSLYN_PACKAGE_PROPERTY),
        new_props.get(ROSLYN_PACKAGE_PROPERTY),
    ) {
        (Some(old), Some(new)) => Some((old.clone(), new.clone())),
        _ => None,
    };

    let nuget = match new_props.get(NUGET_BUILD_TASKS_PROPERTY) {
        Some(tasks) => {
            let nuget_py = source.get_raw(mono_repo, mono_branch, NUGET_PY_PATH)?;
            let exe = capture_group(&nuget_py, NUGET_PY_VERSION)?.unwrap_or_default();
            Some((tasks.clone(), exe))
        }
        None => None,
    };

    Ok(FollowUpNotes { roslyn, nuget })
}

/// One `bump-msbuild` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsbuildJob {
    pub mono_repo: String,
    pub mono_branch: String,
    pub msbuild_repo: String,
    /// Branch name or commit.
    pub msbuild_branch: String,
    /// Pull request to update instead of searching for one.
    pub pr_number: Option<u64>,
    pub publish: PublishSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsbuildOutcome {
    UpToDate,
    Published {
        outcome: PublishOutcome,
        notes: Option<FollowUpNotes>,
    },
}

pub fn run_msbuild_bump(
    source: &dyn ContentSource,
    pulls: &dyn PullRequestService,
    vcs: &dyn VersionControl,
    job: &MsbuildJob,
) -> Result<MsbuildOutcome> {
    let mut state = BumpState::Idle;
    let settings = &job.publish;

    publish::cleanup_stale_branches(pulls, settings, &job.mono_repo, MSBUILD_BRANCH_PREFIX);

    let existing = locate_pull_request(
        pulls,
        &job.mono_repo,
        &job.mono_branch,
        MSBUILD_BRANCH_PREFIX,
        &settings.user,
        job.pr_number,
    )?;

    let mut base_branch = job.mono_branch.clone();
    if let Some(pr) = &existing
        && job.pr_number.is_some()
    {
        println!(
            "* Using Mono branch as `{}`, obtained from the specified PR {}",
            pr.base_ref, pr.html_url
        );
        base_branch = pr.base_ref.clone();
    }

    let (check_repo, check_branch) = match &existing {
        Some(pr) => (pr.head_repo(repo_name(&job.mono_repo)), pr.head_ref.clone()),
        None => (job.mono_repo.clone(), base_branch.clone()),
    };

    let check = is_bump_required(
        source,
        &job.msbuild_repo,
        &job.msbuild_branch,
        &check_repo,
        &check_branch,
    )?;
    state.advance(BumpState::FetchedManifests);
    state.advance(BumpState::DiffComputed);

    if !check.required {
        state.advance(BumpState::NoChangeNeeded);
        println!("-> Ref is updated already, nothing to be done.");
        return Ok(MsbuildOutcome::UpToDate);
    }

    let title = format!(
        "[{}] Bump msbuild to track {}",
        base_branch, job.msbuild_branch
    );
    let plan = settings.plan(
        &job.mono_repo,
        &base_branch,
        MSBUILD_BRANCH_PREFIX,
        title,
        existing,
    );

    publish::prepare(vcs, &plan)?;

    let mut txn = Transaction::new(false);
    let replaced = update_msbuild_py(vcs.root(), &check.branch_head, &mut txn)?;
    log::debug!("{}: {} -> {}", MSBUILD_PY_PATH, replaced, check.branch_head);
    if !publish::write_and_stage(vcs, &mut txn)? {
        state.advance(BumpState::NoChangeNeeded);
        println!("-> Ref is updated already, nothing to be done.");
        return Ok(MsbuildOutcome::UpToDate);
    }
    state.advance(BumpState::PatchApplied);

    let outcome = publish::finish(vcs, pulls, &plan, None, &mut state)?;

    let notes = match follow_up_notes(
        source,
        &job.mono_repo,
        &base_branch,
        &job.msbuild_repo,
        &check.pinned,
        &check.branch_head,
    ) {
        Ok(notes) => Some(notes),
        Err(e) => {
            log::warn!("Could not check Roslyn and NuGet versions: {}", e);
            None
        }
    };

    Ok(MsbuildOutcome::Published { outcome, notes })
}
