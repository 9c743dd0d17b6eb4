//! Bumping the Emscripten docker image used by the runtime's CI pipelines.

use super::publish::{self, PublishOutcome, PublishSettings};
use super::{BumpState, EMSDK_BRANCH_PREFIX};
use crate::error::{BumpError, Result};
use crate::fs::Transaction;
use crate::github::{ContentSource, PullRequestService, resolve_reference};
use crate::rewrite::{WEBASSEMBLY_IMAGE, capture_match, replace_all_matches};
use crate::vcs::VersionControl;
use std::fs;
use std::path::Path;

pub const IMAGE_INFO_PATH: &str =
    "build-info/docker/image-info.dotnet-dotnet-buildtools-prereqs-docker-master.json";
pub const PLATFORM_MATRIX_PATH: &str = "eng/pipelines/common/platform-matrix.yml";

/// Where the current image is published and where it is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmsdkJob {
    pub versions_repo: String,
    pub versions_branch: String,
    pub image_info_path: String,
    pub runtime_repo: String,
    pub runtime_branch: String,
    pub platform_path: String,
    /// Emscripten version for the commit message; the image tag is used when empty.
    pub emsdk_version: String,
    pub publish: PublishSettings,
}

impl EmsdkJob {
    pub fn title(&self, image: &str) -> String {
        let version = if self.emsdk_version.is_empty() {
            image
        } else {
            self.emsdk_version.as_str()
        };
        format!(
            "[{}] Bump Docker image with Emscripten {}",
            self.runtime_branch, version
        )
    }
}

/// Latest webassembly image named in the versions repository's image info.
pub fn find_docker_image(
    source: &dyn ContentSource,
    repo: &str,
    branch: &str,
    path: &str,
) -> Result<String> {
    let head = resolve_reference(source, repo, branch)?;
    let contents = source.get_raw(repo, &head, path)?;
    println!(
        "From repo {}, branch {} at commit {}:",
        repo, branch, head
    );

    let image = capture_match(&contents, WEBASSEMBLY_IMAGE)?.ok_or_else(|| {
        BumpError::KeyNotFound(format!("webassembly image in {}@{}:{}", repo, head, path))
    })?;
    println!("Docker image: {}", image);
    Ok(image)
}

/// Stages `path` under `root` with every webassembly image replaced by `image`.
///
/// Returns `false` when the file already names only `image`.
pub fn replace_docker_image(
    root: &Path,
    path: &str,
    image: &str,
    txn: &mut Transaction,
) -> Result<bool> {
    let full = root.join(path);
    let contents = fs::read_to_string(&full)?;

    let Some(updated) = replace_all_matches(&contents, WEBASSEMBLY_IMAGE, image)? else {
        return Err(BumpError::KeyNotFound(format!(
            "{} in {}",
            WEBASSEMBLY_IMAGE,
            full.display()
        )));
    };

    if updated == contents {
        return Ok(false);
    }
    txn.update_file(full, updated)?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmsdkOutcome {
    UpToDate,
    Published(PublishOutcome),
}

pub fn run_emsdk_bump(
    source: &dyn ContentSource,
    pulls: &dyn PullRequestService,
    vcs: &dyn VersionControl,
    job: &EmsdkJob,
) -> Result<EmsdkOutcome> {
    let mut state = BumpState::Idle;
    let settings = &job.publish;

    publish::cleanup_stale_branches(pulls, settings, &job.runtime_repo, EMSDK_BRANCH_PREFIX);

    let image = find_docker_image(
        source,
        &job.versions_repo,
        &job.versions_branch,
        &job.image_info_path,
    )?;
    state.advance(BumpState::FetchedManifests);

    let plan = settings.plan(
        &job.runtime_repo,
        &job.runtime_branch,
        EMSDK_BRANCH_PREFIX,
        job.title(&image),
        None,
    );
    publish::prepare(vcs, &plan)?;

    let mut txn = Transaction::new(false);
    let changed = replace_docker_image(vcs.root(), &job.platform_path, &image, &mut txn)?;
    state.advance(BumpState::DiffComputed);

    if !changed || !publish::write_and_stage(vcs, &mut txn)? {
        state.advance(BumpState::NoChangeNeeded);
        println!("-> {} already uses {}", job.platform_path, image);
        return Ok(EmsdkOutcome::UpToDate);
    }
    state.advance(BumpState::PatchApplied);

    let outcome = publish::finish(vcs, pulls, &plan, None, &mut state)?;
    Ok(EmsdkOutcome::Published(outcome))
}
