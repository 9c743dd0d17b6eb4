//! Syncing a target repository's version pins from a source-of-truth repository.
//!
//! ## Phases
//!
//! 1. Resolve the source branch head and fetch the source and target manifests
//! 2. Read, alias and diff them
//! 3. Patch the target documents in memory (integrity errors stop the run here)
//! 4. Hand the patched documents to a sink: stdout, a working copy, or a working copy
//!    followed by commit, push and pull request

use super::BumpState;
use super::publish::{self, PublishOutcome, PublishPlan};
use crate::error::Result;
use crate::fs::Transaction;
use crate::github::{ContentSource, PullRequestService, resolve_reference};
use crate::manifest::{
    DependencyManifest, PropertyManifest, ROSLYN_PACKAGE_PROPERTY, alias_properties,
    detail_property_key, diff_dependencies, diff_properties, parse_dependencies,
    parse_properties, patch_dependencies, patch_properties,
};
use crate::vcs::VersionControl;
use colored::Colorize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

pub const VERSIONS_PROPS_PATH: &str = "eng/Versions.props";
pub const PACKAGES_PROPS_PATH: &str = "eng/Packages.props";
pub const VERSION_DETAILS_PATH: &str = "eng/Version.Details.xml";

const ROSLYN_LABEL: &str = "Microsoft.Net.Compilers/Roslyn";

/// Repository-relative manifest locations, identical in source and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    pub versions_props: String,
    /// Second property list in the target; skipped when `None`.
    pub packages_props: Option<String>,
    pub version_details: String,
}

impl Default for SyncPaths {
    fn default() -> Self {
        Self {
            versions_props: VERSIONS_PROPS_PATH.to_string(),
            packages_props: Some(PACKAGES_PROPS_PATH.to_string()),
            version_details: VERSION_DETAILS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub source_repo: String,
    /// Branch name or commit.
    pub source_branch: String,
    pub target_repo: String,
    pub target_branch: String,
    pub paths: SyncPaths,
}

impl SyncJob {
    pub fn title(&self) -> String {
        format!(
            "[{}] Bump versions from {} at {}",
            self.target_branch, self.source_repo, self.source_branch
        )
    }
}

/// Raw manifest documents of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedManifests {
    /// Commit the source documents were read at.
    pub source_commit: String,
    pub source_versions: String,
    pub source_details: String,
    pub target_versions: String,
    pub target_packages: Option<String>,
    pub target_details: String,
}

/// Fetches all documents a sync needs. Any failure aborts before anything else runs.
pub fn fetch_manifests(source: &dyn ContentSource, job: &SyncJob) -> Result<FetchedManifests> {
    let source_commit = resolve_reference(source, &job.source_repo, &job.source_branch)?;
    log::debug!(
        "{} {} is at {}",
        job.source_repo,
        job.source_branch,
        source_commit
    );

    let paths = &job.paths;
    let target_packages = match &paths.packages_props {
        Some(path) => Some(source.get_raw(&job.target_repo, &job.target_branch, path)?),
        None => None,
    };

    Ok(FetchedManifests {
        source_versions: source.get_raw(&job.source_repo, &source_commit, &paths.versions_props)?,
        source_details: source.get_raw(&job.source_repo, &source_commit, &paths.version_details)?,
        target_versions: source.get_raw(&job.target_repo, &job.target_branch, &paths.versions_props)?,
        target_details: source.get_raw(&job.target_repo, &job.target_branch, &paths.version_details)?,
        target_packages,
        source_commit,
    })
}

/// A patched target document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedDocument {
    /// Repository-relative path.
    pub path: String,
    pub content: String,
}

/// Everything a sync would change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub source_commit: String,
    pub property_updates: PropertyManifest,
    pub dependency_updates: DependencyManifest,
    /// Documents whose content changed.
    pub documents: Vec<PatchedDocument>,
    /// Target records before patching.
    pub previous_dependencies: DependencyManifest,
    /// Property values actually written.
    pub applied_properties: PropertyManifest,
    /// Properties left alone because their value is not a literal version.
    pub guarded: BTreeSet<String>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.property_updates.is_empty() && self.dependency_updates.is_empty()
    }

    /// Human readable summary; also used as the pull request body.
    pub fn report(&self, job: &SyncJob) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Bump versions from {} at {}",
            job.source_repo, job.source_branch
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Based on commit {}", self.source_commit);
        let _ = writeln!(out, "```");
        for (name, record) in &self.dependency_updates {
            let old = self
                .previous_dependencies
                .get(name)
                .map(|r| r.version.as_str())
                .unwrap_or_default();
            let _ = writeln!(out, "{:<40}: {} (from {})", name, record.version, old);
        }
        if let Some(roslyn) = self.applied_properties.get(ROSLYN_PACKAGE_PROPERTY) {
            let _ = writeln!(out);
            let _ = writeln!(out, "{:<40}: {}", ROSLYN_LABEL, roslyn);
        }
        let _ = writeln!(out, "```");
        out
    }
}

/// Reads, diffs and patches fetched documents. Performs no I/O.
///
/// When both update sets are empty no document is patched.
pub fn plan_sync(fetched: &FetchedManifests, paths: &SyncPaths) -> Result<SyncPlan> {
    let source_props = alias_properties(&parse_properties(&fetched.source_versions)?);
    let source_details = parse_dependencies(&fetched.source_details)?;

    let mut target_props = parse_properties(&fetched.target_versions)?;
    if let Some(packages) = &fetched.target_packages {
        target_props.extend(parse_properties(packages)?);
    }
    let target_details = parse_dependencies(&fetched.target_details)?;

    for name in target_details.keys() {
        let key = detail_property_key(name);
        if let Some(value) = target_props.get(&key) {
            log::debug!("{} is also pinned as {} = {}", name, key, value);
        }
    }

    let mut plan = SyncPlan {
        source_commit: fetched.source_commit.clone(),
        property_updates: diff_properties(&source_props, &target_props, true),
        dependency_updates: diff_dependencies(&source_details, &target_details),
        ..SyncPlan::default()
    };

    if plan.is_noop() {
        return Ok(plan);
    }

    let mut property_documents = vec![(&paths.versions_props, &fetched.target_versions)];
    if let (Some(path), Some(input)) = (&paths.packages_props, &fetched.target_packages) {
        property_documents.push((path, input));
    }

    for (path, input) in property_documents {
        let patch = patch_properties(input, &plan.property_updates, true)?;
        for key in &patch.guarded {
            log::warn!("{}: {} is not a literal version, not updated", path, key);
        }
        plan.applied_properties.extend(patch.applied.clone());
        plan.guarded.extend(patch.guarded.clone());
        if !patch.is_unchanged() {
            plan.documents.push(PatchedDocument {
                path: path.clone(),
                content: patch.document,
            });
        }
    }

    let details = patch_dependencies(&fetched.target_details, &plan.dependency_updates)?;
    if details.document != fetched.target_details {
        plan.documents.push(PatchedDocument {
            path: paths.version_details.clone(),
            content: details.document,
        });
    }
    plan.previous_dependencies = details.previous;

    Ok(plan)
}

/// Where patched documents go.
pub enum SyncTarget<'a> {
    /// Print them.
    Render,
    /// Write them into a working copy.
    Workdir { root: &'a Path, dry_run: bool },
    /// Write them into a prepared working copy, then commit, push and open a PR.
    Publish {
        vcs: &'a dyn VersionControl,
        pulls: &'a dyn PullRequestService,
        plan: &'a PublishPlan,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoChangeNeeded,
    Rendered(SyncPlan),
    Written(SyncPlan),
    Published(SyncPlan, PublishOutcome),
}

/// Runs a complete sync.
pub fn run_sync(
    source: &dyn ContentSource,
    job: &SyncJob,
    target: SyncTarget<'_>,
) -> Result<Outcome> {
    let mut state = BumpState::Idle;

    let fetched = fetch_manifests(source, job)?;
    state.advance(BumpState::FetchedManifests);

    let plan = plan_sync(&fetched, &job.paths)?;
    state.advance(BumpState::DiffComputed);

    if plan.is_noop() {
        state.advance(BumpState::NoChangeNeeded);
        return Ok(Outcome::NoChangeNeeded);
    }

    match target {
        SyncTarget::Render => {
            for document in &plan.documents {
                println!("\n{}", format!("--- {} ---", document.path).bold());
                print!("{}", document.content);
            }
            Ok(Outcome::Rendered(plan))
        }
        SyncTarget::Workdir { root, dry_run } => {
            let mut txn = Transaction::new(dry_run);
            stage_documents(&mut txn, root, &plan)?;
            txn.commit()?;
            state.advance(BumpState::PatchApplied);
            txn.print_summary(&job.title(), root);
            Ok(Outcome::Written(plan))
        }
        SyncTarget::Publish {
            vcs,
            pulls,
            plan: publish_plan,
        } => {
            publish::prepare(vcs, publish_plan)?;

            let mut txn = Transaction::new(false);
            stage_documents(&mut txn, vcs.root(), &plan)?;
            if !publish::write_and_stage(vcs, &mut txn)? {
                state.advance(BumpState::NoChangeNeeded);
                return Ok(Outcome::NoChangeNeeded);
            }
            state.advance(BumpState::PatchApplied);
            txn.print_summary(&job.title(), vcs.root());

            let outcome = publish::finish(
                vcs,
                pulls,
                publish_plan,
                Some(plan.report(job)),
                &mut state,
            )?;
            Ok(Outcome::Published(plan, outcome))
        }
    }
}

fn stage_documents(txn: &mut Transaction, root: &Path, plan: &SyncPlan) -> Result<()> {
    for document in &plan.documents {
        txn.update_file(root.join(&document.path), document.content.clone())?;
    }
    Ok(())
}
