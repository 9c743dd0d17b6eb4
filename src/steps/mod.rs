//! Bump orchestration shared by the subcommands.
//!
//! A run moves through [`BumpState`]:
//!
//! ```text
//! Idle → FetchedManifests → DiffComputed ─┬→ NoChangeNeeded
//!                                         └→ PatchApplied → Committed → Pushed ─┬→ PrCreated
//!                                                                               └→ PrUpdated
//! ```
//!
//! Any failure ends the run where it happened; nothing already done is undone.

pub mod addin;
pub mod emsdk;
pub mod msbuild;
pub mod publish;
pub mod pull_request;
pub mod sync;

use chrono::Utc;
use std::fmt;

/// Branch prefix of `bump-msbuild` branches.
pub const MSBUILD_BRANCH_PREFIX: &str = "bump_msbuild";
/// Branch prefix of `bump-emsdk` branches.
pub const EMSDK_BRANCH_PREFIX: &str = "bump_emsdk";
/// Branch prefix of `eng-sync --push` branches.
pub const ENG_BRANCH_PREFIX: &str = "bump_eng";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpState {
    Idle,
    FetchedManifests,
    DiffComputed,
    NoChangeNeeded,
    PatchApplied,
    Committed,
    Pushed,
    PrCreated,
    PrUpdated,
}

impl BumpState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BumpState::NoChangeNeeded | BumpState::PrCreated | BumpState::PrUpdated
        )
    }

    /// Moves to `next`, logging the transition. A finished run stays finished.
    pub fn advance(&mut self, next: BumpState) {
        if self.is_terminal() {
            log::warn!("Ignoring {} -> {}: the run already finished", self, next);
            return;
        }
        log::debug!("{} -> {}", self, next);
        *self = next;
    }
}

impl fmt::Display for BumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BumpState::Idle => "idle",
            BumpState::FetchedManifests => "fetched-manifests",
            BumpState::DiffComputed => "diff-computed",
            BumpState::NoChangeNeeded => "no-change-needed",
            BumpState::PatchApplied => "patch-applied",
            BumpState::Committed => "committed",
            BumpState::Pushed => "pushed",
            BumpState::PrCreated => "pr-created",
            BumpState::PrUpdated => "pr-updated",
        };
        f.write_str(name)
    }
}

/// Fresh local branch name: `<prefix>_<base>_<UTC timestamp>`.
///
/// `/` in the base branch is flattened so the result is a single path segment.
pub fn branch_name(prefix: &str, base: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        base.replace('/', "-"),
        Utc::now().format("%Y%m%d%H%M%S")
    )
}
