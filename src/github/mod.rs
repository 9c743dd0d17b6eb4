//! GitHub access: raw content, branch heads and pull requests.

pub mod client;
pub mod pulls;

pub use client::{ClientConfig, ContentSource, GitHub, resolve_reference};
pub use pulls::{
    NewPullRequest, PullRequest, PullRequestService, cleanup_unused_branches, open_pull_request,
};
