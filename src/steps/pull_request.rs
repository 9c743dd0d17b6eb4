//! Finding the pull request a bump should be pushed to.

use crate::error::Result;
use crate::github::{PullRequest, PullRequestService};

/// Open pull request against `base_branch` whose head belongs to `owner` and whose
/// head branch starts with `prefix` (ignoring case).
pub fn find_reusable_pull_request(
    service: &dyn PullRequestService,
    upstream_repo: &str,
    base_branch: &str,
    prefix: &str,
    owner: &str,
) -> Result<Option<PullRequest>> {
    log::debug!(
        "Looking for a pull request against {}/{} with a branch starting with {}",
        upstream_repo,
        base_branch,
        prefix
    );

    let query = format!(
        "/repos/{}/pulls?state=open&base={}",
        upstream_repo, base_branch
    );
    let prefix = prefix.to_lowercase();
    let found = service
        .find_open_pull_requests(&query)?
        .into_iter()
        .find(|pr| pr.head_owner == owner && pr.head_ref.to_lowercase().starts_with(&prefix));

    match &found {
        Some(pr) => log::debug!("Found {} (head {}:{})", pr.html_url, pr.head_owner, pr.head_ref),
        None => log::debug!("No pull request matches"),
    }
    Ok(found)
}

/// Pull request to update, if any.
///
/// An explicit `number` must resolve; a failed search is only logged and yields
/// `None`, so the bump goes to a fresh branch instead.
pub fn locate_pull_request(
    service: &dyn PullRequestService,
    upstream_repo: &str,
    base_branch: &str,
    prefix: &str,
    owner: &str,
    number: Option<u64>,
) -> Result<Option<PullRequest>> {
    if let Some(number) = number {
        log::debug!("Fetching pull request #{} in {}", number, upstream_repo);
        return service.get_pull_request(upstream_repo, number).map(Some);
    }

    match find_reusable_pull_request(service, upstream_repo, base_branch, prefix, owner) {
        Ok(found) => Ok(found),
        Err(e) => {
            log::error!("Failed to fetch {} pull requests: {}", upstream_repo, e);
            Ok(None)
        }
    }
}
