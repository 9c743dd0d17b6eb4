//! Pull requests and branch housekeeping.

use super::client::{GitHub, json_pointer, json_str};
use crate::error::{BumpError, Result};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

/// An open pull request, reduced to the fields the bump tools look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    /// Owner of the repository the head branch lives in.
    pub head_owner: String,
    pub head_ref: String,
    pub base_ref: String,
}

impl PullRequest {
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            number: json_pointer(value, "number")?.as_u64()?,
            html_url: json_str(value, "html_url")?.to_string(),
            head_owner: json_str(value, "head/repo/owner/login")
                .or_else(|| json_str(value, "head/user/login"))?
                .to_string(),
            head_ref: json_str(value, "head/ref")?.to_string(),
            base_ref: json_str(value, "base/ref")?.to_string(),
        })
    }

    /// Remote repository slug the head branch lives in, e.g. `radical/mono`.
    pub fn head_repo(&self, repo_name: &str) -> String {
        format!("{}/{}", self.head_owner, repo_name)
    }
}

/// Request body for opening a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    /// Target branch.
    pub base: String,
    /// `owner:branch` of the proposed changes.
    pub head: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

pub trait PullRequestService: Sync {
    /// Open pull requests matching an API query, e.g.
    /// `/repos/mono/mono/pulls?state=open&base=master`.
    fn find_open_pull_requests(&self, query: &str) -> Result<Vec<PullRequest>>;

    fn get_pull_request(&self, repo: &str, number: u64) -> Result<PullRequest>;

    fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest>;

    fn add_reviewers(&self, repo: &str, number: u64, reviewers: &[String]) -> Result<()>;

    /// Branches of `repo` whose name starts with `prefix`.
    fn matching_branches(&self, repo: &str, prefix: &str) -> Result<Vec<String>>;

    fn delete_branch(&self, repo: &str, branch: &str) -> Result<()>;
}

impl PullRequestService for GitHub {
    fn find_open_pull_requests(&self, query: &str) -> Result<Vec<PullRequest>> {
        let url = self.api_url(query);
        let value = self.send_json(self.http().get(&url), &url)?;

        Ok(match &value {
            Value::Array(items) => items.iter().filter_map(PullRequest::from_json).collect(),
            other => PullRequest::from_json(other).into_iter().collect(),
        })
    }

    fn get_pull_request(&self, repo: &str, number: u64) -> Result<PullRequest> {
        let url = self.api_url(&format!("/repos/{}/pulls/{}", repo, number));
        let value = self.send_json(self.http().get(&url), &url)?;
        PullRequest::from_json(&value).ok_or_else(|| {
            BumpError::PullRequest(format!("unexpected response for {}#{}", repo, number))
        })
    }

    fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest> {
        let url = self.api_url(&format!("/repos/{}/pulls", repo));
        let value = self
            .send_json(self.http().post(&url).json(request), &url)
            .map_err(|e| BumpError::PullRequest(e.to_string()))?;
        PullRequest::from_json(&value).ok_or_else(|| {
            BumpError::PullRequest(format!("unexpected response creating PR in {}", repo))
        })
    }

    fn add_reviewers(&self, repo: &str, number: u64, reviewers: &[String]) -> Result<()> {
        let url = self.api_url(&format!(
            "/repos/{}/pulls/{}/requested_reviewers",
            repo, number
        ));
        let body = serde_json::json!({ "reviewers": reviewers });
        self.send(self.http().post(&url).json(&body), &url)?;
        Ok(())
    }

    fn matching_branches(&self, repo: &str, prefix: &str) -> Result<Vec<String>> {
        let url = self.api_url(&format!("/repos/{}/git/matching-refs/heads/{}", repo, prefix));
        let value = self.send_json(self.http().get(&url), &url)?;

        Ok(value
            .as_array()
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| json_str(r, "ref"))
                    .filter_map(|r| r.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete_branch(&self, repo: &str, branch: &str) -> Result<()> {
        let url = self.api_url(&format!("/repos/{}/git/refs/heads/{}", repo, branch));
        self.send(self.http().delete(&url), &url)?;
        Ok(())
    }
}

/// Opens a pull request and asks for reviews.
///
/// A failure to request reviewers is logged; the pull request is still returned.
pub fn open_pull_request(
    service: &dyn PullRequestService,
    repo: &str,
    request: &NewPullRequest,
    reviewers: &[String],
) -> Result<PullRequest> {
    let created = service.create_pull_request(repo, request)?;
    log::info!("Created {}", created.html_url);

    if !reviewers.is_empty()
        && let Err(e) = service.add_reviewers(repo, created.number, reviewers)
    {
        log::warn!(
            "Could not request reviewers {} on #{}: {}",
            reviewers.join(", "),
            created.number,
            e
        );
    }

    Ok(created)
}

/// Deletes branches in `fork_repo` that start with `prefix` and have no open pull
/// request against `upstream_repo`.
///
/// Deletions run in parallel. Failures are logged and skipped; the names of deleted
/// branches are returned. Dry runs delete nothing and return the candidates for the
/// caller to report.
pub fn cleanup_unused_branches<S>(
    service: &S,
    owner: &str,
    fork_repo: &str,
    upstream_repo: &str,
    prefix: &str,
    dry_run: bool,
) -> Result<Vec<String>>
where
    S: PullRequestService + ?Sized,
{
    let branches = service.matching_branches(fork_repo, prefix)?;
    log::debug!(
        "{} branch(es) in {} start with '{}'",
        branches.len(),
        fork_repo,
        prefix
    );

    let mut unused = Vec::new();
    for branch in branches {
        let query = format!(
            "/repos/{}/pulls?state=open&head={}:{}",
            upstream_repo, owner, branch
        );
        if service.find_open_pull_requests(&query)?.is_empty() {
            unused.push(branch);
        } else {
            log::debug!("Keeping {}, it has an open pull request", branch);
        }
    }

    if dry_run {
        return Ok(unused);
    }

    let results: Vec<_> = unused
        .par_iter()
        .map(|branch| (branch, service.delete_branch(fork_repo, branch)))
        .collect();

    let mut deleted = Vec::new();
    for (branch, result) in results {
        match result {
            Ok(()) => {
                log::info!("Deleted branch {} in {}", branch, fork_repo);
                deleted.push(branch.clone());
            }
            Err(e) => log::warn!("Could not delete branch {}: {}", branch, e),
        }
    }

    Ok(deleted)
}
