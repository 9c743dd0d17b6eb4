//! Blocking GitHub client for raw file content and the REST API.

use crate::error::{BumpError, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

pub const GITHUB_API: &str = "https://api.github.com";
pub const GITHUB_RAW: &str = "https://raw.githubusercontent.com";

/// Connection settings shared by every request of a run.
///
/// Built once from the command line and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub raw_base: String,
    pub user_agent: String,
    /// Personal access token; anonymous access when `None`.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: GITHUB_API.to_string(),
            raw_base: GITHUB_RAW.to_string(),
            user_agent: format!("eng-bump/{}", crate::VERSION),
            token: None,
        }
    }
}

impl ClientConfig {
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

/// Read access to repository content.
pub trait ContentSource: Sync {
    /// Raw file content of `path` in `repo` at `reference` (branch, tag or commit).
    fn get_raw(&self, repo: &str, reference: &str, path: &str) -> Result<String>;

    /// Commit the branch currently points at, or `None` when no such branch exists.
    fn branch_head(&self, repo: &str, branch: &str) -> Result<Option<String>>;

    /// Decoded JSON from an API path such as `/repos/mono/mono/pulls/1`.
    fn get_json(&self, api_path: &str) -> Result<Value>;
}

/// Resolves a branch to its head commit.
///
/// When the branch does not exist the name is assumed to already be a commit.
pub fn resolve_reference(source: &dyn ContentSource, repo: &str, branch: &str) -> Result<String> {
    match source.branch_head(repo, branch)? {
        Some(sha) => Ok(sha),
        None => {
            log::debug!("{} has no branch '{}', using it as a commit", repo, branch);
            Ok(branch.to_string())
        }
    }
}

/// Walks a `/`-separated path through nested JSON objects.
pub fn json_pointer<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// String at `path`, if present.
pub fn json_str<'v>(value: &'v Value, path: &str) -> Option<&'v str> {
    json_pointer(value, path).and_then(Value::as_str)
}

pub struct GitHub {
    http: Client,
    config: ClientConfig,
}

impl GitHub {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("token {}", token)).map_err(|e| {
                BumpError::InvalidOption("--pat".to_string(), e.to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
        }
    }

    /// Sends a request; non-success statuses become [`BumpError::Fetch`].
    pub(crate) fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        log::debug!("-> {}", url);
        let response = request.send().map_err(|e| BumpError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(BumpError::Fetch {
            url: url.to_string(),
            reason: format!("{} {}", status, body.trim()),
        })
    }

    pub(crate) fn send_json(&self, request: RequestBuilder, url: &str) -> Result<Value> {
        let response = self.send(request, url)?;
        response.json().map_err(|e| BumpError::Fetch {
            url: url.to_string(),
            reason: format!("invalid JSON: {}", e),
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}

impl ContentSource for GitHub {
    fn get_raw(&self, repo: &str, reference: &str, path: &str) -> Result<String> {
        let url = format!(
            "{}/{}/{}/{}",
            self.config.raw_base.trim_end_matches('/'),
            repo,
            reference,
            path.trim_start_matches('/')
        );
        let response = self.send(self.http.get(&url), &url)?;
        response.text().map_err(|e| BumpError::Fetch {
            url,
            reason: e.to_string(),
        })
    }

    fn branch_head(&self, repo: &str, branch: &str) -> Result<Option<String>> {
        let url = self.api_url(&format!("/repos/{}/git/ref/heads/{}", repo, branch));
        let response = match self.http.get(&url).send() {
            Ok(response) => response,
            Err(e) => {
                return Err(BumpError::Fetch {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BumpError::Fetch {
                reason: response.status().to_string(),
                url,
            });
        }

        let value: Value = response.json().map_err(|e| BumpError::Fetch {
            url: url.clone(),
            reason: format!("invalid JSON: {}", e),
        })?;
        Ok(json_str(&value, "object/sha").map(str::to_string))
    }

    fn get_json(&self, api_path: &str) -> Result<Value> {
        let url = self.api_url(api_path);
        self.send_json(self.http.get(&url), &url)
    }
}
