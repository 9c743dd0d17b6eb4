//! Turning a mono build's artifact listing into the addin packaging record.

use crate::error::{BumpError, Result};
use serde::{Deserialize, Serialize};

const MONO_GIT_REPO: &str = "git@github.com:mono/mono";

/// One entry of the artifacts JSON a mono package build publishes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub url: String,
    pub sha256: String,
    pub md5: String,
    pub size: u64,
    pub product_id: String,
    pub release_id: String,
    pub version: String,
}

impl Artifact {
    /// Commit the package was built from: the second to last segment of its url.
    pub fn commit(&self) -> Option<&str> {
        let mut segments = self.url.rsplit('/');
        segments.next()?;
        segments.next().filter(|s| !s.is_empty())
    }
}

/// "Mono external" record consumed by the addin packaging repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonoExternal {
    pub url: String,
    pub version: String,
    pub uploaded: bool,
    pub repo: String,
    pub commit: String,
    pub tag: String,
    pub product_id: String,
    pub release_id: String,
    pub sha256: String,
    pub md5: String,
    pub size: u64,
}

impl MonoExternal {
    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let commit = artifact.commit().ok_or_else(|| {
            BumpError::KeyNotFound(format!("commit in artifact url {}", artifact.url))
        })?;

        Ok(Self {
            url: artifact.url.clone(),
            version: artifact.version.clone(),
            uploaded: true,
            repo: MONO_GIT_REPO.to_string(),
            commit: commit.to_string(),
            tag: String::new(),
            product_id: artifact.product_id.clone(),
            release_id: artifact.release_id.clone(),
            sha256: artifact.sha256.clone(),
            md5: artifact.md5.clone(),
            size: artifact.size,
        })
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds the record from the first entry of an artifacts listing.
pub fn mono_external_from_artifacts(json: &str) -> Result<MonoExternal> {
    let artifacts: Vec<Artifact> = serde_json::from_str(json)?;
    let first = artifacts
        .first()
        .ok_or_else(|| BumpError::KeyNotFound("artifact entry in empty listing".to_string()))?;
    log::debug!("Using artifact {} ({} total)", first.url, artifacts.len());
    MonoExternal::from_artifact(first)
}
