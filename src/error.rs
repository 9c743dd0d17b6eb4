//! Error types for eng-bump.
//!
//! All operations return `Result<T>` which aliases `Result<T, BumpError>`.

use thiserror::Error;

/// Errors from bump operations.
#[derive(Debug, Error)]
pub enum BumpError {
    /// Remote content could not be retrieved (network, HTTP status, missing ref or path).
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Malformed manifest document.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A targeted dependency entry does not have the expected shape.
    ///
    /// Raised before anything is written, so a half-applied manifest never
    /// reaches a commit.
    #[error("Dependency '{dependency}' is missing expected child element(s): {}", missing.join(", "))]
    StructuralIntegrity {
        dependency: String,
        missing: Vec<&'static str>,
    },

    /// A required pinned reference could not be located.
    #[error("Not found: {0}")]
    KeyNotFound(String),

    /// `git` exited with a non-zero status.
    #[error("`{command}` failed with exit code {code}: {}", stderr.trim())]
    Vcs {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// Pull request creation or update was rejected.
    #[error("Pull request error: {0}")]
    PullRequest(String),

    /// Invalid command-line option or option combination.
    #[error("Invalid option '{0}': {1}")]
    InvalidOption(String, String),

    /// File system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON payload could not be decoded or encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation failed (indicates bug).
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// HTTP client failure that is not tied to a particular fetch.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rollback failed after a write error.
    #[error("Rollback failed: {0}")]
    RollbackFailed(String),

    /// Unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<quick_xml::Error> for BumpError {
    fn from(e: quick_xml::Error) -> Self {
        BumpError::Parse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for BumpError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        BumpError::Parse(e.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for BumpError {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        BumpError::Parse(e.to_string())
    }
}

/// Result type alias for eng-bump operations.
pub type Result<T> = std::result::Result<T, BumpError>;
