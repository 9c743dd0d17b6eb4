//! Validation and verification of command-line input.

pub mod preflight;
pub mod rules;

pub use preflight::{check_git_status, check_working_dir, preflight_publish};
pub use rules::{parse_pr_number, repo_name, require, validate_repo_slug};
