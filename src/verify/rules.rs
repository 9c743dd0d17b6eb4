//! Validation rules for command-line values.
//!
//! Pure functions with no I/O or side effects.

use crate::error::{BumpError, Result};

/// Validates an `owner/name` repository slug.
///
/// ## Rules
/// - Exactly one `/`
/// - Owner and name are non-empty
/// - Only `[a-zA-Z0-9._-]` on either side
pub fn validate_repo_slug(option: &str, slug: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(BumpError::InvalidOption(
            option.to_string(),
            format!("'{}' {}", slug, reason),
        ))
    };

    let Some((owner, name)) = slug.split_once('/') else {
        return invalid("must be of the form owner/name");
    };
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return invalid("must be of the form owner/name");
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if let Some(ch) = slug.chars().find(|&c| c != '/' && !allowed(c)) {
        return invalid(&format!("contains invalid character '{}'", ch));
    }

    Ok(())
}

/// Name of the repository in an `owner/name` slug.
pub fn repo_name(slug: &str) -> &str {
    slug.split_once('/').map_or(slug, |(_, name)| name)
}

/// Parses a pull request number given on the command line.
pub fn parse_pr_number(value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            BumpError::InvalidOption(
                "pr_number".to_string(),
                format!("'{}' should be a number", value),
            )
        })
}

/// Fails when a required option is missing or blank.
pub fn require<'a>(option: &str, value: Option<&'a str>, reason: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BumpError::InvalidOption(
            option.to_string(),
            reason.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(validate_repo_slug("--mono-repo", "mono/mono").is_ok());
        assert!(validate_repo_slug("--mono-repo", "dotnet/runtime").is_ok());
        assert!(validate_repo_slug("--mono-repo", "some-user/my_repo.rs").is_ok());
    }

    #[test]
    fn test_invalid_slugs() {
        for slug in ["mono", "/mono", "mono/", "a/b/c", "mono/mo no", ""] {
            assert!(
                matches!(
                    validate_repo_slug("--mono-repo", slug),
                    Err(BumpError::InvalidOption(ref option, _)) if option == "--mono-repo"
                ),
                "{} should be rejected",
                slug
            );
        }
    }

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("mono/mono"), "mono");
        assert_eq!(repo_name("dotnet/runtime"), "runtime");
        assert_eq!(repo_name("bare"), "bare");
    }

    #[test]
    fn test_parse_pr_number() {
        assert_eq!(parse_pr_number("17655").unwrap(), 17655);
        assert!(parse_pr_number("abc").is_err());
        assert!(parse_pr_number("-1").is_err());
        assert!(parse_pr_number("0").is_err());
    }

    #[test]
    fn test_require() {
        assert_eq!(require("--git-user-name", Some("radical"), "x").unwrap(), "radical");
        assert!(require("--git-user-name", Some("  "), "x").is_err());
        assert!(require("--git-user-name", None, "x").is_err());
    }
}
