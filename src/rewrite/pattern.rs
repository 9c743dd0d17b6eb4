//! Regex-anchored edits of pinned references in plain-text files.
//!
//! Build scripts and pipeline definitions pin revisions inline
//! (`revision = 'abc123'`, `ubuntu-18.04-webassembly-20200827125937-7f8e1e4`).
//! Only the captured span is replaced; the rest of the file is left as is.

use crate::error::Result;
use regex::Regex;

/// Pinned msbuild revision in `packaging/MacSDK/msbuild.py`.
pub const MSBUILD_PY_REVISION: &str = r"revision *= *'([0-9a-fA-F]*)'";

/// NuGet package version in `packaging/MacSDK/nuget.py`.
pub const NUGET_PY_VERSION: &str = r"version *= *'([^']*)'";

/// nuget.exe version in `packaging/MacSDK/nuget.py`.
pub const NUGET_EXE_VERSION: &str = r"version='([0-9\.]*)'";

/// Docker image carrying the Emscripten toolchain.
pub const WEBASSEMBLY_IMAGE: &str = r"ubuntu-[0-9.]+-webassembly-([0-9-a-zA-Z]+)";

/// First capture group of the first match.
pub fn capture_group(contents: &str, pattern: &str) -> Result<Option<String>> {
    let re = Regex::new(pattern)?;
    Ok(re
        .captures(contents)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

/// Entire first match.
pub fn capture_match(contents: &str, pattern: &str) -> Result<Option<String>> {
    let re = Regex::new(pattern)?;
    Ok(re.find(contents).map(|m| m.as_str().to_string()))
}

/// Replaces the first capture group of the first match with `replacement`.
///
/// Returns the old group text and the new contents, or `None` when nothing matches.
pub fn replace_group(
    contents: &str,
    pattern: &str,
    replacement: &str,
) -> Result<Option<(String, String)>> {
    let re = Regex::new(pattern)?;
    let Some(group) = re.captures(contents).and_then(|caps| caps.get(1)) else {
        return Ok(None);
    };

    let mut updated = String::with_capacity(contents.len() + replacement.len());
    updated.push_str(&contents[..group.start()]);
    updated.push_str(replacement);
    updated.push_str(&contents[group.end()..]);

    Ok(Some((group.as_str().to_string(), updated)))
}

/// Replaces every full match with `replacement`, taken literally.
pub fn replace_all_matches(
    contents: &str,
    pattern: &str,
    replacement: &str,
) -> Result<Option<String>> {
    let re = Regex::new(pattern)?;
    if !re.is_match(contents) {
        return Ok(None);
    }
    Ok(Some(
        re.replace_all(contents, regex::NoExpand(replacement))
            .into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSBUILD_PY: &str = "import fileinput\n\nclass MSBuild (GitHubPackage):\n\tdef __init__ (self):\n\t\tGitHubPackage.__init__ (self, 'mono', 'msbuild', '15',\n\t\t\trevision = '4d5c8a3e5b2c5f1f0e6c2f6a1a7d1c0e2f3a4b5c',\n\t\t\tgit_branch = 'mono-2019-08')\n";

    #[test]
    fn test_capture_msbuild_revision() {
        assert_eq!(
            capture_group(MSBUILD_PY, MSBUILD_PY_REVISION).unwrap(),
            Some("4d5c8a3e5b2c5f1f0e6c2f6a1a7d1c0e2f3a4b5c".to_string())
        );
    }

    #[test]
    fn test_replace_group_touches_only_the_capture() {
        let (old, updated) = replace_group(MSBUILD_PY, MSBUILD_PY_REVISION, "abc123")
            .unwrap()
            .unwrap();

        assert_eq!(old, "4d5c8a3e5b2c5f1f0e6c2f6a1a7d1c0e2f3a4b5c");
        assert_eq!(
            updated,
            MSBUILD_PY.replace("4d5c8a3e5b2c5f1f0e6c2f6a1a7d1c0e2f3a4b5c", "abc123")
        );
    }

    #[test]
    fn test_replace_group_no_match() {
        assert_eq!(
            replace_group("nothing here", MSBUILD_PY_REVISION, "abc").unwrap(),
            None
        );
    }

    #[test]
    fn test_nuget_versions() {
        let nuget_py = "class NuGetBinary (Package):\n\tdef __init__(self):\n\t\tPackage.__init__(self, name='NuGet', version='5.4.0', sources=[\n";
        assert_eq!(
            capture_group(nuget_py, NUGET_EXE_VERSION).unwrap(),
            Some("5.4.0".to_string())
        );
        assert_eq!(
            capture_group(nuget_py, NUGET_PY_VERSION).unwrap(),
            Some("5.4.0".to_string())
        );
    }

    #[test]
    fn test_replace_all_webassembly_images() {
        let yml = "  image: ubuntu-18.04-webassembly-20200101-aaaaaaa\n  other: ubuntu-18.04-webassembly-20200101-aaaaaaa\n";
        let image = "ubuntu-18.04-webassembly-20200827125937-7f8e1e4";

        let updated = replace_all_matches(yml, WEBASSEMBLY_IMAGE, image)
            .unwrap()
            .unwrap();

        assert_eq!(updated.matches(image).count(), 2);
        assert!(!updated.contains("aaaaaaa"));
        assert_eq!(replace_all_matches("none", WEBASSEMBLY_IMAGE, image).unwrap(), None);
    }

    #[test]
    fn test_capture_match_returns_whole_match() {
        let json = r#"{"linux": "mcr.microsoft.com/dotnet-buildtools/prereqs:ubuntu-18.04-webassembly-20200827125937-7f8e1e4"}"#;
        assert_eq!(
            capture_match(json, WEBASSEMBLY_IMAGE).unwrap(),
            Some("ubuntu-18.04-webassembly-20200827125937-7f8e1e4".to_string())
        );
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(capture_group("x", "(").is_err());
    }
}
