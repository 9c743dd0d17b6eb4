//! Text rewriting outside of manifests.

pub mod pattern;

pub use pattern::{
    MSBUILD_PY_REVISION, NUGET_EXE_VERSION, NUGET_PY_VERSION, WEBASSEMBLY_IMAGE, capture_group,
    capture_match, replace_all_matches, replace_group,
};
