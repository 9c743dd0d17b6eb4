//! Dependency manifests: reading, diffing and format-preserving patching.
//!
//! Two document shapes are understood:
//!
//! - **Dependency list** (`eng/Version.Details.xml`): `Dependency` elements with
//!   `Name`/`Version`/`CoherentParentDependency` attributes and `Uri`/`Sha` children.
//! - **Property list** (`eng/Versions.props`, `eng/Packages.props`): elements grouped
//!   under `PropertyGroup`, each element name/text pair a candidate version pin.
//!
//! Both are read into immutable snapshots ([`DependencyManifest`], [`PropertyManifest`]),
//! compared with [`diff`], and applied to a target document with [`patch`], which
//! leaves every byte not covered by an update untouched.

pub mod diff;
pub mod events;
pub mod patch;
pub mod reader;

use std::collections::BTreeMap;

pub use diff::{
    ROSLYN_PACKAGE_PROPERTY, alias_properties, detail_property_key, diff_dependencies,
    diff_properties,
};
pub use patch::{DependencyPatch, PropertyPatch, patch_dependencies, patch_properties};
pub use reader::{parse_dependencies, parse_properties, read_dependencies, read_properties};

pub(crate) const DEPENDENCY: &str = "Dependency";
pub(crate) const NAME: &str = "Name";
pub(crate) const VERSION: &str = "Version";
pub(crate) const URI: &str = "Uri";
pub(crate) const SHA: &str = "Sha";
pub(crate) const COHERENT_PARENT: &str = "CoherentParentDependency";

/// One tracked external dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyRecord {
    pub name: String,
    pub version: String,
    pub uri: String,
    /// Pinned commit; empty when the manifest does not carry one.
    pub sha: String,
    /// Name of another record this one is versioned in lock-step with.
    pub coherent_parent: Option<String>,
}

impl DependencyRecord {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        uri: impl Into<String>,
        sha: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            uri: uri.into(),
            sha: sha.into(),
            coherent_parent: None,
        }
    }

    /// True when version, uri or sha differ.
    pub fn differs_from(&self, other: &DependencyRecord) -> bool {
        self.version != other.version || self.uri != other.uri || self.sha != other.sha
    }
}

/// Dependency name → record.
pub type DependencyManifest = BTreeMap<String, DependencyRecord>;

/// Property key → value. Keys are case-sensitive.
pub type PropertyManifest = BTreeMap<String, String>;

/// Canonical "package" key of a version property.
///
/// `FooVersion` → `FooPackageVersion`; `FooPackageVersion` is returned unchanged.
/// Keys without `Version` in them are returned unchanged as well.
pub fn package_key(key: &str) -> String {
    if key.ends_with("PackageVersion") {
        key.to_string()
    } else {
        key.replace("Version", "PackageVersion")
    }
}

/// A value looks like a version when it starts with an ASCII digit.
///
/// Placeholders such as `$(SomeOtherVersion)` never qualify.
pub fn is_version_value(value: &str) -> bool {
    value.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Returns the translated key if `key`/`value` form a version property.
pub fn version_property_key(key: &str, value: &str) -> Option<String> {
    (key.contains("Version") && is_version_value(value)).then(|| package_key(key))
}
