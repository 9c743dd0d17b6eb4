//! Comparing manifests and deriving update sets.

use super::{DependencyManifest, PropertyManifest, package_key};

/// Compiler package property the consuming repository pins.
pub const ROSLYN_PACKAGE_PROPERTY: &str = "MicrosoftNetCompilersPackageVersion";

/// Compiler package property as published by the source repository.
const ROSLYN_SOURCE_PROPERTY: &str = "MicrosoftNETCoreCompilersPackageVersion";

const NUGET_BUILD_TASKS_PROPERTY: &str = "NuGetBuildTasksPackageVersion";
const NUGET_PACKAGE_PROPERTY: &str = "NuGetPackagePackageVersion";

/// Version prefixes describe the repository's own version and are never synced.
const PREFIX_PROPERTIES: &[&str] = &["PackageVersionPrefix", "VersionPrefix"];

/// Property key a dependency is mirrored under in the property list.
///
/// `Microsoft.Build.Tasks` → `MicrosoftBuildTasksPackageVersion`.
pub fn detail_property_key(name: &str) -> String {
    format!("{}PackageVersion", name.replace('.', ""))
}

/// Applies the fixed alias rules to a source property manifest.
///
/// Some packages are published under one property name and consumed under another,
/// so the source value is duplicated under the consumer's key. Version prefixes are
/// dropped.
pub fn alias_properties(source: &PropertyManifest) -> PropertyManifest {
    let mut aliased = source.clone();

    for prefix in PREFIX_PROPERTIES {
        aliased.remove(*prefix);
    }

    for (from, to) in [
        (NUGET_BUILD_TASKS_PROPERTY, NUGET_PACKAGE_PROPERTY),
        (ROSLYN_SOURCE_PROPERTY, ROSLYN_PACKAGE_PROPERTY),
    ] {
        if let Some(value) = source.get(from) {
            log::debug!("aliasing {} as {} => {}", from, to, value);
            aliased.insert(to.to_string(), value.clone());
        }
    }

    aliased
}

/// Source properties whose value differs from the target's.
///
/// Only keys present in both manifests are considered. With `strip_to_package_key`
/// set, source keys are compared through [`package_key`] so `FooVersion` and
/// `FooPackageVersion` are treated as the same property.
pub fn diff_properties(
    source: &PropertyManifest,
    target: &PropertyManifest,
    strip_to_package_key: bool,
) -> PropertyManifest {
    let mut updates = PropertyManifest::new();

    for (key, value) in source {
        let key = if strip_to_package_key {
            package_key(key)
        } else {
            key.clone()
        };

        match target.get(&key) {
            Some(current) if current != value => {
                log::debug!("{}: {} -> {}", key, current, value);
                updates.insert(key, value.clone());
            }
            _ => {}
        }
    }

    updates
}

/// Source records that differ from the target's in version, uri or sha.
///
/// Dependencies only present on one side are ignored.
pub fn diff_dependencies(
    source: &DependencyManifest,
    target: &DependencyManifest,
) -> DependencyManifest {
    target
        .iter()
        .filter_map(|(name, current)| {
            let wanted = source.get(name)?;
            wanted.differs_from(current).then(|| {
                log::debug!("{}: {} -> {}", name, current.version, wanted.version);
                (name.clone(), wanted.clone())
            })
        })
        .collect()
}
