//! Manifest readers.
//!
//! Readers are tolerant of content they do not understand: unrelated elements are
//! skipped together with their subtrees. They are strict about well-formedness, so a
//! malformed document fails with [`BumpError::Parse`] instead of yielding a partial
//! snapshot.

use super::events::{NodeEvent, NodeReader};
use super::{
    COHERENT_PARENT, DEPENDENCY, DependencyManifest, DependencyRecord, NAME, PropertyManifest,
    SHA, URI, VERSION, version_property_key,
};
use crate::error::{BumpError, Result};
use std::io::Read;

/// Elements that only group `Dependency` entries.
const DEPENDENCY_CONTAINERS: &[&str] = &[
    "Dependencies",
    "ProductDependencies",
    "ToolsetDependencies",
];

const PROJECT: &str = "Project";
const PROPERTY_GROUP: &str = "PropertyGroup";

/// Reads a dependency list from a stream.
pub fn read_dependencies(mut stream: impl Read) -> Result<DependencyManifest> {
    let mut input = String::new();
    stream.read_to_string(&mut input)?;
    parse_dependencies(&input)
}

/// Reads a property list from a stream.
pub fn read_properties(mut stream: impl Read) -> Result<PropertyManifest> {
    let mut input = String::new();
    stream.read_to_string(&mut input)?;
    parse_properties(&input)
}

/// Parses a dependency list.
///
/// Each `Dependency` element yields one record keyed by its name. Fields may be
/// given as attributes or as child elements; the last occurrence wins.
pub fn parse_dependencies(input: &str) -> Result<DependencyManifest> {
    let mut reader = NodeReader::new(input);
    let mut manifest = DependencyManifest::new();

    while let Some(node) = reader.next_node()? {
        let NodeEvent::ElementStart {
            name,
            attributes,
            empty,
        } = node.event
        else {
            continue;
        };

        if name == DEPENDENCY {
            let record = read_dependency(&mut reader, &attributes, empty)?;
            log::debug!("dependency {} => {}", record.name, record.version);
            manifest.insert(record.name.clone(), record);
        } else if !DEPENDENCY_CONTAINERS.contains(&name.as_str()) && !empty {
            reader.read_body()?;
        }
    }

    Ok(manifest)
}

fn read_dependency(
    reader: &mut NodeReader<'_>,
    attributes: &[(String, String)],
    empty: bool,
) -> Result<DependencyRecord> {
    let mut record = DependencyRecord::default();
    for (key, value) in attributes {
        apply_field(&mut record, key, value.clone());
    }

    if !empty {
        let depth = reader.depth();
        loop {
            let node = reader
                .next_node()?
                .ok_or_else(|| BumpError::Parse("unexpected end of document".to_string()))?;

            match node.event {
                NodeEvent::ElementEnd { .. } if reader.depth() < depth => break,
                NodeEvent::ElementStart {
                    name, empty: false, ..
                } => {
                    let body = reader.read_body()?;
                    apply_field(&mut record, &name, body.text);
                }
                _ => {}
            }
        }
    }

    if record.name.is_empty() {
        return Err(BumpError::Parse(format!(
            "<{}> without a {} (version {:?})",
            DEPENDENCY, NAME, record.version
        )));
    }

    Ok(record)
}

fn apply_field(record: &mut DependencyRecord, key: &str, value: String) {
    match key {
        NAME => record.name = value,
        VERSION => record.version = value,
        URI => record.uri = value,
        SHA => record.sha = value,
        COHERENT_PARENT => record.coherent_parent = Some(value).filter(|v| !v.is_empty()),
        _ => {}
    }
}

/// Parses a property list.
///
/// Only elements directly inside a `PropertyGroup` are considered. An element is kept
/// when its name contains `Version` and its text starts with a digit; its key is the
/// translated [`package_key`](super::package_key). Later definitions of the same key
/// replace earlier ones.
pub fn parse_properties(input: &str) -> Result<PropertyManifest> {
    let mut reader = NodeReader::new(input);
    let mut manifest = PropertyManifest::new();
    let mut group_depth = None;

    while let Some(node) = reader.next_node()? {
        match node.event {
            NodeEvent::ElementStart { name, empty, .. } if name == PROPERTY_GROUP => {
                if !empty {
                    group_depth = Some(reader.depth());
                }
            }
            NodeEvent::ElementStart { name, .. } if name == PROJECT => {}
            NodeEvent::ElementStart { name, empty, .. }
                if group_depth.is_some_and(|d| reader.depth() == d + usize::from(!empty)) =>
            {
                let value = if empty {
                    String::new()
                } else {
                    reader.read_body()?.text
                };
                if let Some(key) = version_property_key(&name, &value) {
                    log::debug!("property {} => {}", key, value);
                    manifest.insert(key, value);
                }
            }
            NodeEvent::ElementStart { empty: false, .. } => {
                reader.read_body()?;
            }
            NodeEvent::ElementEnd { name } if name == PROPERTY_GROUP => group_depth = None,
            _ => {}
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Dependencies>
  <ProductDependencies>
    <Dependency Name="Microsoft.NET.Sdk" Version="3.1.100-preview3.19553.2">
      <Uri>https://github.com/dotnet/sdk</Uri>
      <Sha>a1b2c3</Sha>
    </Dependency>
  </ProductDependencies>
  <ToolsetDependencies>
    <Dependency Name="Microsoft.DotNet.Arcade.Sdk" Version="1.0.0-beta.19552.1" CoherentParentDependency="Microsoft.NET.Sdk">
      <Uri>https://github.com/dotnet/arcade</Uri>
      <Sha>d4e5f6</Sha>
      <Notes><Sha>not-this-one</Sha></Notes>
    </Dependency>
  </ToolsetDependencies>
</Dependencies>
"#;

    const PROPS: &str = r#"<Project>
  <Import Project="Other.props" />
  <PropertyGroup>
    <VersionPrefix>16.5.0</VersionPrefix>
    <FooVersion>1.0.0</FooVersion>
    <BarPackageVersion>2.0.0</BarPackageVersion>
    <BazVersion>$(FooVersion)</BazVersion>
    <Configuration>Release</Configuration>
  </PropertyGroup>
  <ItemGroup>
    <QuxVersion>9.9.9</QuxVersion>
  </ItemGroup>
  <PropertyGroup Condition="'$(X)' == 'true'">
    <FooVersion>1.1.0</FooVersion>
  </PropertyGroup>
</Project>
"#;

    #[test]
    fn test_parse_dependencies() {
        let manifest = parse_dependencies(DETAILS).unwrap();
        assert_eq!(manifest.len(), 2);

        let sdk = &manifest["Microsoft.NET.Sdk"];
        assert_eq!(sdk.version, "3.1.100-preview3.19553.2");
        assert_eq!(sdk.uri, "https://github.com/dotnet/sdk");
        assert_eq!(sdk.sha, "a1b2c3");
        assert_eq!(sdk.coherent_parent, None);

        let arcade = &manifest["Microsoft.DotNet.Arcade.Sdk"];
        assert_eq!(arcade.sha, "d4e5f6");
        assert_eq!(arcade.coherent_parent.as_deref(), Some("Microsoft.NET.Sdk"));
    }

    #[test]
    fn test_dependency_fields_from_children() {
        let input = "<Dependencies><Dependency><Name>A</Name><Version>1.0</Version><Uri>u</Uri></Dependency></Dependencies>";
        let manifest = parse_dependencies(input).unwrap();
        assert_eq!(manifest["A"].version, "1.0");
        assert_eq!(manifest["A"].uri, "u");
        assert_eq!(manifest["A"].sha, "");
    }

    #[test]
    fn test_dependency_without_name_fails() {
        let input = r#"<Dependencies><Dependency Version="1.0" /></Dependencies>"#;
        assert!(matches!(
            parse_dependencies(input),
            Err(BumpError::Parse(_))
        ));
    }

    #[test]
    fn test_dependencies_outside_containers_are_skipped() {
        let input = r#"<Dependencies><Other><Dependency Name="Hidden" Version="1" /></Other></Dependencies>"#;
        assert!(parse_dependencies(input).unwrap().is_empty());
    }

    #[test]
    fn test_parse_properties() {
        let manifest = parse_properties(PROPS).unwrap();

        assert_eq!(manifest["FooPackageVersion"], "1.1.0");
        assert_eq!(manifest["BarPackageVersion"], "2.0.0");
        assert!(manifest.contains_key("PackageVersionPrefix"));
        assert!(!manifest.contains_key("BazPackageVersion"));
        assert!(!manifest.contains_key("Configuration"));
        assert!(!manifest.contains_key("QuxPackageVersion"));
    }

    #[test]
    fn test_read_from_stream() {
        let manifest = read_properties(PROPS.as_bytes()).unwrap();
        assert_eq!(manifest.len(), 3);
        let manifest = read_dependencies(DETAILS.as_bytes()).unwrap();
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let manifest = parse_properties(&format!("\u{feff}{}", PROPS)).unwrap();
        assert_eq!(manifest, parse_properties(PROPS).unwrap());

        let manifest = parse_dependencies(&format!("\u{feff}{}", DETAILS)).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest["Microsoft.NET.Sdk"].sha, "a1b2c3");
    }

    #[test]
    fn test_malformed_properties_fail() {
        let input = "<Project><PropertyGroup><FooVersion>1.0</PropertyGroup></Project>";
        assert!(matches!(parse_properties(input), Err(BumpError::Parse(_))));
    }
}
