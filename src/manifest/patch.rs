//! Format-preserving manifest patching.
//!
//! The patchers stream the target document through [`NodeReader`] and copy every
//! node's raw text to the output, rebuilding only the nodes an update touches. With an
//! empty update set the output is byte-identical to the input.

use super::events::{Node, NodeEvent, NodeReader};
use super::{
    COHERENT_PARENT, DEPENDENCY, DependencyManifest, DependencyRecord, NAME, PropertyManifest,
    SHA, URI, VERSION, is_version_value, package_key,
};
use crate::error::{BumpError, Result};
use quick_xml::escape::{escape, partial_escape};
use std::collections::BTreeSet;
use std::ops::Range;

/// Result of patching a property list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPatch {
    /// The rewritten document.
    pub document: String,
    /// Old value of every element that matched an update key.
    pub previous: PropertyManifest,
    /// Keys whose text was actually replaced, with the new value.
    pub applied: PropertyManifest,
    /// Keys that matched but were left alone because their current text is not a
    /// literal version.
    pub guarded: BTreeSet<String>,
}

impl PropertyPatch {
    pub fn is_unchanged(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Result of patching a dependency list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyPatch {
    /// The rewritten document.
    pub document: String,
    /// Record as it was before patching, for every rewritten dependency.
    pub previous: DependencyManifest,
}

/// Rewrites the text of property elements named in `updates`.
///
/// With `translate` set, element names are compared through [`package_key`]. Text is
/// only replaced when the current value starts with a digit, so a property defined in
/// terms of another (`$(OtherVersion)`) is never flattened into a literal.
pub fn patch_properties(
    input: &str,
    updates: &PropertyManifest,
    translate: bool,
) -> Result<PropertyPatch> {
    let mut reader = NodeReader::new(input);
    let mut patch = PropertyPatch {
        document: String::with_capacity(input.len()),
        ..Default::default()
    };

    while let Some(node) = reader.next_node()? {
        patch.document.push_str(node.raw);

        let NodeEvent::ElementStart { name, empty, .. } = &node.event else {
            continue;
        };
        let key = if translate {
            package_key(name)
        } else {
            name.clone()
        };
        let Some(value) = updates.get(&key) else {
            continue;
        };

        if *empty {
            patch.previous.insert(key.clone(), String::new());
            patch.guarded.insert(key);
            continue;
        }

        let body = reader.read_body()?;
        if !body.has_children && is_version_value(&body.text) {
            patch.document.push_str(&substitute_text(body.inner, value)?);
            if body.text != *value {
                patch.applied.insert(key.clone(), value.clone());
            }
        } else {
            log::debug!("{} is not a literal version, leaving it alone", key);
            patch.document.push_str(body.inner);
            patch.guarded.insert(key.clone());
        }
        patch.document.push_str(body.end);
        patch.previous.insert(key, body.text);
    }

    Ok(patch)
}

/// Rewrites the `Dependency` entries named in `updates`.
///
/// `Name` and `Version` attributes are rewritten in place, `CoherentParentDependency`
/// is set when the update carries one, and the `Uri` and `Sha` children are replaced.
/// A targeted entry without `Uri` or `Sha` children fails the whole patch with
/// [`BumpError::StructuralIntegrity`].
pub fn patch_dependencies(input: &str, updates: &DependencyManifest) -> Result<DependencyPatch> {
    let mut reader = NodeReader::new(input);
    let mut patch = DependencyPatch {
        document: String::with_capacity(input.len()),
        ..Default::default()
    };

    while let Some(node) = reader.next_node()? {
        let update = match &node.event {
            NodeEvent::ElementStart { name, .. } if name == DEPENDENCY => {
                node.attribute(NAME).and_then(|n| updates.get(n))
            }
            _ => None,
        };

        match update {
            Some(record) => {
                let previous = rewrite_dependency(&mut reader, &node, record, &mut patch.document)?;
                patch.previous.insert(record.name.clone(), previous);
            }
            None => patch.document.push_str(node.raw),
        }
    }

    Ok(patch)
}

fn rewrite_dependency(
    reader: &mut NodeReader<'_>,
    start: &Node<'_>,
    record: &DependencyRecord,
    out: &mut String,
) -> Result<DependencyRecord> {
    let mut tag = set_attribute(start.raw, NAME, &record.name)?;
    tag = set_attribute(&tag, VERSION, &record.version)?;
    if let Some(parent) = &record.coherent_parent {
        tag = set_attribute(&tag, COHERENT_PARENT, parent)?;
    }
    out.push_str(&tag);

    let mut previous = DependencyRecord {
        name: start.attribute(NAME).unwrap_or_default().to_string(),
        version: start.attribute(VERSION).unwrap_or_default().to_string(),
        coherent_parent: start.attribute(COHERENT_PARENT).map(str::to_string),
        ..Default::default()
    };

    if matches!(start.event, NodeEvent::ElementStart { empty: true, .. }) {
        return Err(missing_children(record, false, false));
    }

    let depth = reader.depth();
    let (mut saw_uri, mut saw_sha) = (false, false);

    loop {
        let node = reader
            .next_node()?
            .ok_or_else(|| BumpError::Parse("unexpected end of document".to_string()))?;

        match &node.event {
            NodeEvent::ElementEnd { .. } if reader.depth() < depth => {
                if !(saw_uri && saw_sha) {
                    return Err(missing_children(record, saw_uri, saw_sha));
                }
                out.push_str(node.raw);
                return Ok(previous);
            }
            NodeEvent::ElementStart { name, empty, .. }
                if reader.depth() == depth + usize::from(!empty)
                    && (name == URI || name == SHA) =>
            {
                let is_uri = name == URI;
                let value = if is_uri { &record.uri } else { &record.sha };
                let old = replace_text(reader, &node, *empty, value, out)?;
                if is_uri {
                    previous.uri = old;
                    saw_uri = true;
                } else {
                    previous.sha = old;
                    saw_sha = true;
                }
            }
            NodeEvent::ElementStart { empty: false, .. } => {
                out.push_str(node.raw);
                let body = reader.read_body()?;
                out.push_str(body.inner);
                out.push_str(body.end);
            }
            _ => out.push_str(node.raw),
        }
    }
}

/// Writes `start` with `value` as its only content; returns the old text.
fn replace_text(
    reader: &mut NodeReader<'_>,
    start: &Node<'_>,
    empty: bool,
    value: &str,
    out: &mut String,
) -> Result<String> {
    let NodeEvent::ElementStart { name, .. } = &start.event else {
        return Err(BumpError::Parse("expected an element".to_string()));
    };

    if empty {
        let open = start.raw.trim_end_matches('>').trim_end_matches('/').trim_end();
        out.push_str(open);
        out.push('>');
        out.push_str(&partial_escape(value));
        out.push_str(&format!("</{}>", name));
        return Ok(String::new());
    }

    let body = reader.read_body()?;
    out.push_str(start.raw);
    out.push_str(&substitute_text(body.inner, value)?);
    out.push_str(body.end);
    Ok(body.text)
}

/// Rebuilds an element body with its text replaced by `value`. The first text or
/// CDATA node takes the new value, later ones are dropped, and comments, processing
/// instructions and child elements stay where they were.
fn substitute_text(inner: &str, value: &str) -> Result<String> {
    let mut reader = NodeReader::new(inner);
    let mut out = String::with_capacity(inner.len() + value.len());
    let mut written = false;

    while let Some(node) = reader.next_node()? {
        match node.event {
            NodeEvent::Text { .. } | NodeEvent::CData { .. } if reader.depth() == 0 => {
                if !written {
                    out.push_str(&partial_escape(value));
                    written = true;
                }
            }
            _ => out.push_str(node.raw),
        }
    }

    if !written {
        out.insert_str(0, &partial_escape(value));
    }
    Ok(out)
}

/// Sets `key` to `value` inside a raw start tag, keeping the quote style and all
/// surrounding whitespace. A missing attribute is appended before the tag closes.
fn set_attribute(tag: &str, key: &str, value: &str) -> Result<String> {
    let escaped = escape(value);

    if let Some((_, span)) = attribute_spans(tag)?.into_iter().find(|(name, _)| *name == key) {
        return Ok(format!(
            "{}{}{}",
            &tag[..span.start],
            escaped,
            &tag[span.end..]
        ));
    }

    let close = if tag.ends_with("/>") {
        tag.len() - 2
    } else {
        tag.len() - 1
    };
    let head = tag[..close].trim_end();
    Ok(format!(
        "{} {}=\"{}\"{}",
        head,
        key,
        escaped,
        &tag[head.len()..]
    ))
}

/// Splits a raw start tag into attribute names and the byte ranges of their values,
/// quotes excluded. Quoted values are skipped whole, so markup inside a value is
/// never mistaken for another attribute.
fn attribute_spans(tag: &str) -> Result<Vec<(&str, Range<usize>)>> {
    let malformed = || BumpError::Parse(format!("malformed start tag {}", tag.trim()));
    let bytes = tag.as_bytes();
    let mut pos = tag.find('<').ok_or_else(malformed)? + 1;
    let mut spans = Vec::new();

    while pos < bytes.len()
        && !bytes[pos].is_ascii_whitespace()
        && !matches!(bytes[pos], b'/' | b'>')
    {
        pos += 1;
    }

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return Err(malformed()),
            Some(b'/' | b'>') => return Ok(spans),
            Some(_) => {}
        }

        let name_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'=' {
            pos += 1;
        }
        let name = &tag[name_start..pos];

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(malformed());
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err(malformed()),
        };
        let value_start = pos + 1;
        let value_end = bytes[value_start..]
            .iter()
            .position(|&b| b == quote)
            .map(|i| value_start + i)
            .ok_or_else(malformed)?;
        spans.push((name, value_start..value_end));
        pos = value_end + 1;
    }
}

fn missing_children(record: &DependencyRecord, saw_uri: bool, saw_sha: bool) -> BumpError {
    let missing = [(URI, saw_uri), (SHA, saw_sha)]
        .into_iter()
        .filter(|(_, seen)| !seen)
        .map(|(name, _)| name)
        .collect();
    BumpError::StructuralIntegrity {
        dependency: record.name.clone(),
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project>
  <!-- Keep in sync with toolset -->
  <PropertyGroup>
    <FooVersion>1.0.0</FooVersion>
    <BarPackageVersion>2.0.0</BarPackageVersion>
    <BazVersion>$(FooVersion)</BazVersion>
    <Unrelated>keep</Unrelated>
  </PropertyGroup>
</Project>
"#;

    const DETAILS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Dependencies>
  <ProductDependencies>
    <Dependency Name="A" Version="1.0">
      <Uri>https://example.com/a</Uri>
      <Sha>aaaa</Sha>
    </Dependency>
    <Dependency Name='B' Version='1.0'>
      <Uri>https://example.com/b</Uri>
      <Sha>bbbb</Sha>
    </Dependency>
  </ProductDependencies>
</Dependencies>
"#;

    fn props(entries: &[(&str, &str)]) -> PropertyManifest {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn deps(records: Vec<DependencyRecord>) -> DependencyManifest {
        records.into_iter().map(|r| (r.name.clone(), r)).collect()
    }

    #[test]
    fn test_empty_updates_are_byte_identical() {
        let patch = patch_properties(PROPS, &PropertyManifest::new(), true).unwrap();
        assert_eq!(patch.document, PROPS);
        assert!(patch.is_unchanged());

        let patch = patch_dependencies(DETAILS, &DependencyManifest::new()).unwrap();
        assert_eq!(patch.document, DETAILS);
        assert!(patch.previous.is_empty());
    }

    #[test]
    fn test_patch_properties_replaces_text_only() {
        let updates = props(&[("FooPackageVersion", "1.1.0")]);
        let patch = patch_properties(PROPS, &updates, true).unwrap();

        assert_eq!(
            patch.document,
            PROPS.replace("<FooVersion>1.0.0<", "<FooVersion>1.1.0<")
        );
        assert_eq!(patch.previous["FooPackageVersion"], "1.0.0");
        assert_eq!(patch.applied["FooPackageVersion"], "1.1.0");
    }

    #[test]
    fn test_patch_properties_without_translation() {
        let updates = props(&[("FooPackageVersion", "1.1.0")]);
        let patch = patch_properties(PROPS, &updates, false).unwrap();
        assert_eq!(patch.document, PROPS);
        assert!(patch.previous.is_empty());
    }

    #[test]
    fn test_patch_properties_guards_placeholders() {
        let updates = props(&[("BazPackageVersion", "3.0.0")]);
        let patch = patch_properties(PROPS, &updates, true).unwrap();

        assert_eq!(patch.document, PROPS);
        assert_eq!(patch.previous["BazPackageVersion"], "$(FooVersion)");
        assert!(patch.guarded.contains("BazPackageVersion"));
        assert!(patch.is_unchanged());
    }

    #[test]
    fn test_patch_properties_same_value_is_not_applied() {
        let updates = props(&[("BarPackageVersion", "2.0.0")]);
        let patch = patch_properties(PROPS, &updates, true).unwrap();
        assert_eq!(patch.document, PROPS);
        assert!(patch.is_unchanged());
        assert_eq!(patch.previous["BarPackageVersion"], "2.0.0");
    }

    #[test]
    fn test_patch_dependencies_rewrites_target_only() {
        let updates = deps(vec![DependencyRecord::new(
            "A",
            "2.0",
            "https://example.com/a2",
            "cccc",
        )]);
        let patch = patch_dependencies(DETAILS, &updates).unwrap();

        let expected = DETAILS
            .replace(r#"Name="A" Version="1.0""#, r#"Name="A" Version="2.0""#)
            .replace("https://example.com/a<", "https://example.com/a2<")
            .replace("aaaa", "cccc");
        assert_eq!(patch.document, expected);

        let previous = &patch.previous["A"];
        assert_eq!(previous.version, "1.0");
        assert_eq!(previous.uri, "https://example.com/a");
        assert_eq!(previous.sha, "aaaa");
    }

    #[test]
    fn test_patch_dependencies_keeps_quote_style() {
        let updates = deps(vec![DependencyRecord::new(
            "B",
            "1.5",
            "https://example.com/b",
            "bbbb",
        )]);
        let patch = patch_dependencies(DETAILS, &updates).unwrap();
        assert!(patch.document.contains("<Dependency Name='B' Version='1.5'>"));
    }

    #[test]
    fn test_patch_dependencies_adds_coherent_parent() {
        let mut record = DependencyRecord::new("A", "2.0", "https://example.com/a", "aaaa");
        record.coherent_parent = Some("B".to_string());
        let patch = patch_dependencies(DETAILS, &deps(vec![record])).unwrap();
        assert!(
            patch
                .document
                .contains(r#"<Dependency Name="A" Version="2.0" CoherentParentDependency="B">"#)
        );
    }

    #[test]
    fn test_patch_dependencies_missing_sha_fails() {
        let input = r#"<Dependencies><Dependency Name="A" Version="1.0"><Uri>u</Uri></Dependency></Dependencies>"#;
        let updates = deps(vec![DependencyRecord::new("A", "2.0", "u", "s")]);

        match patch_dependencies(input, &updates) {
            Err(BumpError::StructuralIntegrity {
                dependency,
                missing,
            }) => {
                assert_eq!(dependency, "A");
                assert_eq!(missing, vec![SHA]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_patch_dependencies_self_closing_fails() {
        let input = r#"<Dependencies><Dependency Name="A" Version="1.0" /></Dependencies>"#;
        let updates = deps(vec![DependencyRecord::new("A", "2.0", "u", "s")]);
        assert!(matches!(
            patch_dependencies(input, &updates),
            Err(BumpError::StructuralIntegrity { .. })
        ));
    }

    #[test]
    fn test_patch_dependencies_expands_empty_children() {
        let input = r#"<Dependencies><Dependency Name="A" Version="1.0"><Uri /><Sha/></Dependency></Dependencies>"#;
        let updates = deps(vec![DependencyRecord::new("A", "1.0", "u", "s")]);
        let patch = patch_dependencies(input, &updates).unwrap();
        assert_eq!(
            patch.document,
            r#"<Dependencies><Dependency Name="A" Version="1.0"><Uri>u</Uri><Sha>s</Sha></Dependency></Dependencies>"#
        );
    }

    #[test]
    fn test_set_attribute() {
        assert_eq!(
            set_attribute(r#"<D Name="x" Version="1">"#, "Version", "2").unwrap(),
            r#"<D Name="x" Version="2">"#
        );
        assert_eq!(
            set_attribute(r#"<D Name="x" />"#, "Version", "2").unwrap(),
            r#"<D Name="x" Version="2" />"#
        );
        assert_eq!(
            set_attribute(r#"<D XName="y" Name = "x">"#, "Name", "z").unwrap(),
            r#"<D XName="y" Name = "z">"#
        );
        assert_eq!(
            set_attribute("<D\n    Name='x'\n    Version='1'>", "Version", "2").unwrap(),
            "<D\n    Name='x'\n    Version='2'>"
        );
    }

    #[test]
    fn test_set_attribute_ignores_names_inside_values() {
        assert_eq!(
            set_attribute(r#"<D Pinned="x Version='9'" Name="Bar" Version="3.0">"#, "Version", "4.0")
                .unwrap(),
            r#"<D Pinned="x Version='9'" Name="Bar" Version="4.0">"#
        );
        assert_eq!(
            set_attribute(r#"<D Note='Version="1"'>"#, "Version", "2").unwrap(),
            r#"<D Note='Version="1"' Version="2">"#
        );
    }

    #[test]
    fn test_attribute_spans_rejects_unterminated_value() {
        assert!(matches!(
            attribute_spans(r#"<D Name="x>"#),
            Err(BumpError::Parse(_))
        ));
    }

    #[test]
    fn test_patch_dependencies_with_version_text_in_other_attribute() {
        let input = r#"<Dependencies>
  <Dependency Pinned="x Version='9'" Name="Bar" Version="3.0">
    <Uri>u</Uri>
    <Sha>s</Sha>
  </Dependency>
</Dependencies>
"#;
        let updates = deps(vec![DependencyRecord::new("Bar", "3.1", "u2", "s2")]);
        let patch = patch_dependencies(input, &updates).unwrap();

        assert_eq!(
            patch.document,
            input
                .replace(r#"Version="3.0""#, r#"Version="3.1""#)
                .replace("<Uri>u<", "<Uri>u2<")
                .replace("<Sha>s<", "<Sha>s2<")
        );
        assert_eq!(patch.previous["Bar"].version, "3.0");
    }

    #[test]
    fn test_patch_properties_keeps_nested_comment() {
        let input = "<Project><PropertyGroup><FooVersion>1.0.0<!-- pinned --></FooVersion></PropertyGroup></Project>";
        let updates = props(&[("FooVersion", "1.1.0")]);
        let patch = patch_properties(input, &updates, false).unwrap();

        assert_eq!(
            patch.document,
            "<Project><PropertyGroup><FooVersion>1.1.0<!-- pinned --></FooVersion></PropertyGroup></Project>"
        );
        assert_eq!(patch.applied["FooVersion"], "1.1.0");
    }

    #[test]
    fn test_patch_dependencies_keeps_comment_in_sha() {
        let input = r#"<Dependencies><Dependency Name="A" Version="1.0"><Uri>u</Uri><Sha><!-- from build -->aaaa</Sha></Dependency></Dependencies>"#;
        let updates = deps(vec![DependencyRecord::new("A", "1.0", "u", "bbbb")]);
        let patch = patch_dependencies(input, &updates).unwrap();
        assert!(patch.document.contains("<Sha><!-- from build -->bbbb</Sha>"));
    }

    #[test]
    fn test_byte_order_mark_survives_patching() {
        let input = format!("\u{feff}{}", PROPS);
        let updates = props(&[("FooPackageVersion", "1.1.0")]);
        let patch = patch_properties(&input, &updates, true).unwrap();

        assert_eq!(
            patch.document,
            input.replace("<FooVersion>1.0.0<", "<FooVersion>1.1.0<")
        );
        assert!(patch.document.ends_with("</Project>\n"));

        let input = format!("\u{feff}{}", DETAILS);
        let updates = deps(vec![DependencyRecord::new("A", "2.0", "https://example.com/a", "aaaa")]);
        let patch = patch_dependencies(&input, &updates).unwrap();
        assert!(patch.document.starts_with('\u{feff}'));
        assert!(patch.document.contains(r#"<Dependency Name="A" Version="2.0">"#));
        assert!(patch.document.ends_with("</Dependencies>\n"));
    }

    #[test]
    fn test_unusual_markup_round_trips() {
        let props_input = String::from(
            "\u{feff}<?xml version=\"1.0\"?>\n<!DOCTYPE Project>\n<?build phase=\"eng\"?>\n<Project>\n  <PropertyGroup>\n    <Notes><![CDATA[<b>not markup</b>]]></Notes>\n    <FooVersion>1.0.0</FooVersion>\n  </PropertyGroup>\n</Project>\n"
        );
        let patch = patch_properties(&props_input, &PropertyManifest::new(), true).unwrap();
        assert_eq!(patch.document, props_input);

        let deps_input = String::from(
            "\u{feff}<?xml version=\"1.0\"?>\n<!DOCTYPE Dependencies>\n<?build phase=\"eng\"?>\n<Dependencies>\n  <Dependency Pinned=\"x Version='9'\" Name=\"A\" Version=\"1.0\">\n    <Uri><![CDATA[https://example.com/a?x=1&y=2]]></Uri>\n    <Sha>aaaa</Sha>\n  </Dependency>\n</Dependencies>\n"
        );
        let patch = patch_dependencies(&deps_input, &DependencyManifest::new()).unwrap();
        assert_eq!(patch.document, deps_input);
    }
}
