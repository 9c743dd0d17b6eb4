//! Pull parser over a manifest document.
//!
//! Every [`Node`] carries the exact source slice it was parsed from, so a writer
//! can re-emit untouched nodes byte for byte and only rebuild the few it changes.
//! Concatenating the `raw` slices of all nodes reproduces the input. A leading
//! byte order mark is not a node of its own; it is part of the first node's `raw`.

use crate::error::{BumpError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Typed event for one markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    ElementStart {
        name: String,
        attributes: Vec<(String, String)>,
        /// Self-closing (`<Foo/>`); no matching `ElementEnd` follows.
        empty: bool,
    },
    ElementEnd {
        name: String,
    },
    /// Character data, whitespace included, with entities decoded.
    Text {
        value: String,
    },
    CData {
        value: String,
    },
    Comment,
    Declaration,
    ProcessingInstruction,
    DocType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<'a> {
    pub event: NodeEvent,
    pub raw: &'a str,
}

impl Node<'_> {
    /// Attribute value of an element start node.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match &self.event {
            NodeEvent::ElementStart { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Content of an element between its start and end tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBody<'a> {
    /// Everything between the start and end tag, verbatim.
    pub inner: &'a str,
    /// Direct text and CDATA content, decoded.
    pub text: String,
    /// True when the element has child elements.
    pub has_children: bool,
    /// The closing tag, verbatim.
    pub end: &'a str,
}

const BOM: char = '\u{feff}';

pub struct NodeReader<'a> {
    input: &'a str,
    reader: Reader<&'a [u8]>,
    /// Length of the byte order mark the parser never sees.
    bom_len: usize,
    open: Vec<String>,
    last_start: usize,
    started: bool,
    done: bool,
}

impl<'a> NodeReader<'a> {
    pub fn new(input: &'a str) -> Self {
        let document = input.strip_prefix(BOM).unwrap_or(input);
        Self {
            input,
            reader: Reader::from_str(document),
            bom_len: input.len() - document.len(),
            open: Vec::new(),
            last_start: 0,
            started: false,
            done: false,
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Reads the next node, or `None` at the end of the document.
    pub fn next_node(&mut self) -> Result<Option<Node<'a>>> {
        if self.done {
            return Ok(None);
        }

        let start = if self.started { self.position() } else { 0 };
        self.started = true;
        let event = self.reader.read_event().map_err(|e| {
            BumpError::Parse(format!("at byte {}: {}", self.position(), e))
        })?;
        let end = self.position();
        let raw = self.input.get(start..end).ok_or_else(|| {
            BumpError::Parse(format!("node boundary {}..{} is not valid UTF-8", start, end))
        })?;
        self.last_start = start;

        let event = match event {
            Event::Start(e) => {
                let (name, attributes) = element_parts(&e)?;
                self.open.push(name.clone());
                NodeEvent::ElementStart {
                    name,
                    attributes,
                    empty: false,
                }
            }
            Event::Empty(e) => {
                let (name, attributes) = element_parts(&e)?;
                NodeEvent::ElementStart {
                    name,
                    attributes,
                    empty: true,
                }
            }
            Event::End(e) => {
                let name = utf8(e.name().as_ref())?.to_string();
                match self.open.pop() {
                    Some(open) if open == name => {}
                    Some(open) => {
                        return Err(BumpError::Parse(format!(
                            "expected </{}>, found </{}>",
                            open, name
                        )));
                    }
                    None => {
                        return Err(BumpError::Parse(format!("unexpected </{}>", name)));
                    }
                }
                NodeEvent::ElementEnd { name }
            }
            Event::Text(_) => NodeEvent::Text {
                value: quick_xml::escape::unescape(raw.trim_start_matches(BOM))?.into_owned(),
            },
            Event::CData(e) => NodeEvent::CData {
                value: utf8(&e)?.to_string(),
            },
            Event::Comment(_) => NodeEvent::Comment,
            Event::Decl(_) => NodeEvent::Declaration,
            Event::PI(_) => NodeEvent::ProcessingInstruction,
            Event::DocType(_) => NodeEvent::DocType,
            Event::Eof => {
                self.done = true;
                if let Some(open) = self.open.last() {
                    return Err(BumpError::Parse(format!("unclosed element <{}>", open)));
                }
                return Ok(None);
            }
        };

        Ok(Some(Node { event, raw }))
    }

    /// Consumes the body of the element whose (non-empty) start tag was just read,
    /// up to and including its end tag.
    pub fn read_body(&mut self) -> Result<ElementBody<'a>> {
        let depth = self.depth();
        if depth == 0 {
            return Err(BumpError::Parse("no open element to read".to_string()));
        }

        let input = self.input;
        let inner_start = self.position();
        let mut text = String::new();
        let mut has_children = false;

        loop {
            let node = self.next_node()?.ok_or_else(|| {
                BumpError::Parse("unexpected end of document".to_string())
            })?;

            match node.event {
                NodeEvent::ElementEnd { .. } if self.depth() < depth => {
                    return Ok(ElementBody {
                        inner: &input[inner_start..self.last_start],
                        text,
                        has_children,
                        end: node.raw,
                    });
                }
                NodeEvent::ElementStart { .. } => has_children = true,
                NodeEvent::Text { value } | NodeEvent::CData { value }
                    if self.depth() == depth =>
                {
                    text.push_str(&value);
                }
                _ => {}
            }
        }
    }

    /// Offset into the original input, byte order mark included.
    fn position(&self) -> usize {
        self.bom_len + self.reader.buffer_position() as usize
    }
}

fn element_parts(e: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>)> {
    let name = utf8(e.name().as_ref())?.to_string();
    let mut attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = quick_xml::escape::unescape(utf8(&attr.value)?)?.into_owned();
        attributes.push((key, value));
    }

    Ok((name, attributes))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| BumpError::Parse(e.to_string()))
}
