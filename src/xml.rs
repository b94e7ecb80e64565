//! Typed XML tree.
//!
//! Documents are built as [`Element`] values, field by field, and written
//! once with `quick-xml`. Text and attribute values are escaped by the writer
//! as they are emitted, so no interpolated value can break the markup.
//!
//! [`check_well_formed`] re-reads serialized text and reports the first
//! structural problem with the parser's diagnostic.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed XML: {0}")]
    Malformed(String),
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Shorthand for an element holding only text.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).text(text)
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn attr_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn child_opt(self, child: Option<Element>) -> Self {
        match child {
            Some(c) => self.child(c),
            None => self,
        }
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Node::Element));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element named `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated direct text content.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// All descendant elements (depth first, pre-order) named `name`.
    pub fn descendants<'a>(&'a self, name: &'a str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    fn write_to<W: io::Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(writer)?,
                Node::Text(t) => write_event(writer, Event::Text(BytesText::new(t)))?,
            }
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn write_event<W: io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Io(io::Error::other(e.to_string())))
}

/// Serialize `root` as a UTF-8 document with declaration, indented by two
/// spaces.
pub fn to_pretty_string(root: &Element) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    root.write_to(&mut writer)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| XmlError::Malformed(e.to_string()))
}

/// Parse `text` and confirm it is a single well-formed XML document.
///
/// Checks tag balance and nesting, attribute syntax, entity references in
/// text and attribute values, and that no value holds a character XML 1.0
/// forbids.
pub fn check_well_formed(text: &str) -> Result<(), XmlError> {
    let mut reader = Reader::from_str(text);
    let mut depth: usize = 0;
    let mut roots = 0;

    let malformed = |reader: &Reader<&[u8]>, detail: String| {
        XmlError::Malformed(format!("at byte {}: {}", reader.buffer_position(), detail))
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                check_attributes(&e).map_err(|d| malformed(&reader, d))?;
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                check_attributes(&e).map_err(|d| malformed(&reader, d))?;
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed(&reader, "unexpected closing tag".into()))?;
            }
            Ok(Event::Text(t)) => {
                let content = t.unescape().map_err(|e| malformed(&reader, e.to_string()))?;
                check_chars(&content).map_err(|d| malformed(&reader, d))?;
                if depth == 0 && !content.trim().is_empty() {
                    return Err(malformed(&reader, "text outside the root element".into()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, e.to_string())),
        }
        if roots > 1 {
            return Err(malformed(&reader, "more than one root element".into()));
        }
    }

    if depth != 0 {
        return Err(XmlError::Malformed(format!(
            "{depth} unclosed element(s) at end of document"
        )));
    }
    if roots == 0 {
        return Err(XmlError::Malformed("no root element".into()));
    }
    Ok(())
}

fn check_attributes(start: &BytesStart<'_>) -> Result<(), String> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        check_chars(&value)?;
    }
    Ok(())
}

/// Reject characters outside the XML 1.0 `Char` production.
fn check_chars(value: &str) -> Result<(), String> {
    match value.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(format!("character U+{:04X} is not allowed in XML", c as u32)),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}')
        || c >= '\u{10000}'
}
