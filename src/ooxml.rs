//! Office Open XML package access.
//!
//! A `.docx` file is a ZIP archive of XML parts. This module opens the
//! archive, reads parts with a decompressed-size bound, parses XML into a
//! small owned tree ([`XmlNode`]) and builds the relationship map that
//! resolves embedded image ids to media parts.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};

use crate::extract::ExtractError;

/// Main document part.
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Relationships of the main document part.
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_PART_BYTES: u64 = 50 * 1024 * 1024;
/// Embedded media is allowed to be larger than XML parts.
const MAX_MEDIA_BYTES: u64 = 200 * 1024 * 1024;

/// An opened office package backed by an in-memory buffer.
pub struct OfficePackage<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> OfficePackage<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, ExtractError> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::Package(e.to_string()))?;
        Ok(Self { archive })
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Read a part that must exist; a missing part is a structural error.
    pub fn read_required_part(&mut self, name: &str) -> Result<Vec<u8>, ExtractError> {
        if !self.has_part(name) {
            return Err(ExtractError::MissingPart(name.to_string()));
        }
        self.read_part_bounded(name, MAX_PART_BYTES)
    }

    /// Raw bytes of a media part addressed relative to `word/`
    /// (e.g. `media/image3.png`), or `None` when the package lacks it.
    pub fn read_media(&mut self, target: &str) -> Result<Option<Vec<u8>>, ExtractError> {
        let name = format!("word/{}", target);
        if !self.has_part(&name) {
            return Ok(None);
        }
        self.read_part_bounded(&name, MAX_MEDIA_BYTES).map(Some)
    }

    fn read_part_bounded(&mut self, name: &str, max_bytes: u64) -> Result<Vec<u8>, ExtractError> {
        let entry = self
            .archive
            .by_name(name)
            .map_err(|e| ExtractError::Package(e.to_string()))?;
        let mut out = Vec::new();
        entry
            .take(max_bytes)
            .read_to_end(&mut out)
            .map_err(|e| ExtractError::Package(e.to_string()))?;
        if out.len() as u64 >= max_bytes {
            return Err(ExtractError::Package(format!(
                "ZIP entry {} exceeds size limit ({} bytes)",
                name, max_bytes
            )));
        }
        Ok(out)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// XML tree
// ═══════════════════════════════════════════════════════════════════════

/// A node of a parsed XML part.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its qualified name (`w:p`), attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

fn local_part(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

impl XmlElement {
    /// Name without the namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value by local name (`val` matches `w:val`).
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key) == local)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(local))
    }

    /// Every descendant element (depth-first, document order) with the
    /// given local name. Matching elements are not searched further.
    pub fn find_all(&self, local: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_named(self, local, &mut out);
        out
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }
}

fn collect_named<'a>(el: &'a XmlElement, local: &str, out: &mut Vec<&'a XmlElement>) {
    for child in el.elements() {
        if child.is(local) {
            out.push(child);
        } else {
            collect_named(child, local, out);
        }
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement, ExtractError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ExtractError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ExtractError::Xml(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// Parse an XML part into an owned tree and return its root element.
pub fn parse_xml(xml: &[u8]) -> Result<XmlElement, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    // The bottom of the stack is a synthetic holder for the root element.
    let mut stack: Vec<XmlElement> = vec![XmlElement::default()];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => stack.push(start_element(&e)?),
            Ok(Event::Empty(e)) => {
                let el = start_element(&e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Element(el));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(ExtractError::Xml("unbalanced end tag".to_string()));
                }
                if let Some(el) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Element(el));
                    }
                }
            }
            Ok(Event::Text(te)) => {
                let text = te
                    .unescape()
                    .map_err(|err| ExtractError::Xml(err.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Ok(Event::CData(cd)) => {
                let text = String::from_utf8_lossy(&cd.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(ExtractError::Xml("unexpected end of document".to_string()));
    }
    stack
        .pop()
        .and_then(|holder| holder.elements().next().cloned())
        .ok_or_else(|| ExtractError::Xml("document has no root element".to_string()))
}

// ═══════════════════════════════════════════════════════════════════════
// Relationships
// ═══════════════════════════════════════════════════════════════════════

/// Relationship id → target path, relative to `word/`.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    targets: HashMap<String, String>,
}

impl Relationships {
    pub fn from_xml(rels: &XmlElement) -> Self {
        let mut targets = HashMap::new();
        for rel in rels.find_all("Relationship") {
            if rel.attr("TargetMode") == Some("External") {
                continue;
            }
            if let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) {
                targets.insert(id.to_string(), normalize_target(target));
            }
        }
        Self { targets }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Express a relationship target relative to the `word/` folder.
fn normalize_target(target: &str) -> String {
    let mut t = target.trim();
    t = t.strip_prefix('/').unwrap_or(t);
    t = t.strip_prefix("word/").unwrap_or(t);
    while let Some(rest) = t.strip_prefix("./") {
        t = rest;
    }
    t.to_string()
}

/// Whether a normalized target points into the package media folder.
pub fn is_media_target(target: &str) -> bool {
    target.starts_with("media/")
}
