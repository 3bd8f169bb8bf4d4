//! Namespace-aware XML document tree
//!
//! Vendor metadata files are small (a few hundred elements), so the document is
//! materialised once and the extraction strategies walk the tree freely.
//! Tags are stored in qualified `{namespace-uri}local` form.

use crate::error::{MetadataError, Result};
use quick_xml::events::Event as XmlEvent;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// One element of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    /// Qualified tag, `{uri}local` or just `local` when unbound
    pub tag: String,
    /// Trimmed text before the first child element, if any
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Tag without the namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    /// Direct text of this element.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    /// Total number of elements in this subtree, including self.
    pub fn element_count(&self) -> usize {
        1 + self.children.iter().map(XmlNode::element_count).sum::<usize>()
    }

    fn push_text(&mut self, text: &str) {
        // Only text ahead of the first child counts as the element's own text
        if !self.children.is_empty() || text.trim().is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text.trim()),
            None => self.text = Some(text.trim().to_string()),
        }
    }
}

/// Strips a `{uri}` prefix from a qualified tag.
pub fn local_name(tag: &str) -> &str {
    if tag.starts_with('{') {
        if let Some(end) = tag.find('}') {
            return &tag[end + 1..];
        }
    }
    tag
}

/// Parse a document from a string
pub fn parse_document_str(xml: &str) -> Result<XmlNode> {
    parse_document(xml.as_bytes())
}

/// Parse a document from bytes into its root element.
///
/// # Errors
///
/// Any XML syntax error, unbound namespace prefix, unclosed element, missing
/// root or content after the root element.
pub fn parse_document(xml: &[u8]) -> Result<XmlNode> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ns, XmlEvent::Start(e)) => {
                let tag = qualified_tag(&ns, e.local_name().as_ref())?;
                if stack.is_empty() && root.is_some() {
                    return Err(MetadataError::Malformed(format!(
                        "unexpected element <{}> after the root element",
                        tag
                    )));
                }
                stack.push(XmlNode::new(tag));
            }
            (ns, XmlEvent::Empty(e)) => {
                let node = XmlNode::new(qualified_tag(&ns, e.local_name().as_ref())?);
                attach(&mut stack, &mut root, node)?;
            }
            (_, XmlEvent::End(_)) => {
                let node = stack.pop().ok_or_else(|| {
                    MetadataError::Malformed("closing tag without an open element".to_string())
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            (_, XmlEvent::Text(t)) => {
                let text = t.unescape()?;
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text);
                }
            }
            (_, XmlEvent::CData(c)) => {
                let raw = c.into_inner();
                if let Some(current) = stack.last_mut() {
                    current.push_text(&String::from_utf8_lossy(&raw));
                }
            }
            (_, XmlEvent::Eof) => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(MetadataError::Malformed(format!(
            "element <{}> is never closed",
            open.tag
        )));
    }

    root.ok_or_else(|| MetadataError::Malformed("document has no root element".to_string()))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(MetadataError::Malformed(format!(
            "unexpected element <{}> after the root element",
            node.tag
        ))),
    }
}

fn qualified_tag(ns: &ResolveResult, local: &[u8]) -> Result<String> {
    let local = String::from_utf8_lossy(local);
    match ns {
        ResolveResult::Bound(namespace) => Ok(format!(
            "{{{}}}{}",
            String::from_utf8_lossy(namespace.as_ref()),
            local
        )),
        ResolveResult::Unbound => Ok(local.into_owned()),
        ResolveResult::Unknown(prefix) => Err(MetadataError::Malformed(format!(
            "unbound namespace prefix '{}' on <{}>",
            String::from_utf8_lossy(prefix),
            local
        ))),
    }
}
