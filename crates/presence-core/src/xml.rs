//! Read-only XML tree access
//!
//! The PIDF interpreter only needs to look elements up by name and read their
//! text, so it works against the small [`XmlTree`] trait. [`XmlDocument`] is
//! the owned implementation built from quick-xml events; dropping it releases
//! the whole tree, whichever way the caller leaves.
//!
//! Element names are compared by local name: a `pidf:` prefix or a default
//! namespace declaration makes no difference to lookups.

use crate::error::{PresenceError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Deepest element nesting accepted by [`XmlDocument::parse`]
pub const MAX_DEPTH: usize = 256;

/// Handle to an element inside an [`XmlTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Minimal read-only view over a parsed document
pub trait XmlTree {
    /// The document element, if the document has one
    fn root(&self) -> Option<NodeId>;

    /// Local name of an element
    fn name(&self, node: NodeId) -> &str;

    /// Direct element children, in document order
    fn child_elements(&self, node: NodeId) -> &[NodeId];

    /// Text content of an element and all its descendants, entities resolved,
    /// whitespace preserved.
    fn text(&self, node: NodeId) -> String;

    /// First direct child element with the given local name
    fn find_child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(node)
            .iter()
            .copied()
            .find(|&child| self.name(child) == name)
    }

    /// First element with the given local name anywhere below `node`,
    /// depth-first in document order. `node` itself is not considered.
    fn find_descendant(&self, node: NodeId, name: &str) -> Option<NodeId> {
        let mut pending: Vec<NodeId> = self.child_elements(node).iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            if self.name(current) == name {
                return Some(current);
            }
            pending.extend(self.child_elements(current).iter().rev().copied());
        }
        None
    }
}

#[derive(Debug)]
enum Content {
    Text(String),
    Element(NodeId),
}

#[derive(Debug)]
struct Element {
    name: String,
    elements: Vec<NodeId>,
    content: Vec<Content>,
}

/// Owned, arena-backed XML document
#[derive(Debug, Default)]
pub struct XmlDocument {
    nodes: Vec<Element>,
    root: Option<NodeId>,
}

impl XmlDocument {
    /// Parse a byte buffer into a document tree.
    ///
    /// A buffer with no element at all is accepted and yields a document
    /// whose `root()` is `None`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| PresenceError::MalformedXml(format!("body is not UTF-8: {}", e)))?;

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = true;

        let mut doc = XmlDocument::default();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                PresenceError::MalformedXml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(ref start) => {
                    check_depth(&open)?;
                    let id = doc.open_element(start, &open)?;
                    open.push(id);
                }
                Event::Empty(ref start) => {
                    check_depth(&open)?;
                    doc.open_element(start, &open)?;
                }
                Event::End(_) => {
                    if open.pop().is_none() {
                        return Err(PresenceError::MalformedXml(
                            "closing tag without matching start tag".to_string(),
                        ));
                    }
                }
                Event::Text(ref text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| PresenceError::MalformedXml(e.to_string()))?;
                    doc.push_text(&open, &text)?;
                }
                Event::CData(ref cdata) => {
                    let text = std::str::from_utf8(cdata)
                        .map_err(|e| PresenceError::MalformedXml(e.to_string()))?;
                    doc.push_text(&open, text)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry no presence data
                _ => {}
            }
        }

        if let Some(&unclosed) = open.last() {
            return Err(PresenceError::MalformedXml(format!(
                "element <{}> is never closed",
                doc.name(unclosed)
            )));
        }

        Ok(doc)
    }

    fn open_element(&mut self, start: &BytesStart<'_>, open: &[NodeId]) -> Result<NodeId> {
        let local = start.local_name();
        let name = std::str::from_utf8(local.as_ref())
            .map_err(|e| PresenceError::MalformedXml(e.to_string()))?
            .to_string();

        let id = NodeId(self.nodes.len());
        match open.last() {
            Some(&parent) => {
                let parent = &mut self.nodes[parent.0];
                parent.elements.push(id);
                parent.content.push(Content::Element(id));
            }
            None if self.root.is_some() => {
                return Err(PresenceError::MalformedXml(format!(
                    "second document element <{}>",
                    name
                )));
            }
            None => self.root = Some(id),
        }

        self.nodes.push(Element {
            name,
            elements: Vec::new(),
            content: Vec::new(),
        });
        Ok(id)
    }

    fn push_text(&mut self, open: &[NodeId], text: &str) -> Result<()> {
        match open.last() {
            Some(&parent) => {
                self.nodes[parent.0].content.push(Content::Text(text.to_string()));
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(PresenceError::MalformedXml(
                "text outside the document element".to_string(),
            )),
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let mut pending: Vec<&Content> = self.nodes[node.0].content.iter().rev().collect();
        while let Some(content) = pending.pop() {
            match content {
                Content::Text(text) => out.push_str(text),
                Content::Element(child) => {
                    pending.extend(self.nodes[child.0].content.iter().rev());
                }
            }
        }
    }
}

fn check_depth(open: &[NodeId]) -> Result<()> {
    if open.len() >= MAX_DEPTH {
        return Err(PresenceError::MalformedXml(format!(
            "elements nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}

impl XmlTree for XmlDocument {
    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    fn child_elements(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].elements
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> XmlDocument {
        XmlDocument::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_lookup_and_text() {
        let doc = parse("<a><b>one</b><c><b>two</b></c></a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.name(root), "a");

        let b = doc.find_child(root, "b").unwrap();
        assert_eq!(doc.text(b), "one");

        let c = doc.find_child(root, "c").unwrap();
        assert_eq!(doc.text(c), "two");
        assert_eq!(doc.text(root), "onetwo");
        assert!(doc.find_child(root, "d").is_none());
    }

    #[test]
    fn test_find_descendant_is_depth_first() {
        let doc = parse("<a><x><t>deep</t></x><t>shallow</t></a>");
        let root = doc.root().unwrap();
        let t = doc.find_descendant(root, "t").unwrap();
        assert_eq!(doc.text(t), "deep");
        assert!(doc.find_child(root, "t").is_some());
    }

    #[test]
    fn test_prefixed_names_use_local_name() {
        let doc = parse(r#"<p:presence xmlns:p="urn:ietf:params:xml:ns:pidf"><p:tuple/></p:presence>"#);
        let root = doc.root().unwrap();
        assert_eq!(doc.name(root), "presence");
        assert!(doc.find_child(root, "tuple").is_some());
    }

    #[test]
    fn test_text_keeps_whitespace_and_resolves_entities() {
        let doc = parse("<a> x &amp; y <![CDATA[<z>]]></a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.text(root), " x & y <z>");
    }

    #[test]
    fn test_no_element_has_no_root() {
        let doc = parse("<?xml version=\"1.0\"?>\n<!-- nothing -->\n");
        assert!(doc.root().is_none());
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in [
            "<a><b></a>",
            "<a>",
            "<a></a><b></b>",
            "junk<a></a>",
            "</a>",
        ] {
            let err = XmlDocument::parse(bad.as_bytes()).unwrap_err();
            assert!(
                matches!(err, PresenceError::MalformedXml(_)),
                "expected MalformedXml for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    fn nested(depth: usize, inner: &str) -> String {
        format!("{}{}{}", "<a>".repeat(depth), inner, "</a>".repeat(depth))
    }

    #[test]
    fn test_depth_limit_is_accepted() {
        // Root plus MAX_DEPTH - 2 wrappers plus <t> is exactly MAX_DEPTH levels
        let xml = format!("<presence>{}</presence>", nested(MAX_DEPTH - 2, "<t>x</t>"));
        let doc = parse(&xml);
        let root = doc.root().unwrap();
        let t = doc.find_descendant(root, "t").unwrap();
        assert_eq!(doc.text(t), "x");
        assert_eq!(doc.text(root), "x");
    }

    #[test]
    fn test_one_past_depth_limit_is_malformed() {
        let xml = format!("<presence>{}</presence>", nested(MAX_DEPTH - 1, "<t/>"));
        let err = XmlDocument::parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, PresenceError::MalformedXml(_)));
    }

    #[test]
    fn test_deep_body_without_tuple_is_malformed() {
        let xml = format!("<presence>{}</presence>", nested(20_000, ""));
        let err = XmlDocument::parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, PresenceError::MalformedXml(_)));
    }

    #[test]
    fn test_deep_body_inside_basic_is_malformed() {
        let xml = format!(
            "<presence><tuple><status><basic>{}</basic></status></tuple></presence>",
            nested(20_000, "open")
        );
        let err = XmlDocument::parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, PresenceError::MalformedXml(_)));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = XmlDocument::parse(&[b'<', b'a', b'>', 0xff, b'<', b'/', b'a', b'>']).unwrap_err();
        assert!(matches!(err, PresenceError::MalformedXml(_)));
    }
}
