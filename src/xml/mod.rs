//! A small owned DOM over the worksheet XML dialect.
//!
//! The cell parser is recursive descent over sibling and child node lists
//! with arbitrary lookahead (attribute-driven disambiguation must inspect a
//! child before consuming it), so the `quick-xml` event stream is first
//! materialized into an [`XmlNode`] tree. Whitespace text nodes are kept;
//! the cell parser decides what to skip.

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::common::ParseError;

/// Recursion guard for pathological nesting.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlKind {
    Element,
    Text,
}

/// One node of the loaded document: an element with ordered children and
/// attributes, or a text run.
#[derive(Debug, Clone)]
pub struct XmlNode {
    kind: XmlKind,
    name: String,
    /// Kept in document order; a repeated key is resolved last-write-wins.
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
    content: String,
}

impl XmlNode {
    pub fn element(name: impl Into<String>) -> Self {
        XmlNode {
            kind: XmlKind::Element,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            content: String::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        XmlNode {
            kind: XmlKind::Text,
            name: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> XmlKind {
        self.kind
    }

    pub fn is_element(&self) -> bool {
        self.kind == XmlKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind == XmlKind::Text
    }

    /// Element name; empty for text nodes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content; empty for elements.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn push_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// Appends text content, coalescing with a trailing text child. The
    /// reader delivers entity references as separate events, so a run like
    /// `a &lt; b` arrives in three pieces that must end up as one node.
    pub fn push_text(&mut self, text: &str) {
        if let Some(last) = self.children.last_mut()
            && last.is_text()
        {
            last.content.push_str(text);
            return;
        }
        self.children.push(XmlNode::text(text));
    }

    /// Looks an attribute up by key; when the key was written more than once
    /// the last occurrence wins.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attribute_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.attribute(key).unwrap_or(default)
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Content of the first text child, or the empty string. Tag builders
    /// that wrap a single text run read through this.
    pub fn inner_text(&self) -> &str {
        self.children
            .iter()
            .find(|c| c.is_text())
            .map(|c| c.content())
            .unwrap_or("")
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlNode, ParseError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_owned();
    let mut node = XmlNode::element(name);
    // Duplicate keys are legal in this dialect; the lookup side resolves
    // them last-write-wins.
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_owned();
        let raw = std::str::from_utf8(&attr.value)?;
        node.push_attribute(key, unescape(raw)?.into_owned());
    }
    Ok(node)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.push_child(node),
        // Only the first top-level element becomes the root.
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Loads a document string into a node tree and returns the root element.
pub fn parse_document(input: &str) -> Result<XmlNode, ParseError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::TooDeep(MAX_DEPTH));
                }
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                attach(&mut stack, &mut root, element_from(&start)?);
            }
            Event::End(_) => {
                // The reader rejects unmatched and mismatched closing tags
                // before they get here.
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Event::Text(text) => {
                let raw = std::str::from_utf8(text.as_ref())?;
                let unescaped = unescape(raw)?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&unescaped);
                }
            }
            Event::GeneralRef(reference) => {
                let text = match reference.resolve_char_ref()? {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = std::str::from_utf8(&reference)?;
                        resolve_predefined_entity(name)
                            .ok_or_else(|| ParseError::Entity(name.to_owned()))?
                            .to_owned()
                    }
                };
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&text);
                }
            }
            Event::CData(data) => {
                let content = std::str::from_utf8(data.as_ref())?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(content);
                }
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions carry no
            // cell content.
            _ => {}
        }
    }

    root.ok_or(ParseError::MissingRoot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_with_ordered_children() {
        let root = parse_document("<mth><v>x</v><mo>+</mo><n>1</n></mth>").unwrap();
        assert_eq!(root.name(), "mth");
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.children()[0].name(), "v");
        assert_eq!(root.children()[0].inner_text(), "x");
        assert_eq!(root.children()[2].inner_text(), "1");
    }

    #[test]
    fn keeps_whitespace_text_nodes() {
        let root = parse_document("<r>\n  <v>x</v>\n</r>").unwrap();
        assert_eq!(root.children().len(), 3);
        assert!(root.children()[0].is_text());
        assert!(root.children()[1].is_element());
    }

    #[test]
    fn repeated_attribute_resolves_last_write_wins() {
        let root = parse_document(r#"<t type="error" type="warning">x</t>"#).unwrap();
        assert_eq!(root.attribute("type"), Some("warning"));
    }

    #[test]
    fn empty_elements_and_entities() {
        let root = parse_document("<r><mspace/><t>a &lt; b</t></r>").unwrap();
        assert_eq!(root.children()[0].name(), "mspace");
        assert_eq!(root.children()[1].inner_text(), "a < b");
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse_document("<mth><v>x</mth>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn stray_close_is_an_error() {
        assert!(parse_document("</mth>").is_err());
    }

    #[test]
    fn entity_references_merge_into_one_text_node() {
        let root = parse_document("<t>-&gt;</t>").unwrap();
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.inner_text(), "->");

        let root = parse_document("<t>a &amp;&amp; b</t>").unwrap();
        assert_eq!(root.inner_text(), "a && b");
    }

    #[test]
    fn character_references_resolve() {
        let root = parse_document("<t>&#65;&#x42;</t>").unwrap();
        assert_eq!(root.inner_text(), "AB");
    }

    #[test]
    fn unknown_entity_is_an_error() {
        assert!(matches!(
            parse_document("<t>&nosuch;</t>"),
            Err(ParseError::Entity(_))
        ));
    }
}
