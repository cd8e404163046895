//! In-memory element tree.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::de;
use crate::error::Result;
use crate::ser::{self, SerializeOptions};

/// An XML element with its attributes, children and leading text.
///
/// `tag` and attribute keys are Clark-notation names (see [`crate::namespace`]).
/// `text` holds the character data that precedes the first child element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    /// Creates an element with no attributes, children or text.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Looks up an attribute by its exact (Clark-notation) key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Iterates this element and all of its descendants in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

// Deep trees are released through a heap stack instead of recursive drops.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// Pre-order iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// A parsed or constructed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parses a document from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use omero_xml::Document;
    ///
    /// let doc = Document::from_str(r#"<a xmlns="urn:x"><b n="1">hi</b></a>"#).unwrap();
    /// assert_eq!(doc.root.tag, "{urn:x}a");
    /// assert_eq!(doc.root.children[0].attribute("n"), Some("1"));
    /// assert_eq!(doc.root.children[0].text(), Some("hi"));
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(xml: &str) -> Result<Self> {
        de::parse_reader(xml.as_bytes())
    }

    /// Parses a document from UTF-8 bytes.
    pub fn from_slice(xml: &[u8]) -> Result<Self> {
        de::parse_reader(xml)
    }

    /// Parses a document from a buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        de::parse_reader(reader)
    }

    /// Reads and parses the file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        de::parse_reader(std::io::BufReader::new(file))
    }

    /// Serializes the document to bytes.
    pub fn to_vec(&self, options: &SerializeOptions) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, options)?;
        Ok(buffer)
    }

    /// Serializes the document to a string.
    pub fn to_string(&self, options: &SerializeOptions) -> Result<String> {
        let bytes = self.to_vec(options)?;
        String::from_utf8(bytes)
            .map_err(|e| crate::error::XmlError::encoding(self.root.tag.as_str(), e.to_string()))
    }

    /// Serializes the document into `writer`.
    pub fn write_to<W: Write>(&self, writer: W, options: &SerializeOptions) -> Result<()> {
        ser::write_document(self, writer, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_document_order() {
        let root = Element::new("a")
            .with_child(Element::new("b").with_child(Element::new("c")))
            .with_child(Element::new("d"));
        let tags: Vec<&str> = root.descendants().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_builder() {
        let element = Element::new("ClassLabel")
            .with_attribute("index", "0")
            .with_text("ctrl");
        assert_eq!(element.attribute("index"), Some("0"));
        assert_eq!(element.attribute("missing"), None);
        assert_eq!(element.text(), Some("ctrl"));
        assert!(element.children().is_empty());
    }

    #[test]
    fn test_deep_chain_drops() {
        let mut root = Element::new("a");
        for _ in 0..200_000 {
            root = Element::new("a").with_child(root);
        }
        assert_eq!(root.descendants().count(), 200_001);
        drop(root);
    }
}
