//! Builds an [`Element`] tree from quick-xml events.
//!
//! Namespace declarations are resolved with a scope per open element, so the
//! resulting tree carries Clark-notation names only. `xmlns` attributes are
//! consumed and never appear in the tree.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, XmlError};
use crate::namespace::qualify;
use crate::node::{Document, Element};

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Parses a whole document from a buffered reader.
pub(crate) fn parse_reader<R: BufRead>(input: R) -> Result<Document> {
    let mut reader = Reader::from_reader(input);
    let mut builder = TreeBuilder::default();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => builder.open(e, position)?,
            Ok(Event::Empty(ref e)) => {
                builder.open(e, position)?;
                builder.close(position)?;
            }
            Ok(Event::End(_)) => builder.close(position)?,
            Ok(Event::Text(ref t)) => {
                let raw = std::str::from_utf8(t.as_ref())
                    .map_err(|e| XmlError::encoding(builder.current_tag(), e.to_string()))?;
                let text = unescape(raw)
                    .map_err(|e| XmlError::encoding(builder.current_tag(), e.to_string()))?;
                builder.text(&text, position)?;
            }
            Ok(Event::CData(ref c)) => {
                let text = std::str::from_utf8(c.as_ref())
                    .map_err(|e| XmlError::encoding(builder.current_tag(), e.to_string()))?;
                builder.text(text, position)?;
            }
            Ok(Event::GeneralRef(ref r)) => {
                let name = std::str::from_utf8(r.as_ref())
                    .map_err(|e| XmlError::encoding(builder.current_tag(), e.to_string()))?;
                let resolved = resolve_reference(name)
                    .ok_or_else(|| XmlError::encoding(builder.current_tag(), format!("unknown entity &{};", name)))?;
                builder.text(&resolved, position)?;
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions and doctypes carry no data.
            Ok(_) => {}
            Err(e) => return Err(XmlError::syntax(reader.error_position() as u64, e.to_string())),
        }
        buf.clear();
    }

    builder.finish(reader.buffer_position() as u64)
}

/// Expands a predefined entity (`amp`) or a character reference (`#38`, `#x26`).
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse::<u32>().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

struct OpenElement {
    element: Element,
    /// Prefix bindings declared on this element; `""` is the default namespace.
    bindings: HashMap<String, String>,
    seen_child: bool,
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<OpenElement>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn current_tag(&self) -> String {
        self.stack
            .last()
            .map(|open| open.element.tag.clone())
            .unwrap_or_else(|| "document".to_string())
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.stack
            .iter()
            .rev()
            .find_map(|open| open.bindings.get(prefix))
            .map(String::as_str)
            .filter(|uri| !uri.is_empty() || !prefix.is_empty())
    }

    fn open(&mut self, start: &BytesStart, position: u64) -> Result<()> {
        let raw_name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        if self.stack.is_empty() && self.root.is_some() {
            return Err(XmlError::MultipleRoots(raw_name));
        }

        let mut bindings = HashMap::new();
        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::syntax(position, e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let raw_value = std::str::from_utf8(&attr.value)
                .map_err(|e| XmlError::encoding(raw_name.as_str(), e.to_string()))?;
            let value = unescape(raw_value)
                .map_err(|e| XmlError::encoding(raw_name.as_str(), e.to_string()))?
                .into_owned();

            if key == "xmlns" {
                bindings.insert(String::new(), value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                bindings.insert(prefix.to_string(), value);
            } else {
                raw_attributes.push((key, value));
            }
        }

        // Declarations on an element are in scope for its own name.
        self.stack.push(OpenElement {
            element: Element::default(),
            bindings,
            seen_child: false,
        });

        let tag = match raw_name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.lookup(prefix).ok_or_else(|| {
                    XmlError::namespace(raw_name.as_str(), format!("unbound prefix '{}'", prefix))
                })?;
                qualify(local, Some(uri))
            }
            None => qualify(&raw_name, self.lookup("")),
        };

        let mut element = Element::new(tag);
        for (key, value) in raw_attributes {
            let name = match key.split_once(':') {
                Some((prefix, local)) => {
                    let uri = self.lookup(prefix).ok_or_else(|| {
                        XmlError::namespace(key.as_str(), format!("unbound prefix '{}'", prefix))
                    })?;
                    qualify(local, Some(uri))
                }
                None => key,
            };
            element.attributes.insert(name, value);
        }

        if let Some(open) = self.stack.last_mut() {
            open.element = element;
        }
        Ok(())
    }

    fn close(&mut self, position: u64) -> Result<()> {
        let open = self
            .stack
            .pop()
            .ok_or_else(|| XmlError::syntax(position, "end tag without a matching start tag"))?;

        match self.stack.last_mut() {
            Some(parent) => {
                parent.seen_child = true;
                parent.element.children.push(open.element);
            }
            None => self.root = Some(open.element),
        }
        Ok(())
    }

    fn text(&mut self, text: &str, position: u64) -> Result<()> {
        match self.stack.last_mut() {
            // Tail text after a child element is not part of the model.
            Some(open) if open.seen_child => {}
            Some(open) => open
                .element
                .text
                .get_or_insert_with(String::new)
                .push_str(text),
            None if text.trim().is_empty() => {}
            None => {
                return Err(XmlError::syntax(
                    position,
                    "character data outside the root element",
                ));
            }
        }
        Ok(())
    }

    fn finish(self, position: u64) -> Result<Document> {
        if let Some(open) = self.stack.last() {
            return Err(XmlError::syntax(
                position,
                format!("unclosed element <{}>", open.element.tag),
            ));
        }
        self.root.map(Document::new).ok_or(XmlError::NoRoot)
    }
}
