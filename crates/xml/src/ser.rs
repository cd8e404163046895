//! Writes an [`Element`] tree as XML through quick-xml.
//!
//! Namespaces are declared once on the root element. The configured default
//! namespace is written without a prefix, registered prefixes are used for
//! their URIs, and any other namespace gets a generated `ns0`, `ns1`, ...
//! prefix in document order.

use std::collections::HashMap;
use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::de::XML_NAMESPACE;
use crate::error::{Result, XmlError};
use crate::namespace::split;
use crate::node::{Document, Element};

/// Output settings for [`Document::write_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Namespace written without a prefix.
    ///
    /// When set, elements without a namespace cannot be written, because the
    /// default namespace would capture them on the way back in.
    pub default_namespace: Option<String>,

    /// Preferred `(prefix, uri)` pairs.
    pub prefixes: Vec<(String, String)>,

    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the root.
    pub xml_declaration: bool,
}

impl SerializeOptions {
    pub fn with_default_namespace(mut self, uri: impl Into<String>) -> Self {
        self.default_namespace = Some(uri.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.prefixes.push((prefix.into(), uri.into()));
        self
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }
}

/// Prefix assignment for every namespace used in a document.
struct NamespaceMap<'a> {
    default: Option<&'a str>,
    /// uri -> prefix, in declaration order.
    prefixes: Vec<(&'a str, String)>,
    index: HashMap<&'a str, usize>,
}

impl<'a> NamespaceMap<'a> {
    fn build(root: &'a Element, options: &'a SerializeOptions) -> Result<Self> {
        let mut map = NamespaceMap {
            default: options.default_namespace.as_deref(),
            prefixes: Vec::new(),
            index: HashMap::new(),
        };

        let mut used = Vec::new();
        for element in root.descendants() {
            if let (Some(uri), _) = split(&element.tag)? {
                if Some(uri) != map.default && !used.contains(&uri) {
                    used.push(uri);
                }
            }
            for key in element.attributes.keys() {
                if let (Some(uri), local) = split(key)? {
                    let needs_prefix =
                        Some(uri) != map.default || !map.bare_attribute(element, local)?;
                    if needs_prefix && !used.contains(&uri) {
                        used.push(uri);
                    }
                }
            }
        }

        let mut generated = 0usize;
        for uri in used {
            if uri == XML_NAMESPACE {
                continue;
            }
            let prefix = match options.prefixes.iter().find(|(_, u)| u == uri) {
                Some((prefix, _)) => prefix.clone(),
                None => loop {
                    let candidate = format!("ns{}", generated);
                    generated += 1;
                    if !options.prefixes.iter().any(|(p, _)| *p == candidate) {
                        break candidate;
                    }
                },
            };
            map.index.insert(uri, map.prefixes.len());
            map.prefixes.push((uri, prefix));
        }
        Ok(map)
    }

    /// Whether an attribute `local` in the default namespace can be written
    /// without a prefix on `element`.
    ///
    /// The element must itself be in the default namespace and must not also
    /// carry a bare attribute with the same name.
    fn bare_attribute(&self, element: &Element, local: &str) -> Result<bool> {
        Ok(split(&element.tag)?.0 == self.default && !element.attributes.contains_key(local))
    }

    fn prefix(&self, uri: &str) -> Option<&str> {
        if uri == XML_NAMESPACE {
            return Some("xml");
        }
        self.index
            .get(uri)
            .map(|&position| self.prefixes[position].1.as_str())
    }

    fn element_name(&self, tag: &str) -> Result<String> {
        match split(tag)? {
            (None, local) if self.default.is_some() => Err(XmlError::namespace(
                local,
                "unqualified element cannot be written under a default namespace",
            )),
            (None, local) => Ok(local.to_string()),
            (Some(uri), local) if Some(uri) == self.default => Ok(local.to_string()),
            (Some(uri), local) => self.prefixed(uri, local, tag),
        }
    }

    fn attribute_name(&self, element: &Element, key: &str) -> Result<String> {
        match split(key)? {
            (None, local) => Ok(local.to_string()),
            (Some(uri), local) if Some(uri) == self.default && self.bare_attribute(element, local)? => {
                Ok(local.to_string())
            }
            (Some(uri), local) => self.prefixed(uri, local, key),
        }
    }

    fn prefixed(&self, uri: &str, local: &str, name: &str) -> Result<String> {
        self.prefix(uri)
            .map(|prefix| format!("{}:{}", prefix, local))
            .ok_or_else(|| XmlError::namespace(name, "no prefix bound for namespace"))
    }
}

/// Serializes `document` into `writer`.
pub(crate) fn write_document<W: Write>(
    document: &Document,
    writer: W,
    options: &SerializeOptions,
) -> Result<()> {
    let namespaces = NamespaceMap::build(&document.root, options)?;
    let mut writer = Writer::new(writer);

    if options.xml_declaration {
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
    }

    write_tree(&mut writer, &document.root, &namespaces)
}

enum Step<'a> {
    Open(&'a Element),
    Close(String),
}

fn write_tree<W: Write>(
    writer: &mut Writer<W>,
    root: &Element,
    namespaces: &NamespaceMap<'_>,
) -> Result<()> {
    let mut steps = vec![Step::Open(root)];

    while let Some(step) = steps.pop() {
        let element = match step {
            Step::Open(element) => element,
            Step::Close(name) => {
                emit(writer, Event::End(BytesEnd::new(name.as_str())))?;
                continue;
            }
        };

        let name = namespaces.element_name(&element.tag)?;
        let mut start = BytesStart::new(name.as_str());

        if std::ptr::eq(element, root) {
            if let Some(default) = namespaces.default {
                start.push_attribute(("xmlns", default));
            }
            for (uri, prefix) in &namespaces.prefixes {
                let declaration = format!("xmlns:{}", prefix);
                start.push_attribute((declaration.as_str(), *uri));
            }
        }

        for (key, value) in &element.attributes {
            let key = namespaces.attribute_name(element, key)?;
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let text = element.text.as_deref().filter(|text| !text.is_empty());
        if element.children.is_empty() && text.is_none() {
            emit(writer, Event::Empty(start))?;
            continue;
        }

        emit(writer, Event::Start(start))?;
        if let Some(text) = text {
            emit(writer, Event::Text(BytesText::new(text)))?;
        }
        steps.push(Step::Close(name));
        steps.extend(element.children.iter().rev().map(Step::Open));
    }
    Ok(())
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Io(std::io::Error::other(e.to_string())))
}
