//! Clark-notation name handling.
//!
//! Element tags and attribute keys in the node model are stored as
//! `{uri}local` when qualified and as a bare `local` otherwise. The helpers
//! here pull those names apart, build them, and rewrite unqualified names into
//! a default namespace before serialization.

use crate::error::{Result, XmlError};
use crate::node::Element;

/// Returns the namespace URI embedded in a Clark-notation tag.
///
/// `{uri}local` yields `Some("uri")` and a bare `local` yields `None`. A tag
/// with an unmatched brace, or with a brace anywhere but at the start, is
/// rejected.
pub fn resolve(tag: &str) -> Result<Option<&str>> {
    let open = tag.find('{');
    let close = tag.find('}');
    match (open, close) {
        (None, None) => Ok(None),
        (Some(0), Some(end)) if end > 0 => Ok(Some(&tag[1..end])),
        _ => Err(XmlError::namespace(tag, "malformed namespace braces")),
    }
}

/// Builds the lookup key for `local` in `namespace`.
pub fn qualify(local: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(uri) => format!("{{{}}}{}", uri, local),
        None => local.to_string(),
    }
}

/// Splits a Clark-notation name into its namespace and local part.
pub fn split(name: &str) -> Result<(Option<&str>, &str)> {
    match resolve(name)? {
        Some(uri) => Ok((Some(uri), &name[uri.len() + 2..])),
        None => Ok((None, name)),
    }
}

/// Returns the local part of `tag` when it is qualified in exactly `namespace`.
///
/// Malformed tags never match.
pub fn local_name<'a>(tag: &'a str, namespace: Option<&str>) -> Option<&'a str> {
    match split(tag) {
        Ok((ns, local)) if ns == namespace => Some(local),
        _ => None,
    }
}

/// Rewrites unqualified names in `root` into `namespace`.
///
/// Every element without a namespace is moved into `namespace`. Unqualified
/// attributes of elements that end up in `namespace` are moved as well; an
/// element that already carries the qualified form of such an attribute is
/// rejected. Elements already in another namespace keep their tag and
/// attributes. Running the pass twice leaves the tree as the first run left it.
pub fn backfill_default_namespace(root: &mut Element, namespace: &str) -> Result<()> {
    let mut rewritten = 0usize;
    let mut pending = vec![root];

    while let Some(element) = pending.pop() {
        if resolve(&element.tag)?.is_none() {
            element.tag = qualify(&element.tag, Some(namespace));
            rewritten += 1;
        }

        if resolve(&element.tag)? == Some(namespace) {
            rewritten += backfill_attributes(element, namespace)?;
        }

        pending.extend(element.children.iter_mut());
    }

    tracing::trace!(namespace, rewritten, "Backfilled default namespace");
    Ok(())
}

fn backfill_attributes(element: &mut Element, namespace: &str) -> Result<usize> {
    let unqualified: Vec<String> = element
        .attributes
        .keys()
        .filter(|key| !key.starts_with('{'))
        .cloned()
        .collect();

    for key in &unqualified {
        if element.attributes.contains_key(&qualify(key, Some(namespace))) {
            return Err(XmlError::namespace(
                format!("{}@{}", element.tag, key),
                "attribute is present both bare and qualified in the default namespace",
            ));
        }
    }

    for key in &unqualified {
        if let Some(value) = element.attributes.remove(key) {
            element.attributes.insert(qualify(key, Some(namespace)), value);
        }
    }
    Ok(unqualified.len())
}
