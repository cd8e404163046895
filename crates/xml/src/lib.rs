//! # OMERO XML node model
//!
//! A small, namespace-aware element tree used by the classifier codec. Reading
//! and writing go through `quick-xml`; callers only ever see [`Element`] and
//! [`Document`], so the codec logic does not depend on the XML backend.
//!
//! Names are kept in Clark notation:
//!
//! | XML | Tree |
//! |-----|------|
//! | `<OME xmlns="urn:ome">` | `{urn:ome}OME` |
//! | `<SA:Value>` with `xmlns:SA="urn:sa"` | `{urn:sa}Value` |
//! | `<Image id="1"/>` attribute | `id` |
//!
//! ## Examples
//!
//! ```
//! use omero_xml::{Document, Element, SerializeOptions};
//!
//! let doc = Document::new(Element::new("{urn:ome}Image").with_attribute("id", "3"));
//! let options = SerializeOptions::default().with_default_namespace("urn:ome");
//! let xml = doc.to_string(&options).unwrap();
//! assert_eq!(xml, r#"<Image xmlns="urn:ome" id="3"/>"#);
//!
//! let parsed = Document::from_str(&xml).unwrap();
//! assert_eq!(parsed.root.tag, "{urn:ome}Image");
//! ```

pub mod de;
pub mod error;
pub mod namespace;
pub mod node;
pub mod ser;

pub use error::{Result, XmlError};
pub use node::{Descendants, Document, Element};
pub use ser::SerializeOptions;
