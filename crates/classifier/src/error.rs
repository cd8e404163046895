//! Error types for reading and writing classifier documents.

use omero_xml::XmlError;
use thiserror::Error;

/// A document that is well-formed XML but does not follow the classifier schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDocument {
    /// Missing required attribute.
    #[error("attribute {attribute} not found in <{element}>")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element that should have the attribute.
        element: String,
    },

    /// Missing required child element.
    #[error("<{element}> not found in <{parent}>")]
    MissingElement {
        /// The missing element name.
        element: &'static str,
        /// The element that should contain it.
        parent: String,
    },

    /// Unparseable value, malformed namespace, forbidden children or empty text.
    #[error("invalid content in <{element}>: {message}")]
    InvalidFormat {
        /// The element holding the bad content.
        element: String,
        /// Description of why the content is invalid.
        message: String,
    },

    /// Child element outside the allowed set.
    #[error("unexpected element <{child}> found in <{parent}>")]
    UnexpectedChild {
        /// The offending child tag.
        child: String,
        /// The enclosing tag.
        parent: String,
    },

    /// A singleton child or keyed entry appeared twice.
    #[error("duplicate {what} in <{parent}>")]
    DuplicateElement {
        /// The repeated element, parameter name or label index.
        what: String,
        /// The enclosing tag.
        parent: String,
    },
}

impl InvalidDocument {
    /// Create a missing attribute error.
    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    /// Create a missing element error.
    pub fn missing_element(element: &'static str, parent: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            parent: parent.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected child error.
    pub fn unexpected_child(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::UnexpectedChild {
            child: child.into(),
            parent: parent.into(),
        }
    }

    /// Create a duplicate element error.
    pub fn duplicate(what: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::DuplicateElement {
            what: what.into(),
            parent: parent.into(),
        }
    }
}

/// Errors returned by the classifier codec.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The document violates the classifier schema.
    #[error(transparent)]
    InvalidDocument(#[from] InvalidDocument),

    /// The input is not well-formed XML, or the tree could not be written.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// JSON encoding or decoding of entities failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassifierError {
    /// Returns the schema violation, if this is one.
    pub fn as_invalid_document(&self) -> Option<&InvalidDocument> {
        match self {
            Self::InvalidDocument(invalid) => Some(invalid),
            _ => None,
        }
    }
}

/// Result type for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;
