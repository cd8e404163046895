//! Error types for the XML node model.

use thiserror::Error;

/// Errors raised while building or serializing a node tree.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("XML parse error at byte {position}: {message}")]
    Syntax {
        /// Byte offset reported by the parser.
        position: u64,
        /// Description of the failure.
        message: String,
    },

    /// Text or attribute content could not be decoded or unescaped.
    #[error("invalid character data in <{element}>: {message}")]
    Encoding {
        /// Element being decoded.
        element: String,
        /// Description of the failure.
        message: String,
    },

    /// A qualified name could not be resolved or written.
    #[error("namespace error on {name}: {message}")]
    Namespace {
        /// The offending element or attribute name.
        name: String,
        /// Description of the failure.
        message: String,
    },

    /// The document has no root element.
    #[error("document has no root element")]
    NoRoot,

    /// More than one top-level element was found.
    #[error("document has more than one root element: <{0}>")]
    MultipleRoots(String),

    /// File or stream I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XmlError {
    /// Create a syntax error.
    pub fn syntax(position: u64, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create an encoding error.
    pub fn encoding(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create a namespace error.
    pub fn namespace(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Namespace {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type for node model operations.
pub type Result<T> = std::result::Result<T, XmlError>;
