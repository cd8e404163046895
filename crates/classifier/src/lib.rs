//! # OMERO classifier metadata
//!
//! Reads and writes the classifier records that OMERO analysis scripts keep
//! in OME-XML structured annotations:
//!
//! - **Feature sets**: the script that extracted features, the table holding
//!   them and the image planes they came from.
//! - **Classifier instances**: a trained classifier with its training
//!   annotations, selected-feature and weight tables, and class labels.
//! - **Classifier predictions**: the label predicted for each image plane.
//!
//! ## Architecture
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Plain value types for the three entity kinds |
//! | [`reader`] | Validating tree walk over a parsed [`omero_xml::Document`] |
//! | [`writer`] | Builds the annotation wrapper and serializes it |
//! | [`json`] | `serde_json` wrappers used by the CLI |
//! | [`error`] | [`InvalidDocument`] and the crate-wide [`ClassifierError`] |
//!
//! ## Examples
//!
//! ```
//! use omero_classifier::{
//!     Algorithm, Channels, ClassifierEntity, FeatureSet, ImageRef, Reader, Writer,
//! };
//!
//! let entity = ClassifierEntity::from(FeatureSet {
//!     algorithm: Algorithm::new(4).with_parameter("bins", "32"),
//!     table_id: 9,
//!     images: vec![ImageRef { id: 1, z: 0, c: Channels::List(vec![0, 1]), t: 0 }],
//! });
//!
//! let xml = Writer::new().to_string(Some(&entity), Some(100)).unwrap();
//! let parsed = Reader::from_str(&xml).unwrap().parse().unwrap();
//!
//! assert_eq!(parsed.feature_sets.len(), 1);
//! assert_eq!(ClassifierEntity::from(parsed.feature_sets[0].clone()), entity);
//! ```

pub mod error;
pub mod json;
pub mod model;
pub mod reader;
pub mod writer;

pub use error::{ClassifierError, InvalidDocument, Result};
pub use model::{
    Algorithm, Channels, ClassifierDocument, ClassifierEntity, ClassifierInstance,
    ClassifierPrediction, FeatureSet, ImageRef, PredictionRef,
};
pub use reader::Reader;
pub use writer::{
    ADDITIONS_NAMESPACE, CLASSIFIER_NAMESPACE, OME_NAMESPACE, STRUCTURED_ANNOTATIONS_NAMESPACE,
    Writer, WriterConfig,
};
