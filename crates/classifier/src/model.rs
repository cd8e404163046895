//! Classifier entities carried inside an OME-XML annotation.
//!
//! All types are plain values: the reader builds fresh ones on every call and
//! the writer only borrows them. Field names in JSON follow the XML attribute
//! spelling (`tableId`, `trainingIds`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The script that produced a feature set, classifier or prediction, with its
/// run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub id: i64,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Algorithm {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Channel selection of an image plane.
///
/// `Unspecified` is what an element without a `c` attribute means. It is not
/// the same as an explicit empty list and the two are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<i64>>", into = "Option<Vec<i64>>")]
pub enum Channels {
    #[default]
    Unspecified,
    List(Vec<i64>),
}

impl Channels {
    /// Returns the explicit channel list, if any.
    pub fn as_slice(&self) -> Option<&[i64]> {
        match self {
            Channels::Unspecified => None,
            Channels::List(channels) => Some(channels),
        }
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self, Channels::Unspecified)
    }

    /// Comma-joined attribute value, or `None` when the attribute is omitted.
    pub fn to_attribute(&self) -> Option<String> {
        self.as_slice().map(|channels| {
            channels
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

impl From<Vec<i64>> for Channels {
    fn from(channels: Vec<i64>) -> Self {
        Channels::List(channels)
    }
}

impl From<Option<Vec<i64>>> for Channels {
    fn from(channels: Option<Vec<i64>>) -> Self {
        channels.map_or(Channels::Unspecified, Channels::List)
    }
}

impl From<Channels> for Option<Vec<i64>> {
    fn from(channels: Channels) -> Self {
        match channels {
            Channels::Unspecified => None,
            Channels::List(list) => Some(list),
        }
    }
}

/// A single image plane used as classifier input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: i64,
    pub z: i64,
    #[serde(default)]
    pub c: Channels,
    pub t: i64,
}

/// The predicted label for one image plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRef {
    pub id: i64,
    pub z: i64,
    #[serde(default)]
    pub c: Channels,
    pub t: i64,
    pub label: String,
}

/// Features extracted from a set of images into a stored table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    pub algorithm: Algorithm,
    pub table_id: i64,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// A trained classifier.
///
/// `training_ids` are the feature annotations it was trained on,
/// `selected_id` and `weights_id` the tables holding the selected features
/// and their weights, and `labels` maps class indices to names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierInstance {
    pub algorithm: Algorithm,
    #[serde(default)]
    pub training_ids: Vec<i64>,
    pub selected_id: i64,
    pub weights_id: i64,
    #[serde(default)]
    pub labels: BTreeMap<i64, String>,
}

/// A batch of predictions made by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierPrediction {
    pub algorithm: Algorithm,
    #[serde(default)]
    pub predictions: Vec<PredictionRef>,
}

/// One top-level classifier entity, as embedded by the writer.
///
/// In JSON the entity is keyed by its kind:
/// `{"FeatureSet": {"algorithm": ..., "tableId": 3, "images": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierEntity {
    FeatureSet(FeatureSet),
    ClassifierInstance(ClassifierInstance),
    ClassifierPrediction(ClassifierPrediction),
}

impl ClassifierEntity {
    /// Local element name of the entity.
    pub fn tag(&self) -> &'static str {
        match self {
            ClassifierEntity::FeatureSet(_) => "FeatureSet",
            ClassifierEntity::ClassifierInstance(_) => "ClassifierInstance",
            ClassifierEntity::ClassifierPrediction(_) => "ClassifierPrediction",
        }
    }

    pub fn algorithm(&self) -> &Algorithm {
        match self {
            ClassifierEntity::FeatureSet(entity) => &entity.algorithm,
            ClassifierEntity::ClassifierInstance(entity) => &entity.algorithm,
            ClassifierEntity::ClassifierPrediction(entity) => &entity.algorithm,
        }
    }
}

impl From<FeatureSet> for ClassifierEntity {
    fn from(entity: FeatureSet) -> Self {
        ClassifierEntity::FeatureSet(entity)
    }
}

impl From<ClassifierInstance> for ClassifierEntity {
    fn from(entity: ClassifierInstance) -> Self {
        ClassifierEntity::ClassifierInstance(entity)
    }
}

impl From<ClassifierPrediction> for ClassifierEntity {
    fn from(entity: ClassifierPrediction) -> Self {
        ClassifierEntity::ClassifierPrediction(entity)
    }
}

/// Everything the reader found in one document, each list in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierDocument {
    pub feature_sets: Vec<FeatureSet>,
    pub classifier_instances: Vec<ClassifierInstance>,
    pub classifier_predictions: Vec<ClassifierPrediction>,
}

impl ClassifierDocument {
    pub fn is_empty(&self) -> bool {
        self.feature_sets.is_empty()
            && self.classifier_instances.is_empty()
            && self.classifier_predictions.is_empty()
    }

    /// Splits the document into its three lists.
    pub fn into_parts(
        self,
    ) -> (
        Vec<FeatureSet>,
        Vec<ClassifierInstance>,
        Vec<ClassifierPrediction>,
    ) {
        (
            self.feature_sets,
            self.classifier_instances,
            self.classifier_predictions,
        )
    }
}
