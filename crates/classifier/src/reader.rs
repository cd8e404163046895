//! Reads classifier entities out of an OME-XML document.
//!
//! The namespace is taken once from the root element and every element the
//! reader looks at must be qualified in that namespace. `FeatureSet`,
//! `ClassifierInstance` and `ClassifierPrediction` elements are collected
//! from anywhere in the tree (the root included), in document order.
//!
//! Each element kind has a fixed set of allowed children:
//!
//! | Element | Children |
//! |---------|----------|
//! | `FeatureSet` | one `Algorithm`, one `FeatureTable`, any number of `Image` |
//! | `ClassifierInstance` | one `Algorithm`, any `TrainingFeatures`, one `SelectedFeaturesTable`, one `FeatureWeightsTable`, any `ClassLabel` |
//! | `ClassifierPrediction` | one `Algorithm`, any number of `Prediction` |
//! | `Algorithm` | any number of `Parameter` |
//! | `Prediction` | one `Label` |
//!
//! Every other element is a leaf. The first violation aborts the parse.

use std::collections::BTreeMap;
use std::path::Path;

use omero_xml::namespace::{local_name, qualify, resolve};
use omero_xml::{Document, Element};
use tracing::{debug, trace};

use crate::error::{InvalidDocument, Result};
use crate::model::{
    Algorithm, Channels, ClassifierDocument, ClassifierInstance, ClassifierPrediction, FeatureSet,
    ImageRef, PredictionRef,
};

type Parsed<T> = std::result::Result<T, InvalidDocument>;

/// Element names known to the classifier schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaTag {
    FeatureSet,
    ClassifierInstance,
    ClassifierPrediction,
    Algorithm,
    Parameter,
    FeatureTable,
    SelectedFeaturesTable,
    FeatureWeightsTable,
    TrainingFeatures,
    Image,
    ClassLabel,
    Prediction,
    Label,
}

impl SchemaTag {
    fn from_local(name: &str) -> Option<Self> {
        let tag = match name {
            "FeatureSet" => SchemaTag::FeatureSet,
            "ClassifierInstance" => SchemaTag::ClassifierInstance,
            "ClassifierPrediction" => SchemaTag::ClassifierPrediction,
            "Algorithm" => SchemaTag::Algorithm,
            "Parameter" => SchemaTag::Parameter,
            "FeatureTable" => SchemaTag::FeatureTable,
            "SelectedFeaturesTable" => SchemaTag::SelectedFeaturesTable,
            "FeatureWeightsTable" => SchemaTag::FeatureWeightsTable,
            "TrainingFeatures" => SchemaTag::TrainingFeatures,
            "Image" => SchemaTag::Image,
            "ClassLabel" => SchemaTag::ClassLabel,
            "Prediction" => SchemaTag::Prediction,
            "Label" => SchemaTag::Label,
            _ => return None,
        };
        Some(tag)
    }

    fn as_str(self) -> &'static str {
        match self {
            SchemaTag::FeatureSet => "FeatureSet",
            SchemaTag::ClassifierInstance => "ClassifierInstance",
            SchemaTag::ClassifierPrediction => "ClassifierPrediction",
            SchemaTag::Algorithm => "Algorithm",
            SchemaTag::Parameter => "Parameter",
            SchemaTag::FeatureTable => "FeatureTable",
            SchemaTag::SelectedFeaturesTable => "SelectedFeaturesTable",
            SchemaTag::FeatureWeightsTable => "FeatureWeightsTable",
            SchemaTag::TrainingFeatures => "TrainingFeatures",
            SchemaTag::Image => "Image",
            SchemaTag::ClassLabel => "ClassLabel",
            SchemaTag::Prediction => "Prediction",
            SchemaTag::Label => "Label",
        }
    }
}

/// Parses every classifier entity in `document`.
///
/// # Errors
///
/// Returns [`InvalidDocument`] (wrapped in [`crate::ClassifierError`]) on the
/// first schema violation.
pub fn parse(document: &Document) -> Result<ClassifierDocument> {
    let namespace = document_namespace(document)?;
    Ok(Schema::new(namespace).parse(&document.root)?)
}

/// Parses every classifier entity in an XML string.
///
/// # Examples
///
/// ```
/// let xml = r#"<FeatureSet>
///   <Algorithm scriptId="2"/>
///   <FeatureTable originalFileId="30"/>
///   <Image id="1" z="0" t="0"/>
/// </FeatureSet>"#;
///
/// let parsed = omero_classifier::reader::from_str(xml).unwrap();
/// assert_eq!(parsed.feature_sets[0].table_id, 30);
/// assert!(parsed.feature_sets[0].images[0].c.is_unspecified());
/// ```
pub fn from_str(xml: &str) -> Result<ClassifierDocument> {
    parse(&Document::from_str(xml)?)
}

fn document_namespace(document: &Document) -> Parsed<Option<&str>> {
    resolve(&document.root.tag)
        .map_err(|e| InvalidDocument::invalid_format(document.root.tag.as_str(), e.to_string()))
}

/// A parsed document together with the namespace of its root.
#[derive(Debug, Clone)]
pub struct Reader {
    document: Document,
    namespace: Option<String>,
}

impl Reader {
    /// Wraps a document, resolving its namespace from the root tag.
    pub fn new(document: Document) -> Result<Self> {
        let namespace = document_namespace(&document)?.map(str::to_string);
        Ok(Self {
            document,
            namespace,
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(xml: &str) -> Result<Self> {
        Self::new(Document::from_str(xml)?)
    }

    pub fn from_slice(xml: &[u8]) -> Result<Self> {
        Self::new(Document::from_slice(xml)?)
    }

    /// Reads the document stored at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading classifier document");
        Self::new(Document::from_path(path)?)
    }

    /// Namespace URI of the root element, if it has one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn schema(&self) -> Schema<'_> {
        Schema::new(self.namespace())
    }

    /// Parses all three entity kinds.
    pub fn parse(&self) -> Result<ClassifierDocument> {
        Ok(self.schema().parse(&self.document.root)?)
    }

    pub fn feature_sets(&self) -> Result<Vec<FeatureSet>> {
        let schema = self.schema();
        Ok(schema
            .find(&self.document.root, SchemaTag::FeatureSet)
            .map(|element| schema.feature_set(element))
            .collect::<Parsed<Vec<_>>>()?)
    }

    pub fn classifier_instances(&self) -> Result<Vec<ClassifierInstance>> {
        let schema = self.schema();
        Ok(schema
            .find(&self.document.root, SchemaTag::ClassifierInstance)
            .map(|element| schema.classifier_instance(element))
            .collect::<Parsed<Vec<_>>>()?)
    }

    pub fn classifier_predictions(&self) -> Result<Vec<ClassifierPrediction>> {
        let schema = self.schema();
        Ok(schema
            .find(&self.document.root, SchemaTag::ClassifierPrediction)
            .map(|element| schema.classifier_prediction(element))
            .collect::<Parsed<Vec<_>>>()?)
    }
}

/// Per-parse view of the schema, bound to the document namespace.
struct Schema<'ns> {
    namespace: Option<&'ns str>,
}

impl<'ns> Schema<'ns> {
    fn new(namespace: Option<&'ns str>) -> Self {
        Self { namespace }
    }

    fn tag_of(&self, element: &Element) -> Option<SchemaTag> {
        local_name(&element.tag, self.namespace).and_then(SchemaTag::from_local)
    }

    fn find<'d>(
        &'d self,
        root: &'d Element,
        tag: SchemaTag,
    ) -> impl Iterator<Item = &'d Element> + 'd {
        root.descendants()
            .filter(move |element| self.tag_of(element) == Some(tag))
    }

    fn parse(&self, root: &Element) -> Parsed<ClassifierDocument> {
        let mut parsed = ClassifierDocument::default();
        for element in root.descendants() {
            match self.tag_of(element) {
                Some(SchemaTag::FeatureSet) => {
                    parsed.feature_sets.push(self.feature_set(element)?);
                }
                Some(SchemaTag::ClassifierInstance) => {
                    parsed
                        .classifier_instances
                        .push(self.classifier_instance(element)?);
                }
                Some(SchemaTag::ClassifierPrediction) => {
                    parsed
                        .classifier_predictions
                        .push(self.classifier_prediction(element)?);
                }
                _ => {}
            }
        }

        debug!(
            namespace = ?self.namespace,
            feature_sets = parsed.feature_sets.len(),
            classifier_instances = parsed.classifier_instances.len(),
            classifier_predictions = parsed.classifier_predictions.len(),
            "Parsed classifier document"
        );
        Ok(parsed)
    }

    /// Looks up an attribute, accepting a key qualified in the document namespace.
    fn attribute<'e>(&self, element: &'e Element, name: &'static str) -> Option<&'e str> {
        element.attribute(name).or_else(|| match self.namespace {
            Some(_) => element.attribute(&qualify(name, self.namespace)),
            None => None,
        })
    }

    fn required<'e>(&self, element: &'e Element, name: &'static str) -> Parsed<&'e str> {
        self.attribute(element, name)
            .ok_or_else(|| InvalidDocument::missing_attribute(name, element.tag.as_str()))
    }

    fn integer(&self, element: &Element, name: &'static str) -> Parsed<i64> {
        let value = self.required(element, name)?;
        parse_integer(value, name, element)
    }

    fn channels(&self, element: &Element) -> Parsed<Channels> {
        let Some(value) = self.attribute(element, "c") else {
            return Ok(Channels::Unspecified);
        };
        if value.trim().is_empty() {
            return Ok(Channels::List(Vec::new()));
        }
        value
            .split(',')
            .map(|item| parse_integer(item, "c", element))
            .collect::<Parsed<Vec<_>>>()
            .map(Channels::List)
    }

    fn algorithm(&self, element: &Element) -> Parsed<Algorithm> {
        let id = self.integer(element, "scriptId")?;
        let mut parameters = BTreeMap::new();

        for child in element.children() {
            if self.tag_of(child) != Some(SchemaTag::Parameter) {
                return Err(unexpected(child, element));
            }
            ensure_leaf(child)?;
            let name = self.required(child, "name")?;
            let value = self.required(child, "value")?;
            if parameters.contains_key(name) {
                return Err(InvalidDocument::duplicate(
                    format!("parameter name '{}'", name),
                    element.tag.as_str(),
                ));
            }
            parameters.insert(name.to_string(), value.to_string());
        }

        trace!(script_id = id, parameters = parameters.len(), "Parsed algorithm");
        Ok(Algorithm { id, parameters })
    }

    /// `FeatureTable`, `SelectedFeaturesTable` and `FeatureWeightsTable`.
    fn table(&self, element: &Element) -> Parsed<i64> {
        let id = self.integer(element, "originalFileId")?;
        ensure_leaf(element)?;
        Ok(id)
    }

    fn training_features(&self, element: &Element) -> Parsed<i64> {
        let id = self.integer(element, "annotationId")?;
        ensure_leaf(element)?;
        Ok(id)
    }

    fn image(&self, element: &Element) -> Parsed<ImageRef> {
        let image = ImageRef {
            id: self.integer(element, "id")?,
            z: self.integer(element, "z")?,
            c: self.channels(element)?,
            t: self.integer(element, "t")?,
        };
        ensure_leaf(element)?;
        Ok(image)
    }

    fn class_label(&self, element: &Element) -> Parsed<(i64, String)> {
        let index = self.integer(element, "index")?;
        let label = label_text(element)?;
        Ok((index, label))
    }

    fn prediction(&self, element: &Element) -> Parsed<PredictionRef> {
        let id = self.integer(element, "imageId")?;
        let z = self.integer(element, "z")?;
        let c = self.channels(element)?;
        let t = self.integer(element, "t")?;
        let mut label = None;

        for child in element.children() {
            match self.tag_of(child) {
                Some(SchemaTag::Label) => {
                    set_once(&mut label, SchemaTag::Label, element, || label_text(child))?;
                }
                _ => return Err(unexpected(child, element)),
            }
        }

        Ok(PredictionRef {
            id,
            z,
            c,
            t,
            label: present(label, SchemaTag::Label, element)?,
        })
    }

    fn feature_set(&self, element: &Element) -> Parsed<FeatureSet> {
        let mut algorithm = None;
        let mut table_id = None;
        let mut images = Vec::new();

        for child in element.children() {
            match self.tag_of(child) {
                Some(SchemaTag::Algorithm) => {
                    set_once(&mut algorithm, SchemaTag::Algorithm, element, || {
                        self.algorithm(child)
                    })?;
                }
                Some(SchemaTag::FeatureTable) => {
                    set_once(&mut table_id, SchemaTag::FeatureTable, element, || {
                        self.table(child)
                    })?;
                }
                Some(SchemaTag::Image) => images.push(self.image(child)?),
                _ => return Err(unexpected(child, element)),
            }
        }

        trace!(images = images.len(), "Parsed feature set");
        Ok(FeatureSet {
            algorithm: present(algorithm, SchemaTag::Algorithm, element)?,
            table_id: present(table_id, SchemaTag::FeatureTable, element)?,
            images,
        })
    }

    fn classifier_instance(&self, element: &Element) -> Parsed<ClassifierInstance> {
        let mut algorithm = None;
        let mut training_ids = Vec::new();
        let mut selected_id = None;
        let mut weights_id = None;
        let mut labels = BTreeMap::new();

        for child in element.children() {
            match self.tag_of(child) {
                Some(SchemaTag::Algorithm) => {
                    set_once(&mut algorithm, SchemaTag::Algorithm, element, || {
                        self.algorithm(child)
                    })?;
                }
                Some(SchemaTag::TrainingFeatures) => {
                    training_ids.push(self.training_features(child)?);
                }
                Some(SchemaTag::SelectedFeaturesTable) => {
                    set_once(
                        &mut selected_id,
                        SchemaTag::SelectedFeaturesTable,
                        element,
                        || self.table(child),
                    )?;
                }
                Some(SchemaTag::FeatureWeightsTable) => {
                    set_once(
                        &mut weights_id,
                        SchemaTag::FeatureWeightsTable,
                        element,
                        || self.table(child),
                    )?;
                }
                Some(SchemaTag::ClassLabel) => {
                    let (index, label) = self.class_label(child)?;
                    if labels.contains_key(&index) {
                        return Err(InvalidDocument::duplicate(
                            format!("class label index {}", index),
                            element.tag.as_str(),
                        ));
                    }
                    labels.insert(index, label);
                }
                _ => return Err(unexpected(child, element)),
            }
        }

        trace!(
            training = training_ids.len(),
            labels = labels.len(),
            "Parsed classifier instance"
        );
        Ok(ClassifierInstance {
            algorithm: present(algorithm, SchemaTag::Algorithm, element)?,
            training_ids,
            selected_id: present(selected_id, SchemaTag::SelectedFeaturesTable, element)?,
            weights_id: present(weights_id, SchemaTag::FeatureWeightsTable, element)?,
            labels,
        })
    }

    fn classifier_prediction(&self, element: &Element) -> Parsed<ClassifierPrediction> {
        let mut algorithm = None;
        let mut predictions = Vec::new();

        for child in element.children() {
            match self.tag_of(child) {
                Some(SchemaTag::Algorithm) => {
                    set_once(&mut algorithm, SchemaTag::Algorithm, element, || {
                        self.algorithm(child)
                    })?;
                }
                Some(SchemaTag::Prediction) => predictions.push(self.prediction(child)?),
                _ => return Err(unexpected(child, element)),
            }
        }

        trace!(predictions = predictions.len(), "Parsed classifier prediction");
        Ok(ClassifierPrediction {
            algorithm: present(algorithm, SchemaTag::Algorithm, element)?,
            predictions,
        })
    }
}

/// Fills a singleton slot, failing if it was already filled.
fn set_once<T>(
    slot: &mut Option<T>,
    tag: SchemaTag,
    parent: &Element,
    parse: impl FnOnce() -> Parsed<T>,
) -> Parsed<()> {
    if slot.is_some() {
        return Err(InvalidDocument::duplicate(
            format!("<{}>", tag.as_str()),
            parent.tag.as_str(),
        ));
    }
    *slot = Some(parse()?);
    Ok(())
}

fn present<T>(slot: Option<T>, tag: SchemaTag, parent: &Element) -> Parsed<T> {
    slot.ok_or_else(|| InvalidDocument::missing_element(tag.as_str(), parent.tag.as_str()))
}

fn unexpected(child: &Element, parent: &Element) -> InvalidDocument {
    InvalidDocument::unexpected_child(child.tag.as_str(), parent.tag.as_str())
}

fn ensure_leaf(element: &Element) -> Parsed<()> {
    if element.children().is_empty() {
        Ok(())
    } else {
        Err(InvalidDocument::invalid_format(
            element.tag.as_str(),
            "unexpected children",
        ))
    }
}

fn label_text(element: &Element) -> Parsed<String> {
    let text = element
        .text()
        .filter(|text| !text.is_empty())
        .ok_or_else(|| InvalidDocument::invalid_format(element.tag.as_str(), "expected text content"))?;
    ensure_leaf(element)?;
    Ok(text.to_string())
}

fn parse_integer(value: &str, attribute: &'static str, element: &Element) -> Parsed<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        InvalidDocument::invalid_format(
            element.tag.as_str(),
            format!("attribute {} expects an integer, found '{}'", attribute, value),
        )
    })
}
