//! Embeds classifier entities into an OME-XML structured annotation.
//!
//! The output always has the same wrapper:
//!
//! ```xml
//! <OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2012-06"
//!      xmlns:SA="http://www.openmicroscopy.org/Schemas/SA/2012-06">
//!   <SA:StructuredAnnotations>
//!     <SA:XMLAnnotation Namespace="openmicroscopy.org/omero/analysis/classifier" ID="...">
//!       <SA:Value>
//!         <Classifier namespace="http://www.openmicroscopy.org/Schemas/Additions/2011-09">
//!           <!-- FeatureSet | ClassifierInstance | ClassifierPrediction -->
//! ```
//!
//! Elements are built unqualified and then moved into the writer's default
//! namespace, so the reader finds them under the namespace of `<OME>`.

use std::io::Write;
use std::path::Path;

use omero_xml::namespace::{backfill_default_namespace, qualify};
use omero_xml::{Document, Element, SerializeOptions};
use tracing::debug;

use crate::error::{InvalidDocument, Result};
use crate::model::{
    Algorithm, Channels, ClassifierEntity, ClassifierInstance, ClassifierPrediction, FeatureSet,
    ImageRef, PredictionRef,
};

/// Value of the `Namespace` attribute on the classifier `XMLAnnotation`.
pub const CLASSIFIER_NAMESPACE: &str = "openmicroscopy.org/omero/analysis/classifier";

/// Value of the `namespace` attribute on `<Classifier>`.
pub const ADDITIONS_NAMESPACE: &str = "http://www.openmicroscopy.org/Schemas/Additions/2011-09";

/// Namespace of the structured annotation wrapper elements.
pub const STRUCTURED_ANNOTATIONS_NAMESPACE: &str = "http://www.openmicroscopy.org/Schemas/SA/2012-06";

/// Default namespace of written documents.
pub const OME_NAMESPACE: &str = "http://www.openmicroscopy.org/Schemas/OME/2012-06";

/// Output settings of a [`Writer`].
///
/// These belong to one writer instance; two writers with different settings
/// never affect each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Namespace given to every unqualified element.
    pub default_namespace: String,
    /// `(prefix, uri)` pairs used when writing qualified names.
    pub prefixes: Vec<(String, String)>,
    /// Emit an XML declaration before the root element.
    pub xml_declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            default_namespace: OME_NAMESPACE.to_string(),
            prefixes: vec![(
                "SA".to_string(),
                STRUCTURED_ANNOTATIONS_NAMESPACE.to_string(),
            )],
            xml_declaration: true,
        }
    }
}

/// Builds and serializes classifier annotations.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            default_namespace: Some(self.config.default_namespace.clone()),
            prefixes: self.config.prefixes.clone(),
            xml_declaration: self.config.xml_declaration,
        }
    }

    /// Builds the annotation tree around `entity`.
    ///
    /// `annotation_id` becomes the `ID` attribute of the `XMLAnnotation`.
    pub fn build(&self, entity: Option<&ClassifierEntity>, annotation_id: Option<i64>) -> Result<Document> {
        let mut annotation = Element::new(sa("XMLAnnotation"))
            .with_attribute("Namespace", CLASSIFIER_NAMESPACE);
        if let Some(id) = annotation_id {
            annotation.set_attribute("ID", id.to_string());
        }

        let mut classifier = Element::new("Classifier").with_attribute("namespace", ADDITIONS_NAMESPACE);
        if let Some(entity) = entity {
            classifier.push_child(entity_element(entity)?);
        }

        let mut root = Element::new("OME").with_child(
            Element::new(sa("StructuredAnnotations"))
                .with_child(annotation.with_child(Element::new(sa("Value")).with_child(classifier))),
        );
        backfill_default_namespace(&mut root, &self.config.default_namespace)?;

        debug!(
            kind = entity.map(ClassifierEntity::tag),
            annotation_id,
            "Built classifier annotation"
        );
        Ok(Document::new(root))
    }

    /// Serializes the annotation around `entity` to bytes.
    pub fn serialize(&self, entity: Option<&ClassifierEntity>, annotation_id: Option<i64>) -> Result<Vec<u8>> {
        let document = self.build(entity, annotation_id)?;
        Ok(document.to_vec(&self.serialize_options())?)
    }

    /// Serializes the annotation around `entity` to a string.
    pub fn to_string(&self, entity: Option<&ClassifierEntity>, annotation_id: Option<i64>) -> Result<String> {
        let document = self.build(entity, annotation_id)?;
        Ok(document.to_string(&self.serialize_options())?)
    }

    /// Writes the annotation around `entity` into `writer`.
    pub fn write_to<W: Write>(
        &self,
        writer: W,
        entity: Option<&ClassifierEntity>,
        annotation_id: Option<i64>,
    ) -> Result<()> {
        let document = self.build(entity, annotation_id)?;
        Ok(document.write_to(writer, &self.serialize_options())?)
    }

    /// Writes the annotation around `entity` to the file at `path`.
    pub fn write_file(
        &self,
        path: impl AsRef<Path>,
        entity: Option<&ClassifierEntity>,
        annotation_id: Option<i64>,
    ) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let mut out = std::io::BufWriter::new(file);
        self.write_to(&mut out, entity, annotation_id)?;
        out.flush()?;
        debug!(path = %path.display(), "Wrote classifier annotation");
        Ok(())
    }
}

fn sa(local: &str) -> String {
    qualify(local, Some(STRUCTURED_ANNOTATIONS_NAMESPACE))
}

fn entity_element(entity: &ClassifierEntity) -> Result<Element> {
    match entity {
        ClassifierEntity::FeatureSet(entity) => Ok(feature_set_element(entity)),
        ClassifierEntity::ClassifierInstance(entity) => classifier_instance_element(entity),
        ClassifierEntity::ClassifierPrediction(entity) => classifier_prediction_element(entity),
    }
}

fn algorithm_element(algorithm: &Algorithm) -> Element {
    let mut element = Element::new("Algorithm").with_attribute("scriptId", algorithm.id.to_string());
    for (name, value) in &algorithm.parameters {
        element.push_child(
            Element::new("Parameter")
                .with_attribute("name", name.as_str())
                .with_attribute("value", value.as_str()),
        );
    }
    element
}

fn table_element(tag: &str, id: i64) -> Element {
    Element::new(tag).with_attribute("originalFileId", id.to_string())
}

fn plane_attributes(mut element: Element, id_attribute: &str, id: i64, z: i64, c: &Channels, t: i64) -> Element {
    element.set_attribute(id_attribute, id.to_string());
    element.set_attribute("z", z.to_string());
    if let Some(channels) = c.to_attribute() {
        element.set_attribute("c", channels);
    }
    element.set_attribute("t", t.to_string());
    element
}

fn image_element(image: &ImageRef) -> Element {
    plane_attributes(Element::new("Image"), "id", image.id, image.z, &image.c, image.t)
}

fn label_element(tag: &str, label: &str) -> Result<Element> {
    if label.is_empty() {
        return Err(InvalidDocument::invalid_format(tag, "label text must not be empty").into());
    }
    Ok(Element::new(tag).with_text(label))
}

fn prediction_element(prediction: &PredictionRef) -> Result<Element> {
    let element = plane_attributes(
        Element::new("Prediction"),
        "imageId",
        prediction.id,
        prediction.z,
        &prediction.c,
        prediction.t,
    );
    Ok(element.with_child(label_element("Label", &prediction.label)?))
}

fn feature_set_element(feature_set: &FeatureSet) -> Element {
    let mut element = Element::new("FeatureSet")
        .with_child(algorithm_element(&feature_set.algorithm))
        .with_child(table_element("FeatureTable", feature_set.table_id));
    for image in &feature_set.images {
        element.push_child(image_element(image));
    }
    element
}

fn classifier_instance_element(instance: &ClassifierInstance) -> Result<Element> {
    let mut element = Element::new("ClassifierInstance").with_child(algorithm_element(&instance.algorithm));
    for id in &instance.training_ids {
        element.push_child(Element::new("TrainingFeatures").with_attribute("annotationId", id.to_string()));
    }
    element.push_child(table_element("SelectedFeaturesTable", instance.selected_id));
    element.push_child(table_element("FeatureWeightsTable", instance.weights_id));
    for (index, label) in &instance.labels {
        element.push_child(label_element("ClassLabel", label)?.with_attribute("index", index.to_string()));
    }
    Ok(element)
}

fn classifier_prediction_element(prediction: &ClassifierPrediction) -> Result<Element> {
    let mut element = Element::new("ClassifierPrediction").with_child(algorithm_element(&prediction.algorithm));
    for entry in &prediction.predictions {
        element.push_child(prediction_element(entry)?);
    }
    Ok(element)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ome(local: &str) -> String {
        qualify(local, Some(OME_NAMESPACE))
    }

    #[test]
    fn test_wrapper_hierarchy() {
        let document = Writer::new().build(None, Some(42)).unwrap();
        let root = &document.root;
        assert_eq!(root.tag, ome("OME"));

        let structured = &root.children[0];
        assert_eq!(structured.tag, sa("StructuredAnnotations"));
        let annotation = &structured.children[0];
        assert_eq!(annotation.tag, sa("XMLAnnotation"));
        assert_eq!(annotation.attribute("Namespace"), Some(CLASSIFIER_NAMESPACE));
        assert_eq!(annotation.attribute("ID"), Some("42"));

        let classifier = &annotation.children[0].children[0];
        assert_eq!(classifier.tag, ome("Classifier"));
        assert_eq!(
            classifier.attribute(&ome("namespace")),
            Some(ADDITIONS_NAMESPACE)
        );
        assert!(classifier.children.is_empty());
    }

    #[test]
    fn test_annotation_id_optional() {
        let document = Writer::new().build(None, None).unwrap();
        let annotation = &document.root.children[0].children[0];
        assert_eq!(annotation.attribute("ID"), None);
    }

    #[test]
    fn test_feature_set_without_images_keeps_algorithm_and_table() {
        let entity = ClassifierEntity::from(FeatureSet {
            algorithm: Algorithm::new(1),
            table_id: 77,
            images: vec![],
        });
        let xml = Writer::new().to_string(Some(&entity), None).unwrap();
        assert!(xml.contains(r#"<FeatureSet><Algorithm scriptId="1"/><FeatureTable originalFileId="77"/></FeatureSet>"#));
    }

    #[test]
    fn test_channels_rendering() {
        let entity = ClassifierEntity::from(FeatureSet {
            algorithm: Algorithm::new(1),
            table_id: 2,
            images: vec![
                ImageRef { id: 5, z: 1, c: Channels::Unspecified, t: 2 },
                ImageRef { id: 6, z: 1, c: Channels::List(vec![0, 2]), t: 2 },
            ],
        });
        let xml = Writer::new().to_string(Some(&entity), None).unwrap();
        assert!(xml.contains(r#"<Image id="5" t="2" z="1"/>"#));
        assert!(xml.contains(r#"<Image c="0,2" id="6" t="2" z="1"/>"#));
    }

    #[test]
    fn test_empty_label_rejected() {
        let entity = ClassifierEntity::from(ClassifierInstance {
            algorithm: Algorithm::new(1),
            training_ids: vec![],
            selected_id: 1,
            weights_id: 2,
            labels: BTreeMap::from([(0, String::new())]),
        });
        let err = Writer::new().serialize(Some(&entity), None).unwrap_err();
        assert!(matches!(
            err.as_invalid_document(),
            Some(InvalidDocument::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_config_is_per_instance() {
        let custom = Writer::with_config(WriterConfig {
            default_namespace: "urn:custom".to_string(),
            prefixes: vec![("S".to_string(), STRUCTURED_ANNOTATIONS_NAMESPACE.to_string())],
            xml_declaration: false,
        });
        let standard = Writer::new();

        let custom_xml = custom.to_string(None, None).unwrap();
        let standard_xml = standard.to_string(None, None).unwrap();

        assert!(custom_xml.starts_with(r#"<OME xmlns="urn:custom" xmlns:S="#));
        assert!(custom_xml.contains("<S:StructuredAnnotations>"));
        assert!(standard_xml.starts_with("<?xml"));
        assert!(standard_xml.contains("<SA:StructuredAnnotations>"));
    }
}
