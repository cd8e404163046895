use std::collections::BTreeMap;

use omero_classifier::{Channels, ClassifierError, InvalidDocument, Reader, Result};

const CLASSIFIER_INSTANCE: &str = r#"<ClassifierInstance>
  <Algorithm scriptId="5"><Parameter name="k" value="3"/></Algorithm>
  <TrainingFeatures annotationId="10"/><TrainingFeatures annotationId="11"/>
  <SelectedFeaturesTable originalFileId="100"/>
  <FeatureWeightsTable originalFileId="101"/>
  <ClassLabel index="0">ctrl</ClassLabel>
  <ClassLabel index="1">treated</ClassLabel>
</ClassifierInstance>"#;

fn invalid(xml: &str) -> InvalidDocument {
    match Reader::from_str(xml).and_then(|reader| reader.parse()) {
        Err(ClassifierError::InvalidDocument(err)) => err,
        other => panic!("expected a schema violation, got {:?}", other),
    }
}

#[test]
fn test_classifier_instance_scenario() -> Result<()> {
    let reader = Reader::from_str(CLASSIFIER_INSTANCE)?;
    assert_eq!(reader.namespace(), None);

    let instances = reader.classifier_instances()?;
    assert_eq!(instances.len(), 1);
    let instance = &instances[0];

    assert_eq!(instance.algorithm.id, 5);
    assert_eq!(
        instance.algorithm.parameters,
        BTreeMap::from([("k".to_string(), "3".to_string())])
    );
    assert_eq!(instance.training_ids, vec![10, 11]);
    assert_eq!(instance.selected_id, 100);
    assert_eq!(instance.weights_id, 101);
    assert_eq!(
        instance.labels,
        BTreeMap::from([(0, "ctrl".to_string()), (1, "treated".to_string())])
    );

    assert!(reader.feature_sets()?.is_empty());
    assert!(reader.classifier_predictions()?.is_empty());
    Ok(())
}

#[test]
fn test_wrapped_in_ome_annotation() -> Result<()> {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2012-06"
     xmlns:SA="http://www.openmicroscopy.org/Schemas/SA/2012-06">
  <SA:StructuredAnnotations>
    <SA:XMLAnnotation ID="7" Namespace="openmicroscopy.org/omero/analysis/classifier">
      <SA:Value>
        <Classifier namespace="http://www.openmicroscopy.org/Schemas/Additions/2011-09">
          <ClassifierPrediction>
            <Algorithm scriptId="8"/>
            <Prediction imageId="1" z="0" c="0" t="2"><Label>mitotic</Label></Prediction>
            <Prediction imageId="2" z="1" t="0"><Label>interphase</Label></Prediction>
          </ClassifierPrediction>
        </Classifier>
      </SA:Value>
    </SA:XMLAnnotation>
  </SA:StructuredAnnotations>
</OME>"#;

    let reader = Reader::from_str(xml)?;
    assert_eq!(
        reader.namespace(),
        Some("http://www.openmicroscopy.org/Schemas/OME/2012-06")
    );

    let predictions = reader.classifier_predictions()?;
    assert_eq!(predictions.len(), 1);
    let batch = &predictions[0].predictions;
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].label, "mitotic");
    assert_eq!(batch[0].c, Channels::List(vec![0]));
    assert_eq!(batch[0].t, 2);
    assert_eq!(batch[1].label, "interphase");
    assert!(batch[1].c.is_unspecified());
    Ok(())
}

#[test]
fn test_entities_in_document_order() -> Result<()> {
    let xml = r#"<Root>
  <FeatureSet><Algorithm scriptId="1"/><FeatureTable originalFileId="11"/></FeatureSet>
  <Group>
    <FeatureSet><Algorithm scriptId="2"/><FeatureTable originalFileId="12"/></FeatureSet>
  </Group>
  <FeatureSet><Algorithm scriptId="3"/><FeatureTable originalFileId="13"/></FeatureSet>
</Root>"#;

    let parsed = Reader::from_str(xml)?.parse()?;
    let tables: Vec<i64> = parsed.feature_sets.iter().map(|f| f.table_id).collect();
    assert_eq!(tables, vec![11, 12, 13]);
    Ok(())
}

#[test]
fn test_elements_outside_root_namespace_are_ignored() -> Result<()> {
    let xml = r#"<OME xmlns="urn:ome" xmlns:x="urn:x">
  <x:FeatureSet><x:Algorithm scriptId="1"/></x:FeatureSet>
  <FeatureSet><Algorithm scriptId="2"/><FeatureTable originalFileId="4"/></FeatureSet>
</OME>"#;

    let parsed = Reader::from_str(xml)?.parse()?;
    assert_eq!(parsed.feature_sets.len(), 1);
    assert_eq!(parsed.feature_sets[0].algorithm.id, 2);
    Ok(())
}

#[test]
fn test_duplicate_algorithm() {
    let err = invalid(
        r#"<FeatureSet>
  <Algorithm scriptId="1"/>
  <Algorithm scriptId="2"/>
  <FeatureTable originalFileId="3"/>
</FeatureSet>"#,
    );
    assert!(matches!(err, InvalidDocument::DuplicateElement { .. }));
    assert_eq!(err.to_string(), "duplicate <Algorithm> in <FeatureSet>");
}

#[test]
fn test_duplicate_parameter_name() {
    let err = invalid(
        r#"<ClassifierPrediction>
  <Algorithm scriptId="1">
    <Parameter name="k" value="3"/>
    <Parameter name="k" value="4"/>
  </Algorithm>
</ClassifierPrediction>"#,
    );
    assert!(matches!(err, InvalidDocument::DuplicateElement { .. }));
}

#[test]
fn test_duplicate_label_index() {
    let xml = CLASSIFIER_INSTANCE.replace(r#"index="1""#, r#"index="0""#);
    let err = invalid(&xml);
    assert_eq!(
        err,
        InvalidDocument::duplicate("class label index 0", "ClassifierInstance")
    );
}

#[test]
fn test_missing_singleton() {
    let err = invalid(r#"<FeatureSet><Algorithm scriptId="1"/></FeatureSet>"#);
    assert_eq!(
        err,
        InvalidDocument::missing_element("FeatureTable", "FeatureSet")
    );
}

#[test]
fn test_unexpected_child() {
    let err = invalid(
        r#"<ClassifierPrediction><Algorithm scriptId="1"/><Image id="1" z="0" t="0"/></ClassifierPrediction>"#,
    );
    assert_eq!(
        err,
        InvalidDocument::unexpected_child("Image", "ClassifierPrediction")
    );
}

#[test]
fn test_empty_label() {
    let err = invalid(
        r#"<ClassifierPrediction>
  <Algorithm scriptId="1"/>
  <Prediction imageId="1" z="0" t="0"><Label></Label></Prediction>
</ClassifierPrediction>"#,
    );
    assert!(matches!(err, InvalidDocument::InvalidFormat { .. }));
}

#[test]
fn test_prediction_without_label() {
    let err = invalid(
        r#"<ClassifierPrediction><Algorithm scriptId="1"/><Prediction imageId="1" z="0" t="0"/></ClassifierPrediction>"#,
    );
    assert_eq!(err, InvalidDocument::missing_element("Label", "Prediction"));
}

#[test]
fn test_first_violation_aborts_whole_parse() {
    let xml = r#"<Root>
  <FeatureSet><Algorithm scriptId="1"/><FeatureTable originalFileId="2"/></FeatureSet>
  <FeatureSet><Algorithm scriptId="x"/><FeatureTable originalFileId="2"/></FeatureSet>
</Root>"#;
    let reader = Reader::from_str(xml).expect("well-formed");
    assert!(reader.parse().is_err());
    assert!(reader.feature_sets().is_err());
    // Other kinds are unaffected.
    assert!(reader.classifier_instances().expect("no instances").is_empty());
}

#[test]
fn test_malformed_xml_is_not_a_schema_error() {
    let err = Reader::from_str("<FeatureSet><Algorithm></FeatureSet>").unwrap_err();
    assert!(matches!(err, ClassifierError::Xml(_)));
    assert!(err.as_invalid_document().is_none());
}

#[test]
fn test_from_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("instance.xml");
    std::fs::write(&path, CLASSIFIER_INSTANCE)?;

    let reader = Reader::from_path(&path)?;
    assert_eq!(reader.classifier_instances()?[0].weights_id, 101);
    assert_eq!(reader.document().root.tag, "ClassifierInstance");
    Ok(())
}

fn feature_set(body: &str) -> String {
    format!(r#"<FeatureSet>{}</FeatureSet>"#, body)
}

fn classifier_instance(body: &str) -> String {
    format!(r#"<ClassifierInstance>{}</ClassifierInstance>"#, body)
}

fn classifier_prediction(body: &str) -> String {
    format!(
        r#"<ClassifierPrediction><Algorithm scriptId="1"/>{}</ClassifierPrediction>"#,
        body
    )
}

#[test]
fn test_duplicate_singletons() {
    let algorithm = r#"<Algorithm scriptId="1"/>"#;
    let selected = r#"<SelectedFeaturesTable originalFileId="2"/>"#;
    let weights = r#"<FeatureWeightsTable originalFileId="3"/>"#;
    let cases = [
        (
            feature_set(&format!(
                r#"{}<FeatureTable originalFileId="2"/><FeatureTable originalFileId="3"/>"#,
                algorithm
            )),
            "<FeatureTable>",
            "FeatureSet",
        ),
        (
            classifier_instance(&format!("{a}{a}{s}{w}", a = algorithm, s = selected, w = weights)),
            "<Algorithm>",
            "ClassifierInstance",
        ),
        (
            classifier_instance(&format!("{a}{s}{s}{w}", a = algorithm, s = selected, w = weights)),
            "<SelectedFeaturesTable>",
            "ClassifierInstance",
        ),
        (
            classifier_instance(&format!("{a}{s}{w}{w}", a = algorithm, s = selected, w = weights)),
            "<FeatureWeightsTable>",
            "ClassifierInstance",
        ),
        (
            format!(
                r#"<ClassifierPrediction>{a}{a}</ClassifierPrediction>"#,
                a = algorithm
            ),
            "<Algorithm>",
            "ClassifierPrediction",
        ),
        (
            classifier_prediction(
                r#"<Prediction imageId="1" z="0" t="0"><Label>a</Label><Label>b</Label></Prediction>"#,
            ),
            "<Label>",
            "Prediction",
        ),
    ];

    for (xml, what, parent) in cases {
        assert_eq!(invalid(&xml), InvalidDocument::duplicate(what, parent), "{}", xml);
    }
}

#[test]
fn test_leaf_elements_reject_children() {
    let instance_tail = r#"<SelectedFeaturesTable originalFileId="2"/><FeatureWeightsTable originalFileId="3"/>"#;
    let cases = [
        (
            feature_set(r#"<Algorithm scriptId="1"/><FeatureTable originalFileId="2"/><Image id="1" z="0" t="0"><x/></Image>"#),
            "Image",
        ),
        (
            feature_set(r#"<Algorithm scriptId="1"/><FeatureTable originalFileId="2"><x/></FeatureTable>"#),
            "FeatureTable",
        ),
        (
            classifier_instance(
                r#"<Algorithm scriptId="1"/><SelectedFeaturesTable originalFileId="2"><x/></SelectedFeaturesTable>"#,
            ),
            "SelectedFeaturesTable",
        ),
        (
            classifier_instance(
                r#"<Algorithm scriptId="1"/><SelectedFeaturesTable originalFileId="2"/><FeatureWeightsTable originalFileId="3"><x/></FeatureWeightsTable>"#,
            ),
            "FeatureWeightsTable",
        ),
        (
            classifier_instance(&format!(
                r#"<Algorithm scriptId="1"/><TrainingFeatures annotationId="4"><x/></TrainingFeatures>{}"#,
                instance_tail
            )),
            "TrainingFeatures",
        ),
        (
            classifier_instance(&format!(
                r#"<Algorithm scriptId="1"/>{}<ClassLabel index="0">a<x/></ClassLabel>"#,
                instance_tail
            )),
            "ClassLabel",
        ),
        (
            classifier_prediction(r#"<Prediction imageId="1" z="0" t="0"><Label>a<x/></Label></Prediction>"#),
            "Label",
        ),
    ];

    for (xml, element) in cases {
        assert_eq!(
            invalid(&xml),
            InvalidDocument::invalid_format(element, "unexpected children"),
            "{}",
            xml
        );
    }
}

#[test]
fn test_missing_plane_coordinates() {
    let image_set = |image: &str| {
        feature_set(&format!(
            r#"<Algorithm scriptId="1"/><FeatureTable originalFileId="2"/>{}"#,
            image
        ))
    };
    let cases = [
        (image_set(r#"<Image id="1" t="0"/>"#), "z", "Image"),
        (image_set(r#"<Image id="1" z="0"/>"#), "t", "Image"),
        (
            classifier_prediction(r#"<Prediction imageId="1" t="0"><Label>a</Label></Prediction>"#),
            "z",
            "Prediction",
        ),
        (
            classifier_prediction(r#"<Prediction imageId="1" z="0"><Label>a</Label></Prediction>"#),
            "t",
            "Prediction",
        ),
    ];

    for (xml, attribute, element) in cases {
        assert_eq!(
            invalid(&xml),
            InvalidDocument::missing_attribute(attribute, element),
            "{}",
            xml
        );
    }
}

#[test]
fn test_deeply_nested_document() -> Result<()> {
    let depth = 100_000;
    let xml = format!(
        "<Root>{}{}</Root>",
        "<a>".repeat(depth),
        "</a>".repeat(depth)
    );
    let reader = Reader::from_str(&xml)?;
    assert!(reader.parse()?.is_empty());
    Ok(())
}
