//! Integration tests for labeled block files, training and bundles.

use std::fs;
use std::path::Path;

use docoutline::classify::{ModelState, TreeEnsemble};
use docoutline::error::Error;
use docoutline::labeling::{load_labeled_dir, write_blocks};
use docoutline::model::{PageContent, RawBlock, RawLine, RawSpan, SpanFlags};
use docoutline::parser::InMemoryPages;
use docoutline::{
    outline_file, train_dir, BBox, Bundle, Classifier, ExtractOptions, Label, Outliner,
    OutlinerOptions, TextBlock, Vocabulary, FEATURE_NAMES,
};

fn labeled(text: &str, y: f32, size: f32, bold: bool, label: &str) -> TextBlock {
    let mut block = TextBlock::new(text, BBox::new(72.0, y, 400.0, y + size), 1);
    block.font_size = size;
    block.is_bold = bold;
    block.font_name = if bold { "Arial-Bold" } else { "Arial" }.to_string();
    block.language = Some("en".to_string());
    block.label = Some(label.to_string());
    block
}

fn labeled_document() -> Vec<TextBlock> {
    vec![
        labeled("Field Guide to Rivers", 60.0, 26.0, true, "TITLE"),
        labeled("1. Sources", 140.0, 18.0, true, "H1"),
        labeled("Rivers begin in mountains and springs.", 170.0, 11.0, false, "NONE"),
        labeled("1.1 Glaciers", 220.0, 14.0, true, "H2"),
        labeled("Meltwater feeds many large rivers.", 250.0, 11.0, false, "NONE"),
        labeled("2. Deltas", 320.0, 18.0, true, "H1"),
        labeled("Sediment settles where rivers slow.", 350.0, 11.0, false, "NONE"),
    ]
}

fn write_corpus(dir: &Path) {
    write_blocks(dir.join("rivers.json"), &labeled_document()).unwrap();
    write_blocks(dir.join("rivers-copy.json"), &labeled_document()).unwrap();
}

fn raw(text: &str, y: f32, size: f32, bold: bool) -> RawBlock {
    let bbox = BBox::new(72.0, y, 400.0, y + size);
    let flags = if bold {
        SpanFlags(SpanFlags::BOLD)
    } else {
        SpanFlags::default()
    };
    let font = if bold { "Arial-Bold" } else { "Arial" };
    RawBlock::new(
        bbox,
        vec![RawLine::new(vec![RawSpan::new(text, font, size, flags, bbox)])],
    )
}

#[test]
fn test_train_from_directory_and_predict() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());

    let (dataset, bundle) = train_dir(dir.path()).unwrap();
    assert_eq!(dataset.len(), 14);
    assert_eq!(dataset.feature_names, FEATURE_NAMES.to_vec());
    assert_eq!(bundle.font_map.get("Arial"), Some(0));
    assert_eq!(bundle.font_map.get("Arial-Bold"), Some(1));
    assert_eq!(bundle.model.kind(), "nearest_centroid");

    // TITLE and H2 each have one distinct row, which is their centroid.
    assert_eq!(bundle.predict(&dataset.features[0]).unwrap(), Label::Title.id());
    assert_eq!(bundle.predict(&dataset.features[3]).unwrap(), Label::H2.id());

    let bundle_path = dir.path().join("model").join("bundle.json");
    fs::create_dir_all(bundle_path.parent().unwrap()).unwrap();
    bundle.save(&bundle_path).unwrap();

    let options = OutlinerOptions::new()
        .with_extract_options(ExtractOptions::new().with_language_detection(false));
    let outliner = Outliner::from_bundle_with_options(Bundle::load(&bundle_path).unwrap(), options);

    // The extracted blocks carry "unknown" as language, which the bundle
    // never saw; it maps to the sentinel id.
    let page = PageContent::letter(1).with_blocks(vec![
        raw("Field Guide to Rivers", 60.0, 26.0, true),
        raw("1. Sources", 140.0, 18.0, true),
        raw("Rivers begin in mountains and springs.", 170.0, 11.0, false),
    ]);
    let blocks = outliner
        .extract_blocks(&InMemoryPages::new(vec![page]))
        .unwrap();
    let labels = outliner.classify(&blocks).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[2], Label::None);
}

#[test]
fn test_invalid_label_names_file_and_block() {
    let dir = tempfile::tempdir().unwrap();
    let mut blocks = labeled_document();
    blocks[4].label = Some("HEADING".to_string());
    write_blocks(dir.path().join("bad.json"), &blocks).unwrap();

    match train_dir(dir.path()) {
        Err(Error::InvalidLabel {
            label,
            source_name,
            index,
        }) => {
            assert_eq!(label, "HEADING");
            assert!(source_name.ends_with("bad.json"));
            assert_eq!(index, 4);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("training should fail"),
    }
}

#[test]
fn test_unlabeled_blocks_count_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut blocks = labeled_document();
    blocks[2].label = None;
    write_blocks(dir.path().join("doc.json"), &blocks).unwrap();

    let docs = load_labeled_dir(dir.path()).unwrap();
    assert_eq!(docs[0].labels().unwrap()[2], Label::None);
}

#[test]
fn test_bundle_with_reordered_schema_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let (_, bundle) = train_dir(dir.path()).unwrap();

    let mut json: serde_json::Value = serde_json::to_value(&bundle).unwrap();
    let names = json["feature_names"].as_array_mut().unwrap();
    names.swap(0, 3);
    let path = dir.path().join("stale.json");
    fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

    assert!(matches!(
        Bundle::load(&path),
        Err(Error::SchemaMismatch { .. })
    ));
    // The bundle is rejected before the (missing) document is opened.
    assert!(matches!(
        outline_file(&path, dir.path().join("missing.pdf")),
        Err(Error::SchemaMismatch { .. })
    ));
}

#[test]
fn test_missing_bundle_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Outliner::load(dir.path().join("nope.json")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_tree_ensemble_bundle_from_json() {
    // Six single-leaf trees: class H3 always has the largest margin.
    let trees: Vec<serde_json::Value> = (0..6)
        .map(|class| {
            let value = if class == Label::H3.id() { 1.0 } else { 0.0 };
            serde_json::json!({ "nodes": [{ "kind": "leaf", "value": value }] })
        })
        .collect();
    let bundle = Bundle::new(
        Vocabulary::default(),
        ModelState::TreeEnsemble(TreeEnsemble {
            num_class: 6,
            base_score: 0.5,
            trees: serde_json::from_value(serde_json::Value::Array(trees)).unwrap(),
        }),
    );
    let json = serde_json::to_string(&bundle).unwrap();
    let loaded = Bundle::from_json(&json).unwrap();
    assert_eq!(loaded.predict(&[0.0; 23]).unwrap(), Label::H3.id());
}
