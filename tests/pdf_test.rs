//! End-to-end tests on small PDFs generated with lopdf.

use std::path::Path;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use docoutline::classify::Classifier;
use docoutline::error::{Error, Result};
use docoutline::pipeline::NamedPages;
use docoutline::{
    extract_blocks_with_options, ExtractOptions, Label, Outliner, OutlinerOptions, ParseOptions,
    PdfParser, Vocabulary,
};

struct Fixed(Label);

impl Classifier for Fixed {
    fn predict(&self, _features: &[f32]) -> Result<u8> {
        Ok(self.0.id())
    }
}

fn text_op(font: &str, size: i64, x: i64, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn stroke_line(x0: i64, y0: i64, x1: i64, y1: i64) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![x0.into(), y0.into()]),
        Operation::new("l", vec![x1.into(), y1.into()]),
        Operation::new("S", vec![]),
    ]
}

/// A one-page report: title, numbered heading, body text and a ruled
/// table holding one cell.
fn write_report(path: &Path) {
    write_report_with(path, Vec::new());
}

/// The same report with extra content-stream operations appended.
fn write_report_with(path: &Path, extra: Vec<Operation>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let mut operations = Vec::new();
    operations.extend(text_op("F2", 24, 72, 720, "Annual Report"));
    operations.extend(text_op("F2", 16, 72, 660, "1. Introduction"));
    operations.extend(text_op("F1", 10, 72, 630, "This report describes the results."));
    operations.extend(stroke_line(100, 400, 500, 400));
    operations.extend(stroke_line(100, 300, 500, 300));
    operations.extend(stroke_line(100, 300, 100, 400));
    operations.extend(stroke_line(500, 300, 500, 400));
    operations.extend(text_op("F1", 10, 150, 350, "Cell text"));
    operations.extend(extra);
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
        },
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn no_language() -> ExtractOptions {
    ExtractOptions::new().with_language_detection(false)
}

#[test]
fn test_extract_blocks_from_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_report(&path);

    let blocks = extract_blocks_with_options(&path, ParseOptions::default(), no_language()).unwrap();
    let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Annual Report",
            "1. Introduction",
            "This report describes the results.",
            "Cell text"
        ]
    );

    let title = &blocks[0];
    assert_eq!(title.page_number, 1);
    assert_eq!(title.page_width, 612.0);
    assert_eq!(title.font_size, 24.0);
    assert_eq!(title.font_name, "Helvetica-Bold");
    assert!(title.is_bold);
    assert!(title.bbox.y0 < 100.0);

    assert!(!blocks[2].is_bold);
    assert!(blocks[3].is_in_table);
    assert!(blocks[..3].iter().all(|b| !b.is_in_table));
}

#[test]
fn test_process_file_skips_table_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_report(&path);

    let options = OutlinerOptions::new().with_extract_options(no_language());
    let outliner = Outliner::with_options(Arc::new(Fixed(Label::H2)), Vocabulary::default(), options);
    let result = outliner.process_file(&path).unwrap();

    assert_eq!(result.title, "Document Title Not Found");
    assert_eq!(result.outline.len(), 3);
    assert!(result.outline.iter().all(|e| e.level == "H2" && e.page == 1));
    assert!(result.outline.iter().all(|e| e.text != "Cell text"));
}

#[test]
fn test_parser_reports_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_report(&path);

    let parser = PdfParser::open(&path).unwrap();
    assert_eq!(parser.version(), "1.5");
    use docoutline::PageSource;
    assert_eq!(parser.page_count(), 1);
    assert_eq!(parser.page_numbers(), vec![1]);
    assert!(matches!(parser.page(2), Err(Error::PageOutOfRange(2, 1))));
}

#[test]
fn test_batch_mixes_files_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.pdf");
    write_report(&good);
    let bad = dir.path().join("bad.pdf");
    std::fs::write(&bad, b"not a pdf at all").unwrap();

    let options = OutlinerOptions::new().with_extract_options(no_language());
    let outliner = Outliner::with_options(Arc::new(Fixed(Label::H1)), Vocabulary::default(), options);
    let report = outliner.process_batch(&[bad.clone(), good.clone()]);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, bad.display().to_string());
    assert!(report.failed[0].error.contains("not a valid PDF"));
    assert_eq!(report.succeeded[0].result.outline.len(), 3);

    // In-memory inputs go through the same batch path.
    let named = vec![NamedPages::new("empty", vec![])];
    assert_eq!(outliner.process_batch(&named).succeeded.len(), 1);
}

#[test]
fn test_text_far_off_page_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("far.pdf");
    write_report_with(&path, text_op("F1", 10, 100_000_000_000, 600, "Far away"));

    let blocks = extract_blocks_with_options(&path, ParseOptions::default(), no_language()).unwrap();
    let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(blocks.len(), 5);
    assert!(texts.contains(&"Far away"));
    assert_eq!(texts[0], "Annual Report");
    assert!(blocks.iter().any(|b| b.text == "Cell text" && b.is_in_table));

    let options = OutlinerOptions::new().with_extract_options(no_language());
    let outliner = Outliner::with_options(Arc::new(Fixed(Label::H1)), Vocabulary::default(), options);
    let report = outliner.process_batch(&[path]);
    assert!(report.is_complete());
    assert_eq!(report.succeeded[0].result.outline.len(), 4);
}
