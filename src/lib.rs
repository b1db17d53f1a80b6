//! # docoutline
//!
//! Infers the outline of a PDF (title and H1-H4 headings) from page
//! geometry and typography alone.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docoutline::{outline_file, render, JsonFormat};
//!
//! fn main() -> docoutline::Result<()> {
//!     let result = outline_file("model.json", "report.pdf")?;
//!     println!("{}", render::to_json(&result, JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Decoding**: `lopdf` content streams to spans, lines, blocks and ruling
//!   boxes ([`parser`])
//! - **Extraction**: reading-ordered [`TextBlock`]s with modal typography,
//!   language and table membership ([`extract`])
//! - **Features**: a fixed, versioned feature schema with causal heading
//!   context ([`features`])
//! - **Classification**: a bundled model behind the [`Classifier`] trait,
//!   followed by the correction rules in [`rules`]
//! - **Assembly**: title and outline ([`render`])
//! - **Training**: labeled block files to a bundle ([`classify::train`],
//!   [`labeling`])

pub mod classify;
pub mod detect;
pub mod error;
pub mod extract;
pub mod features;
pub mod labeling;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod rules;

// Re-export commonly used types
pub use classify::{Bundle, Classifier, Dataset, LabeledDocument};
pub use detect::{detect_format_from_bytes, detect_format_from_path, PdfFormat};
pub use error::{Error, Result};
pub use extract::{BlockExtractor, ExtractOptions, LanguageDetector, WhatlangDetector};
pub use features::{FeatureEngine, HeadingContext, Vocabulary, FEATURE_NAMES, SCHEMA_VERSION};
pub use model::{BBox, Label, OutlineEntry, OutlineResult, TextBlock, DEFAULT_TITLE};
pub use parser::{PageSelection, PageSource, ParseOptions, PdfParser};
pub use pipeline::{BatchReport, Outliner, OutlinerOptions};
pub use render::JsonFormat;
pub use rules::RuleOverlay;

use std::path::Path;

/// Extract the reading-ordered text blocks of a PDF file.
///
/// # Example
///
/// ```no_run
/// use docoutline::extract_blocks;
///
/// let blocks = extract_blocks("document.pdf").unwrap();
/// println!("Blocks: {}", blocks.len());
/// ```
pub fn extract_blocks<P: AsRef<Path>>(path: P) -> Result<Vec<TextBlock>> {
    extract_blocks_with_options(path, ParseOptions::default(), ExtractOptions::default())
}

/// Extract blocks with custom decoding and extraction options.
///
/// # Example
///
/// ```no_run
/// use docoutline::{extract_blocks_with_options, ExtractOptions, PageSelection, ParseOptions};
///
/// let parse = ParseOptions::new().with_pages(PageSelection::Range(1..=3));
/// let extract = ExtractOptions::new().with_language_detection(false);
/// let blocks = extract_blocks_with_options("document.pdf", parse, extract).unwrap();
/// ```
pub fn extract_blocks_with_options<P: AsRef<Path>>(
    path: P,
    parse: ParseOptions,
    extract: ExtractOptions,
) -> Result<Vec<TextBlock>> {
    let parser = PdfParser::open_with_options(path, parse)?;
    BlockExtractor::new(extract).extract(&parser)
}

/// Infer the outline of a PDF file with a bundle stored on disk.
///
/// The bundle is verified before the document is opened.
pub fn outline_file<B: AsRef<Path>, P: AsRef<Path>>(bundle: B, path: P) -> Result<OutlineResult> {
    let outliner = Outliner::load(bundle)?;
    outliner.process_file(path)
}

/// Train the built-in model on a directory of labeled block files.
pub fn train_dir<P: AsRef<Path>>(dir: P) -> Result<(Dataset, Bundle)> {
    let documents = labeling::load_labeled_dir(dir)?;
    classify::train(&documents)
}
