//! The outline pipeline: blocks, causal classification, rules, assembly.
//!
//! # Example
//!
//! ```no_run
//! use docoutline::pipeline::Outliner;
//!
//! fn main() -> docoutline::Result<()> {
//!     let outliner = Outliner::load("model.json")?;
//!     let result = outliner.process_file("report.pdf")?;
//!     println!("{}", result.title);
//!     Ok(())
//! }
//! ```

mod batch;

pub use batch::{BatchFailure, BatchReport, DocumentInput, DocumentOutline, NamedPages};

use std::path::Path;
use std::sync::Arc;

use crate::classify::{label_from_prediction, Bundle, Classifier};
use crate::error::Result;
use crate::extract::{BlockExtractor, ExtractOptions};
use crate::features::{document_median_font_size, FeatureEngine, HeadingContext, Vocabulary};
use crate::model::{Label, OutlineResult, TextBlock};
use crate::parser::{PageSource, ParseOptions, PdfParser};
use crate::render::OutlineAssembler;
use crate::rules::RuleOverlay;

/// Options for outline inference.
#[derive(Debug, Clone)]
pub struct OutlinerOptions {
    /// PDF decoding options
    pub parse: ParseOptions,

    /// Block extraction options
    pub extract: ExtractOptions,

    /// Process batch documents in parallel
    pub parallel_batch: bool,
}

impl OutlinerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    pub fn with_parallel_batch(mut self, parallel: bool) -> Self {
        self.parallel_batch = parallel;
        self
    }

    /// Process batch documents one after another.
    pub fn sequential(mut self) -> Self {
        self.parallel_batch = false;
        self
    }
}

impl Default for OutlinerOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            extract: ExtractOptions::default(),
            parallel_batch: true,
        }
    }
}

/// One block's trip through the classifier and the rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Heading context the block was featurized with
    pub context: HeadingContext,
    /// Raw classifier output, mapped onto the taxonomy
    pub predicted: Label,
    /// Label after the rule overlay
    pub label: Label,
}

/// Infers document outlines with a shared, read-only classifier.
#[derive(Clone)]
pub struct Outliner {
    classifier: Arc<dyn Classifier>,
    vocab: Arc<Vocabulary>,
    extractor: BlockExtractor,
    engine: FeatureEngine,
    rules: RuleOverlay,
    assembler: OutlineAssembler,
    options: OutlinerOptions,
}

impl Outliner {
    /// Create an outliner around any classifier and the id maps it was
    /// trained with.
    pub fn new(classifier: Arc<dyn Classifier>, vocab: Vocabulary) -> Self {
        Self::with_options(classifier, vocab, OutlinerOptions::default())
    }

    pub fn with_options(
        classifier: Arc<dyn Classifier>,
        vocab: Vocabulary,
        options: OutlinerOptions,
    ) -> Self {
        Self {
            classifier,
            vocab: Arc::new(vocab),
            extractor: BlockExtractor::new(options.extract.clone()),
            engine: FeatureEngine::new(),
            rules: RuleOverlay::new(),
            assembler: OutlineAssembler::new(),
            options,
        }
    }

    /// Use a bundle's model and id maps.
    pub fn from_bundle(bundle: Bundle) -> Self {
        Self::from_bundle_with_options(bundle, OutlinerOptions::default())
    }

    pub fn from_bundle_with_options(bundle: Bundle, options: OutlinerOptions) -> Self {
        let vocab = bundle.vocabulary();
        Self::with_options(Arc::new(bundle), vocab, options)
    }

    /// Load and verify a bundle file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_bundle(Bundle::load(path)?))
    }

    /// Replace the block extractor, e.g. to plug in a language detector.
    pub fn with_extractor(mut self, extractor: BlockExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the rule overlay.
    pub fn with_rules(mut self, rules: RuleOverlay) -> Self {
        self.rules = rules;
        self
    }

    pub fn options(&self) -> &OutlinerOptions {
        &self.options
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn rules(&self) -> &RuleOverlay {
        &self.rules
    }

    /// Reading-ordered blocks of one document.
    pub fn extract_blocks(&self, source: &dyn PageSource) -> Result<Vec<TextBlock>> {
        self.extractor.extract(source)
    }

    /// Classify blocks left to right.
    ///
    /// Each block is featurized with the context left by the rule-corrected
    /// labels of the blocks before it, so decisions cannot be batched.
    pub fn decide(&self, blocks: &[TextBlock]) -> Result<Vec<Decision>> {
        let median = document_median_font_size(blocks);
        let mut context = HeadingContext::initial(median);
        let mut decisions = Vec::with_capacity(blocks.len());

        for (index, block) in blocks.iter().enumerate() {
            let features = self
                .engine
                .featurize(block, index, median, &self.vocab, &context);
            let predicted = label_from_prediction(self.classifier.predict(&features)?);
            let label = self.rules.correct(block, predicted);
            decisions.push(Decision {
                context,
                predicted,
                label,
            });
            context = context.advance_label(index, label, block.font_size);
        }

        Ok(decisions)
    }

    /// Final labels of every block, in reading order.
    pub fn classify(&self, blocks: &[TextBlock]) -> Result<Vec<Label>> {
        Ok(self.decide(blocks)?.into_iter().map(|d| d.label).collect())
    }

    /// Title and headings of an already extracted document.
    pub fn outline(&self, blocks: &[TextBlock]) -> Result<OutlineResult> {
        let labels = self.classify(blocks)?;
        Ok(self.assembler.assemble(blocks, &labels))
    }

    /// Extract, classify and assemble one document.
    pub fn process(&self, source: &dyn PageSource) -> Result<OutlineResult> {
        let blocks = self.extract_blocks(source)?;
        if blocks.is_empty() {
            log::info!("No text blocks found, returning empty outline");
            return Ok(OutlineResult::empty());
        }
        self.outline(&blocks)
    }

    /// Process a PDF file.
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<OutlineResult> {
        let path = path.as_ref();
        log::info!("Processing {}", path.display());
        let parser = PdfParser::open_with_options(path, self.options.parse.clone())?;
        self.process(&parser)
    }
}
