//! Block extraction: decoded pages to ordered, enriched [`TextBlock`]s.

mod language;
mod table;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::model::{BBox, PageContent, RawBlock, TextBlock};
use crate::parser::PageSource;

pub use language::{LanguageDetector, NoLanguage, WhatlangDetector};
pub use table::{classify_ruling, infer_table_region, is_in_table, Ruling};

/// Gap recorded when a block has no neighbor on the same page.
pub const PAGE_BOUNDARY_GAP: f32 = 100.0;

/// Options for block extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Run language identification on every block
    pub detect_language: bool,

    /// Apply Unicode NFC normalization to block text
    pub normalize_unicode: bool,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language_detection(mut self, enabled: bool) -> Self {
        self.detect_language = enabled;
        self
    }

    pub fn with_unicode_normalization(mut self, enabled: bool) -> Self {
        self.normalize_unicode = enabled;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            detect_language: true,
            normalize_unicode: true,
        }
    }
}

/// Turns decoded pages into reading-ordered text blocks.
#[derive(Clone)]
pub struct BlockExtractor {
    options: ExtractOptions,
    detector: Arc<dyn LanguageDetector>,
}

impl Default for BlockExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl BlockExtractor {
    /// Create an extractor; language detection uses `whatlang` when enabled.
    pub fn new(options: ExtractOptions) -> Self {
        let detector: Arc<dyn LanguageDetector> = if options.detect_language {
            Arc::new(WhatlangDetector)
        } else {
            Arc::new(NoLanguage)
        };
        Self { options, detector }
    }

    /// Replace the language detector.
    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn detector(&self) -> &dyn LanguageDetector {
        self.detector.as_ref()
    }

    /// Extract every block of a document, in reading order, with spacing.
    ///
    /// Pages that fail to decode are skipped. A page whose drawings cannot be
    /// interpreted fails the whole document.
    pub fn extract(&self, source: &dyn PageSource) -> Result<Vec<TextBlock>> {
        let mut blocks = Vec::new();
        for (number, decoded) in source.decode_all() {
            match decoded {
                Ok(page) => blocks.extend(self.extract_page(&page)?),
                Err(e) => log::warn!("Skipping page {}: {}", number, e),
            }
        }
        assign_spacing(&mut blocks);
        log::debug!("extracted {} blocks", blocks.len());
        Ok(blocks)
    }

    /// Extract one page's blocks sorted by (top, left), without spacing.
    pub fn extract_page(&self, page: &PageContent) -> Result<Vec<TextBlock>> {
        let region = infer_table_region(page.number, &page.drawings)?;

        let mut raw: Vec<&RawBlock> = page.blocks.iter().collect();
        raw.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        Ok(raw
            .into_iter()
            .filter_map(|b| self.build_block(b, page, region.as_ref()))
            .collect())
    }

    fn build_block(
        &self,
        raw: &RawBlock,
        page: &PageContent,
        region: Option<&BBox>,
    ) -> Option<TextBlock> {
        let text = normalize_text(
            raw.spans().map(|s| s.text.as_str()),
            self.options.normalize_unicode,
        );
        if text.is_empty() {
            return None;
        }

        let spans: Vec<_> = raw.spans().collect();
        let font_size = mode(spans.iter().map(|s| s.font_size), |v| v.to_bits()).unwrap_or(0.0);
        let font_name = mode(spans.iter().map(|s| s.font_name.as_str()), |v| *v)
            .map(str::to_string)
            .unwrap_or_default();
        let bold = spans.iter().filter(|s| s.flags.is_bold()).count();
        let italic = spans.iter().filter(|s| s.flags.is_italic()).count();

        let (center_x, _) = raw.bbox.center();
        let mut block = TextBlock::new(text, raw.bbox, page.number);
        block.page_width = page.width;
        block.page_height = page.height;
        block.font_size = font_size;
        if !font_name.is_empty() {
            block.font_name = font_name;
        }
        block.is_bold = bold * 2 > spans.len();
        block.is_italic = italic * 2 > spans.len();
        block.language = Some(self.detector.language_of(&block.text));
        block.line_count = raw.lines.len().max(1) as u32;
        block.is_in_table = is_in_table(region, &raw.bbox);
        block.column = if center_x < page.width / 2.0 { 1 } else { 2 };
        Some(block)
    }
}

/// Join span texts with spaces, fold typographic apostrophes, collapse
/// whitespace and trim.
pub fn normalize_text<'a>(parts: impl IntoIterator<Item = &'a str>, nfc: bool) -> String {
    let joined = parts.into_iter().collect::<Vec<_>>().join(" ");
    let folded = joined.replace('\u{2019}', "'");
    let folded: String = if nfc { folded.nfc().collect() } else { folded };
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Most frequent value; ties go to the value seen first.
fn mode<T: Copy, K: Eq + Hash>(values: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Option<T> {
    let mut counts: HashMap<K, (usize, usize, T)> = HashMap::new();
    for (order, value) in values.enumerate() {
        counts
            .entry(key(&value))
            .and_modify(|e| e.0 += 1)
            .or_insert((1, order, value));
    }
    counts
        .into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, v)| v)
}

/// Fill in the vertical gaps between consecutive same-page blocks.
///
/// `vertical_space_after` of a block is the next block's top minus its own
/// bottom; `vertical_space_before` mirrors that. Blocks without a same-page
/// neighbor on a side get [`PAGE_BOUNDARY_GAP`].
pub fn assign_spacing(blocks: &mut [TextBlock]) {
    let n = blocks.len();
    for i in 0..n {
        let after = match blocks.get(i + 1) {
            Some(next) if next.page_number == blocks[i].page_number => {
                next.bbox.y0 - blocks[i].bbox.y1
            }
            _ => PAGE_BOUNDARY_GAP,
        };
        let before = match i.checked_sub(1).map(|p| &blocks[p]) {
            Some(prev) if prev.page_number == blocks[i].page_number => {
                blocks[i].bbox.y0 - prev.bbox.y1
            }
            _ => PAGE_BOUNDARY_GAP,
        };
        blocks[i].vertical_space_after = after;
        blocks[i].vertical_space_before = before;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawLine, RawSpan, SpanFlags};
    use crate::parser::InMemoryPages;

    fn span(text: &str, size: f32, flags: u32) -> RawSpan {
        RawSpan::new(text, "Helvetica", size, SpanFlags(flags), BBox::default())
    }

    fn raw(bbox: BBox, spans: Vec<RawSpan>) -> RawBlock {
        RawBlock::new(bbox, vec![RawLine::new(spans)])
    }

    fn extractor() -> BlockExtractor {
        BlockExtractor::new(ExtractOptions::new().with_language_detection(false))
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text(["  It\u{2019}s ", "a\n\ttest  "], true),
            "It's a test"
        );
        assert_eq!(normalize_text(["", "   "], true), "");
        // e + combining acute composes under NFC
        assert_eq!(normalize_text(["e\u{0301}"], true), "\u{00e9}");
    }

    #[test]
    fn test_mode_prefers_first_on_tie() {
        assert_eq!(mode([10.0f32, 12.0, 12.0, 10.0].into_iter(), |v| v.to_bits()), Some(10.0));
        assert_eq!(mode([1, 2, 2].into_iter(), |v| *v), Some(2));
        assert_eq!(mode(std::iter::empty::<u8>(), |v| *v), None);
    }

    #[test]
    fn test_block_style_majority_and_mode() {
        let page = PageContent::letter(1).with_blocks(vec![raw(
            BBox::new(50.0, 100.0, 200.0, 120.0),
            vec![
                span("Big", 18.0, SpanFlags::BOLD),
                span("Bold", 18.0, SpanFlags::BOLD),
                span("tail", 10.0, SpanFlags::ITALIC),
            ],
        )]);
        let blocks = extractor().extract_page(&page).unwrap();
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.text, "Big Bold tail");
        assert_eq!(b.font_size, 18.0);
        assert!(b.is_bold);
        assert!(!b.is_italic);
        assert_eq!(b.column, 1);
        assert_eq!(b.language.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_bold_needs_strict_majority() {
        let page = PageContent::letter(1).with_blocks(vec![raw(
            BBox::new(50.0, 100.0, 200.0, 120.0),
            vec![span("a", 10.0, SpanFlags::BOLD), span("b", 10.0, 0)],
        )]);
        let blocks = extractor().extract_page(&page).unwrap();
        assert!(!blocks[0].is_bold);
    }

    #[test]
    fn test_empty_blocks_skipped_and_sorted() {
        let page = PageContent::letter(1).with_blocks(vec![
            raw(BBox::new(300.0, 50.0, 400.0, 60.0), vec![span("right", 10.0, 0)]),
            raw(BBox::new(50.0, 200.0, 100.0, 210.0), vec![span("   ", 10.0, 0)]),
            raw(BBox::new(50.0, 50.0, 100.0, 60.0), vec![span("left", 10.0, 0)]),
        ]);
        let blocks = extractor().extract_page(&page).unwrap();
        let texts: Vec<_> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["left", "right"]);
        assert_eq!(blocks[1].column, 2);
    }

    #[test]
    fn test_spacing_within_and_across_pages() {
        let page1 = PageContent::letter(1).with_blocks(vec![
            raw(BBox::new(50.0, 100.0, 200.0, 120.0), vec![span("one", 10.0, 0)]),
            raw(BBox::new(50.0, 150.0, 200.0, 170.0), vec![span("two", 10.0, 0)]),
        ]);
        let page2 = PageContent::letter(2).with_blocks(vec![raw(
            BBox::new(50.0, 80.0, 200.0, 90.0),
            vec![span("three", 10.0, 0)],
        )]);
        let source = InMemoryPages::new(vec![page1, page2]);
        let blocks = extractor().extract(&source).unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].vertical_space_before, PAGE_BOUNDARY_GAP);
        assert_eq!(blocks[0].vertical_space_after, 30.0);
        assert_eq!(blocks[1].vertical_space_before, 30.0);
        assert_eq!(blocks[1].vertical_space_after, PAGE_BOUNDARY_GAP);
        assert_eq!(blocks[2].vertical_space_before, PAGE_BOUNDARY_GAP);
        assert_eq!(blocks[2].vertical_space_after, PAGE_BOUNDARY_GAP);
    }

    #[test]
    fn test_table_flag_from_page_drawings() {
        let page = PageContent::letter(1)
            .with_drawings(vec![
                BBox::new(100.0, 200.0, 400.0, 201.0),
                BBox::new(100.0, 300.0, 400.0, 301.0),
                BBox::new(100.0, 200.0, 101.0, 301.0),
                BBox::new(399.0, 200.0, 400.0, 301.0),
            ])
            .with_blocks(vec![
                raw(BBox::new(120.0, 240.0, 200.0, 260.0), vec![span("cell", 10.0, 0)]),
                raw(BBox::new(120.0, 500.0, 200.0, 520.0), vec![span("body", 10.0, 0)]),
            ]);
        let blocks = extractor().extract_page(&page).unwrap();
        assert!(blocks[0].is_in_table);
        assert!(!blocks[1].is_in_table);
    }
}
