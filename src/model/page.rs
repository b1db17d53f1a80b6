//! Decoded page content handed from the PDF decoder to the block extractor.

use super::BBox;

/// Style bit-flags carried by each decoded span.
///
/// The bit layout follows the common PDF text-extraction convention:
/// bit 1 marks italic glyphs and bit 4 marks bold glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanFlags(pub u32);

impl SpanFlags {
    pub const SUPERSCRIPT: u32 = 1 << 0;
    pub const ITALIC: u32 = 1 << 1;
    pub const SERIFED: u32 = 1 << 2;
    pub const MONOSPACED: u32 = 1 << 3;
    pub const BOLD: u32 = 1 << 4;

    pub fn empty() -> Self {
        SpanFlags(0)
    }

    pub fn with(self, bit: u32) -> Self {
        SpanFlags(self.0 | bit)
    }

    pub fn is_bold(&self) -> bool {
        self.0 & Self::BOLD != 0
    }

    pub fn is_italic(&self) -> bool {
        self.0 & Self::ITALIC != 0
    }
}

/// The smallest decoded text run sharing one font, size and style.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    pub flags: SpanFlags,
    pub bbox: BBox,
}

impl RawSpan {
    pub fn new(
        text: impl Into<String>,
        font_name: impl Into<String>,
        font_size: f32,
        flags: SpanFlags,
        bbox: BBox,
    ) -> Self {
        Self {
            text: text.into(),
            font_name: font_name.into(),
            font_size,
            flags,
            bbox,
        }
    }
}

/// A visual line of spans.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLine {
    pub spans: Vec<RawSpan>,
}

impl RawLine {
    pub fn new(spans: Vec<RawSpan>) -> Self {
        Self { spans }
    }
}

/// A decoder block: lines that belong to one paragraph-like region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawBlock {
    pub bbox: BBox,
    pub lines: Vec<RawLine>,
}

impl RawBlock {
    pub fn new(bbox: BBox, lines: Vec<RawLine>) -> Self {
        Self { bbox, lines }
    }

    /// Iterate over every span of every line in order.
    pub fn spans(&self) -> impl Iterator<Item = &RawSpan> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }
}

/// Everything the decoder yields for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub number: u32,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Text blocks in decoder order
    pub blocks: Vec<RawBlock>,
    /// Bounding boxes of painted vector primitives
    pub drawings: Vec<BBox>,
}

impl PageContent {
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
            drawings: Vec::new(),
        }
    }

    /// Create an empty US Letter page (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    pub fn with_blocks(mut self, blocks: Vec<RawBlock>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_drawings(mut self, drawings: Vec<BBox>) -> Self {
        self.drawings = drawings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_flags_bits() {
        let flags = SpanFlags::empty().with(SpanFlags::BOLD);
        assert!(flags.is_bold());
        assert!(!flags.is_italic());
        assert_eq!(SpanFlags(2).is_italic(), true);
        assert_eq!(SpanFlags(16).is_bold(), true);
    }

    #[test]
    fn test_block_spans_flatten_lines() {
        let span = |t: &str| RawSpan::new(t, "Helvetica", 10.0, SpanFlags::empty(), BBox::default());
        let block = RawBlock::new(
            BBox::default(),
            vec![
                RawLine::new(vec![span("a"), span("b")]),
                RawLine::new(vec![span("c")]),
            ],
        );
        let texts: Vec<_> = block.spans().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
