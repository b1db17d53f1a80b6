//! Layout analysis for PDF pages.
//!
//! Interprets a page's content stream into positioned text spans and painted
//! vector primitives, then groups spans into lines and lines into blocks.
//! All coordinates produced here use a top-left origin.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::Result;
use crate::model::{BBox, PageContent, RawBlock, RawLine, RawSpan, SpanFlags};

use super::backend::{BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue};

/// Approximate glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// TJ adjustments beyond this (thousandths of an em) read as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Ascender / descender share of the font size used for span boxes.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// A 2D affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Length of the transformed unit x vector.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn from_operands(op: &ContentOp) -> Option<Matrix> {
        Some(Matrix::new(
            op.number(0)?,
            op.number(1)?,
            op.number(2)?,
            op.number(3)?,
            op.number(4)?,
            op.number(5)?,
        ))
    }
}

/// A shown string with its position on the page.
#[derive(Debug, Clone)]
struct PlacedSpan {
    text: String,
    /// Left edge
    x: f32,
    /// Baseline, measured from the top of the page
    baseline: f32,
    width: f32,
    font_size: f32,
    font_name: String,
    flags: SpanFlags,
}

impl PlacedSpan {
    fn right(&self) -> f32 {
        self.x + self.width
    }

    fn same_style(&self, other: &PlacedSpan) -> bool {
        self.font_name == other.font_name
            && self.flags == other.flags
            && (self.font_size - other.font_size).abs() < 0.1
    }

    fn into_raw(self) -> RawSpan {
        let bbox = BBox::new(
            self.x,
            self.baseline - self.font_size * ASCENT,
            self.right(),
            self.baseline + self.font_size * DESCENT,
        );
        RawSpan::new(self.text, self.font_name, self.font_size, self.flags, bbox)
    }
}

/// Spans sharing one baseline.
#[derive(Debug, Clone)]
struct LineBuf {
    spans: Vec<PlacedSpan>,
    baseline: f32,
    x: f32,
    font_size: f32,
}

impl LineBuf {
    fn from_spans(mut spans: Vec<PlacedSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        let total: usize = spans.iter().map(|s| s.text.len()).sum();
        let font_size = if total > 0 {
            spans
                .iter()
                .map(|s| s.font_size * s.text.len() as f32)
                .sum::<f32>()
                / total as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(0.0)
        };
        let baseline = spans.first().map(|s| s.baseline).unwrap_or(0.0);
        let x = spans.first().map(|s| s.x).unwrap_or(0.0);

        Self {
            spans: merge_adjacent(spans),
            baseline,
            x,
            font_size,
        }
    }
}

/// Join neighboring same-style spans, inserting a space where the gap
/// between them is wider than a fraction of a glyph.
fn merge_adjacent(spans: Vec<PlacedSpan>) -> Vec<PlacedSpan> {
    let mut merged: Vec<PlacedSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        let Some(prev) = merged.last_mut() else {
            merged.push(span);
            continue;
        };
        if !prev.same_style(&span) {
            merged.push(span);
            continue;
        }

        let chars = span.text.chars().count().max(1) as f32;
        let char_width = if span.width > 0.0 {
            span.width / chars
        } else {
            span.font_size * APPROX_CHAR_WIDTH_RATIO
        };
        let gap = span.x - prev.right();
        if gap > char_width * 2.5 {
            merged.push(span);
            continue;
        }

        let needs_space = gap > char_width * 0.2
            && !prev.text.ends_with(char::is_whitespace)
            && !span.text.starts_with(char::is_whitespace)
            && !(prev.text.chars().last().is_some_and(is_spaceless_script_char)
                && span.text.chars().next().is_some_and(is_spaceless_script_char));
        if needs_space {
            prev.text.push(' ');
        }
        prev.text.push_str(&span.text);
        prev.width = span.right().max(prev.right()) - prev.x;
    }
    merged
}

/// A vertical text column.
#[derive(Debug, Clone)]
struct Column {
    left: f32,
    right: f32,
}

impl Column {
    fn contains_span(&self, span: &PlacedSpan) -> bool {
        let center = span.x + span.width / 2.0;
        (span.x >= self.left && span.x <= self.right)
            || (center >= self.left && center <= self.right)
    }
}

/// Mutable interpreter state for one content stream.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    line_width: f32,
}

/// Collects a page's spans and drawings while walking its operators.
struct PageInterpreter<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    page_height: f32,
    fonts: HashMap<Vec<u8>, BackendFontInfo>,

    state: GraphicsState,
    saved: Vec<GraphicsState>,

    text_matrix: Matrix,
    line_matrix: Matrix,
    font_key: Vec<u8>,
    font_size: f32,
    leading: f32,

    subpath: Option<BBox>,
    path: Vec<BBox>,

    spans: Vec<PlacedSpan>,
    drawings: Vec<BBox>,
}

impl<'a> PageInterpreter<'a> {
    fn new(backend: &'a dyn PdfBackend, page: PageId, page_height: f32) -> Result<Self> {
        let fonts = backend
            .page_fonts(page)?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        Ok(Self {
            backend,
            page,
            page_height,
            fonts,
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
                line_width: 1.0,
            },
            saved: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_key: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            subpath: None,
            path: Vec::new(),
            spans: Vec::new(),
            drawings: Vec::new(),
        })
    }

    /// Device point in top-left coordinates.
    fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        let (dx, dy) = self.state.ctm.apply(x, y);
        (dx, self.page_height - dy)
    }

    fn run(&mut self, ops: &[ContentOp]) {
        for op in ops {
            self.step(op);
        }
    }

    fn step(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(op) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }

            "w" => self.state.line_width = op.number(0).unwrap_or(1.0),

            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.font_key = name.clone();
                }
                self.font_size = op.number(1).unwrap_or(12.0);
            }
            "TL" => self.leading = op.number(0).unwrap_or(0.0),
            "Td" => self.move_line(op.number(0).unwrap_or(0.0), op.number(1).unwrap_or(0.0)),
            "TD" => {
                let ty = op.number(1).unwrap_or(0.0);
                self.leading = -ty;
                self.move_line(op.number(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(op) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    let text = self.decode(bytes);
                    self.show(text, 0.0);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    let text = self.decode(bytes);
                    self.show(text, 0.0);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    let text = self.decode(bytes);
                    self.show(text, 0.0);
                }
            }

            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) =
                    (op.number(0), op.number(1), op.number(2), op.number(3))
                {
                    self.close_subpath();
                    let (ax, ay) = self.to_page(x, y);
                    let (bx, by) = self.to_page(x + w, y + h);
                    self.path.push(BBox::from_corners(ax, ay, bx, by));
                }
            }
            "m" => {
                if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                    self.close_subpath();
                    self.extend_subpath(x, y);
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                    self.extend_subpath(x, y);
                }
            }
            "c" => {
                if let (Some(x), Some(y)) = (op.number(4), op.number(5)) {
                    self.extend_subpath(x, y);
                }
            }
            "v" | "y" => {
                if let (Some(x), Some(y)) = (op.number(2), op.number(3)) {
                    self.extend_subpath(x, y);
                }
            }
            "S" | "s" | "B" | "B*" | "b" | "b*" => self.paint(true),
            "f" | "F" | "f*" => self.paint(false),
            "n" => {
                self.subpath = None;
                self.path.clear();
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.backend.decode_text(self.page, &self.font_key, bytes)
    }

    fn show_array(&mut self, items: &[PdfValue]) {
        let mut combined = String::new();
        let mut advance = 0.0;
        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let text = self.decode(bytes);
                    advance += text.chars().count() as f32 * APPROX_CHAR_WIDTH_RATIO;
                    combined.push_str(&text);
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = -super::backend::get_number_from_value(item).unwrap_or(0.0);
                    advance += adjustment / 1000.0;
                    let ends_open = combined
                        .chars()
                        .last()
                        .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c));
                    if adjustment > TJ_SPACE_THRESHOLD && ends_open {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }
        let estimated = combined.chars().count() as f32 * APPROX_CHAR_WIDTH_RATIO;
        self.show(combined, advance - estimated);
    }

    /// Record a span at the current text position and advance past it.
    /// `extra_advance` is in ems, on top of the estimated glyph widths.
    fn show(&mut self, text: String, extra_advance: f32) {
        let glyphs = text.chars().count() as f32;
        let advance_ems = glyphs * APPROX_CHAR_WIDTH_RATIO + extra_advance;

        if !text.trim().is_empty() {
            let rendering = self.text_matrix.then(&self.state.ctm);
            let (x, y) = rendering.apply(0.0, 0.0);
            let size = self.font_size * rendering.vertical_scale();
            let width = glyphs * APPROX_CHAR_WIDTH_RATIO * self.font_size
                * rendering.horizontal_scale();

            let (font_name, flags) = match self.fonts.get(&self.font_key) {
                Some(info) => (info.base_font.clone(), style_flags(info)),
                None => (
                    String::from_utf8_lossy(&self.font_key).to_string(),
                    SpanFlags::empty(),
                ),
            };

            self.spans.push(PlacedSpan {
                text,
                x,
                baseline: self.page_height - y,
                width: width.max(0.0),
                font_size: size,
                font_name,
                flags,
            });
        }

        let tx = advance_ems * self.font_size;
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    fn extend_subpath(&mut self, x: f32, y: f32) {
        let (px, py) = self.to_page(x, y);
        let point = BBox::new(px, py, px, py);
        self.subpath = Some(match self.subpath {
            Some(current) => current.union(&point),
            None => point,
        });
    }

    fn close_subpath(&mut self) {
        if let Some(bbox) = self.subpath.take() {
            self.path.push(bbox);
        }
    }

    /// Emit the current path. Stroked outlines grow by half the line width
    /// on every side, so a stroked segment becomes a thin rectangle.
    fn paint(&mut self, stroke: bool) {
        self.close_subpath();
        let half = if stroke {
            self.state.line_width * self.state.ctm.horizontal_scale() / 2.0
        } else {
            0.0
        };
        for bbox in self.path.drain(..) {
            self.drawings.push(BBox::new(
                bbox.x0 - half,
                bbox.y0 - half,
                bbox.x1 + half,
                bbox.y1 + half,
            ));
        }
    }
}

fn style_flags(info: &BackendFontInfo) -> SpanFlags {
    let mut flags = SpanFlags::empty();
    if info.is_bold() {
        flags = flags.with(SpanFlags::BOLD);
    }
    if info.is_italic() {
        flags = flags.with(SpanFlags::ITALIC);
    }
    flags
}

/// Layout analyzer turning one PDF page into [`PageContent`].
pub struct LayoutAnalyzer<'a> {
    backend: &'a dyn PdfBackend,
}

impl<'a> LayoutAnalyzer<'a> {
    pub fn new(backend: &'a dyn PdfBackend) -> Self {
        Self { backend }
    }

    /// Decode a page: text blocks plus painted drawings.
    pub fn analyze_page(&self, number: u32, page: PageId) -> Result<PageContent> {
        let (width, height) = self.backend.page_dimensions(page);
        let data = self.backend.page_content(page)?;
        let ops = self.backend.decode_content(&data)?;

        let mut interpreter = PageInterpreter::new(self.backend, page, height)?;
        interpreter.run(&ops);

        log::trace!(
            "page {}: {} spans, {} drawings",
            number,
            interpreter.spans.len(),
            interpreter.drawings.len()
        );

        let lines = group_spans_into_lines(interpreter.spans, width);
        let blocks = group_lines_into_blocks(lines);

        Ok(PageContent::new(number, width, height)
            .with_blocks(blocks)
            .with_drawings(interpreter.drawings))
    }
}

/// Find a vertical gutter splitting the spans into two columns.
///
/// Only the part of the text extent inside `[0, page_width]` is scanned;
/// spans placed off the page never widen the occupancy grid.
fn detect_columns(spans: &[PlacedSpan], page_width: f32) -> Vec<Column> {
    let min_x = spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
    let max_x = spans.iter().map(|s| s.right()).fold(f32::NEG_INFINITY, f32::max);
    let single = vec![Column {
        left: min_x - 10.0,
        right: max_x + 10.0,
    }];

    if !(page_width.is_finite() && page_width > 0.0) {
        return single;
    }
    let (min_x, max_x) = (min_x.max(0.0), max_x.min(page_width));
    let extent = max_x - min_x;
    if !extent.is_finite() || extent < 250.0 {
        return single;
    }

    const SLICE: f32 = 3.0;
    let slices = (extent / SLICE) as usize + 1;
    let mut occupancy = vec![0usize; slices];
    for span in spans {
        let start = ((span.x - min_x) / SLICE) as usize;
        let end = (((span.right() - min_x) / SLICE) as usize).min(slices - 1);
        for slot in occupancy.iter_mut().take(end + 1).skip(start) {
            *slot += 1;
        }
    }

    // Widest empty run inside the middle 70% of the text extent.
    let (lo, hi) = (slices * 15 / 100, slices * 85 / 100);
    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;
    for i in lo..=hi.min(slices - 1) {
        let empty = occupancy[i] == 0 && i < hi;
        match (empty, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                let len = i - start;
                if best.map_or(true, |(_, l)| len > l) {
                    best = Some((start, len));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    let Some((start, len)) = best else {
        return single;
    };
    if (len as f32) * SLICE < 12.0 {
        return single;
    }

    let gutter = min_x + (start as f32 + len as f32 / 2.0) * SLICE;
    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        return single;
    }

    let left = spans.iter().filter(|s| s.x + s.width / 2.0 < gutter).count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        return single;
    }

    log::debug!("two-column layout, gutter at x={:.1}", gutter);
    vec![
        Column {
            left: single[0].left,
            right: gutter,
        },
        Column {
            left: gutter,
            right: single[0].right,
        },
    ]
}

/// Group spans into lines by baseline, keeping columns apart.
fn group_spans_into_lines(spans: Vec<PlacedSpan>, page_width: f32) -> Vec<LineBuf> {
    if spans.is_empty() {
        return Vec::new();
    }

    let columns = detect_columns(&spans, page_width);
    if columns.len() <= 1 {
        return group_single_column(spans);
    }

    let mut per_column: Vec<Vec<PlacedSpan>> = vec![Vec::new(); columns.len()];
    for span in spans {
        let idx = columns
            .iter()
            .position(|c| c.contains_span(&span))
            .unwrap_or(0);
        per_column[idx].push(span);
    }

    // Column by column so each column's lines stay contiguous.
    per_column
        .into_iter()
        .flat_map(group_single_column)
        .collect()
}

fn group_single_column(mut spans: Vec<PlacedSpan>) -> Vec<LineBuf> {
    spans.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<PlacedSpan> = Vec::new();
    let mut current_baseline: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_baseline {
            Some(y) if (span.baseline - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(LineBuf::from_spans(std::mem::take(&mut current)));
                }
                current_baseline = Some(span.baseline);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(LineBuf::from_spans(current));
    }
    lines
}

fn average_line_spacing(lines: &[LineBuf]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[1].baseline - w[0].baseline).abs())
        .filter(|s| *s > 0.1)
        .collect();
    if spacings.is_empty() {
        12.0
    } else {
        spacings.iter().sum::<f32>() / spacings.len() as f32
    }
}

fn should_break_block(prev: &LineBuf, curr: &LineBuf, avg_spacing: f32) -> bool {
    let spacing = curr.baseline - prev.baseline;
    // Going back up the page means a new column or region
    spacing < 0.0
        || spacing > avg_spacing * 1.5
        || (prev.font_size - curr.font_size).abs() > 1.0
        || (prev.x - curr.x).abs() > 20.0
}

/// Group consecutive lines into blocks on spacing, size and indent changes.
fn group_lines_into_blocks(lines: Vec<LineBuf>) -> Vec<RawBlock> {
    let avg_spacing = average_line_spacing(&lines);
    let mut groups: Vec<Vec<LineBuf>> = Vec::new();

    for line in lines {
        match groups.last_mut() {
            Some(group)
                if group
                    .last()
                    .is_some_and(|prev| !should_break_block(prev, &line, avg_spacing)) =>
            {
                group.push(line)
            }
            _ => groups.push(vec![line]),
        }
    }

    groups.into_iter().filter_map(into_raw_block).collect()
}

fn into_raw_block(lines: Vec<LineBuf>) -> Option<RawBlock> {
    let raw_lines: Vec<RawLine> = lines
        .into_iter()
        .map(|l| RawLine::new(l.spans.into_iter().map(PlacedSpan::into_raw).collect()))
        .filter(|l| !l.spans.is_empty())
        .collect();

    let bbox = raw_lines
        .iter()
        .flat_map(|l| l.spans.iter())
        .map(|s| s.bbox)
        .reduce(|a, b| a.union(&b))?;
    Some(RawBlock::new(bbox, raw_lines))
}

/// Scripts written without spaces between words (Chinese, Japanese).
fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2EBEF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x3000..=0x303F)
}
