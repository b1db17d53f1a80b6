//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from content-stream interpretation.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Default page size (US Letter) when no MediaBox can be resolved.
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// FontDescriptor flag bits (PDF 32000-1, table 123).
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// FontDescriptor `/Flags`, when the font declares a descriptor.
    pub descriptor_flags: Option<i64>,
}

impl BackendFontInfo {
    /// Bold according to the descriptor, else to the base-font name.
    pub fn is_bold(&self) -> bool {
        match self.descriptor_flags {
            Some(flags) if flags & DESCRIPTOR_FORCE_BOLD != 0 => true,
            _ => {
                let lower = self.base_font.to_lowercase();
                ["bold", "black", "heavy", "semibold"]
                    .iter()
                    .any(|k| lower.contains(k))
            }
        }
    }

    /// Italic according to the descriptor, else to the base-font name.
    pub fn is_italic(&self) -> bool {
        match self.descriptor_flags {
            Some(flags) if flags & DESCRIPTOR_ITALIC != 0 => true,
            _ => {
                let lower = self.base_font.to_lowercase();
                lower.contains("italic") || lower.contains("oblique")
            }
        }
    }
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Numeric operand at `idx`, if present and numeric.
    pub fn number(&self, idx: usize) -> Option<f32> {
        self.operands.get(idx).and_then(get_number_from_value)
    }
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font info, content stream
/// decoding, and text decoding without exposing any concrete PDF library types.
pub trait PdfBackend: Sync {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return `(width, height)` of a page in points.
    fn page_dimensions(&self, page: PageId) -> (f32, f32);

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Self::checked(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::checked(doc)
    }

    fn checked(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc })
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).and_then(|o| o.as_dict().ok())
    }

    /// Walk up the page tree to find an inherited MediaBox.
    fn find_media_box(&self, dict: &Dictionary, depth: usize) -> Option<[f32; 4]> {
        if depth > 32 {
            return None;
        }
        if let Some(arr) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
        {
            let nums: Vec<f32> = arr
                .iter()
                .filter_map(|o| self.resolve(o).and_then(object_number))
                .collect();
            if nums.len() >= 4 {
                return Some([nums[0], nums[1], nums[2], nums[3]]);
            }
        }

        let parent = dict.get(b"Parent").ok().and_then(|o| self.resolve_dict(o))?;
        self.find_media_box(parent, depth + 1)
    }

    fn descriptor_flags(&self, font: &Dictionary) -> Option<i64> {
        let descriptor = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve_dict(o))?;
        descriptor
            .get(b"Flags")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_i64().ok())
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_dimensions(&self, page: PageId) -> (f32, f32) {
        let media_box = self
            .doc
            .get_dictionary(page)
            .ok()
            .and_then(|dict| self.find_media_box(dict, 0));

        match media_box {
            Some([llx, lly, urx, ury]) if urx - llx > 0.0 && ury - lly > 0.0 => {
                (urx - llx, ury - lly)
            }
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut result = Vec::with_capacity(lopdf_fonts.len());
        for (name, font_dict) in &lopdf_fonts {
            let base_font = font_dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            result.push(BackendFontInfo {
                name: name.clone(),
                base_font,
                descriptor_flags: self.descriptor_flags(font_dict),
            });
        }
        Ok(result)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        self.doc
            .get_page_content(page)
            .map_err(|e| Error::PdfParse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(lopdf_fonts) = self.doc.get_page_fonts(page) {
            if let Some(font_dict) = lopdf_fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }
}

fn object_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(base: &str, flags: Option<i64>) -> BackendFontInfo {
        BackendFontInfo {
            name: b"F1".to_vec(),
            base_font: base.to_string(),
            descriptor_flags: flags,
        }
    }

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_style_from_descriptor_flags() {
        assert!(font("ABCDEF+Minion", Some(DESCRIPTOR_FORCE_BOLD)).is_bold());
        assert!(font("ABCDEF+Minion", Some(DESCRIPTOR_ITALIC)).is_italic());
        assert!(!font("ABCDEF+Minion", Some(0)).is_bold());
    }

    #[test]
    fn test_style_from_font_name() {
        assert!(font("Helvetica-Bold", None).is_bold());
        assert!(font("Arial-BlackItalic", None).is_bold());
        assert!(font("Times-Oblique", None).is_italic());
        assert!(!font("Times-Roman", None).is_italic());
    }

    #[test]
    fn test_content_op_number() {
        let op = ContentOp {
            operator: "re".to_string(),
            operands: vec![PdfValue::Integer(42), PdfValue::Real(1.5), PdfValue::Other],
        };
        assert_eq!(op.number(0), Some(42.0));
        assert_eq!(op.number(1), Some(1.5));
        assert_eq!(op.number(2), None);
        assert_eq!(op.number(9), None);
    }
}
