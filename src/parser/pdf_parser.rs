//! PDF document decoder using lopdf.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use rayon::prelude::*;

use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::model::PageContent;

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::layout::LayoutAnalyzer;
use super::options::ParseOptions;
use super::source::PageSource;

/// PDF decoder producing [`PageContent`] per page.
pub struct PdfParser {
    backend: LopdfBackend,
    pages: BTreeMap<u32, PageId>,
    options: ParseOptions,
}

impl PdfParser {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        detect_format_from_path(path)?;
        let backend = LopdfBackend::load_file(path)?;
        Ok(Self::with_backend(backend, options))
    }

    /// Decode a PDF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        detect_format_from_bytes(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        Ok(Self::with_backend(backend, options))
    }

    /// Decode a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    fn with_backend(backend: LopdfBackend, options: ParseOptions) -> Self {
        let pages = backend.pages();
        Self {
            backend,
            pages,
            options,
        }
    }

    /// PDF version string.
    pub fn version(&self) -> String {
        self.backend.version()
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }
}

impl PageSource for PdfParser {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.pages
            .keys()
            .copied()
            .filter(|n| self.options.pages.includes(*n))
            .collect()
    }

    fn page(&self, number: u32) -> Result<PageContent> {
        let page_id = self
            .pages
            .get(&number)
            .ok_or(Error::PageOutOfRange(number, self.page_count()))?;
        LayoutAnalyzer::new(&self.backend).analyze_page(number, *page_id)
    }

    fn decode_all(&self) -> Vec<(u32, Result<PageContent>)> {
        let numbers = self.page_numbers();
        if self.options.parallel {
            numbers
                .into_par_iter()
                .map(|n| (n, self.page(n)))
                .collect()
        } else {
            numbers.into_iter().map(|n| (n, self.page(n))).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_non_pdf() {
        let result = PdfParser::from_bytes(b"PK\x03\x04 not a pdf");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_open_missing_file() {
        let result = PdfParser::open("/nonexistent/dir/file.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
