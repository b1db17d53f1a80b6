//! The page-source seam between PDF decoding and block extraction.

use crate::error::{Error, Result};
use crate::model::PageContent;

/// Anything that can hand out decoded pages.
///
/// The block extractor only sees this trait, so synthetic pages can stand in
/// for a real PDF in tests and benchmarks.
pub trait PageSource {
    /// Total pages in the underlying document.
    fn page_count(&self) -> u32;

    /// Page numbers to decode, ascending.
    fn page_numbers(&self) -> Vec<u32>;

    /// Decode a single page.
    fn page(&self, number: u32) -> Result<PageContent>;

    /// Decode every selected page, keeping per-page failures separate.
    fn decode_all(&self) -> Vec<(u32, Result<PageContent>)> {
        self.page_numbers()
            .into_iter()
            .map(|n| (n, self.page(n)))
            .collect()
    }
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn page_count(&self) -> u32 {
        (**self).page_count()
    }

    fn page_numbers(&self) -> Vec<u32> {
        (**self).page_numbers()
    }

    fn page(&self, number: u32) -> Result<PageContent> {
        (**self).page(number)
    }

    fn decode_all(&self) -> Vec<(u32, Result<PageContent>)> {
        (**self).decode_all()
    }
}

/// Pages already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPages {
    pages: Vec<PageContent>,
}

impl InMemoryPages {
    pub fn new(pages: Vec<PageContent>) -> Self {
        Self { pages }
    }
}

impl From<Vec<PageContent>> for InMemoryPages {
    fn from(pages: Vec<PageContent>) -> Self {
        Self::new(pages)
    }
}

impl PageSource for InMemoryPages {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self.pages.iter().map(|p| p.number).collect();
        numbers.sort_unstable();
        numbers
    }

    fn page(&self, number: u32) -> Result<PageContent> {
        self.pages
            .iter()
            .find(|p| p.number == number)
            .cloned()
            .ok_or(Error::PageOutOfRange(number, self.page_count()))
    }
}
