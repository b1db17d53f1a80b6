//! PDF decoding: content-stream interpretation into positioned spans,
//! lines, blocks and painted drawings.

pub mod backend;
mod layout;
mod options;
mod pdf_parser;
mod source;

pub use backend::{LopdfBackend, PdfBackend};
pub use layout::{LayoutAnalyzer, Matrix};
pub use options::{PageSelection, ParseOptions};
pub use pdf_parser::PdfParser;
pub use source::{InMemoryPages, PageSource};
