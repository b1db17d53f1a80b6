//! Error types for docoutline library.

use std::io;
use thiserror::Error;

/// Result type alias for docoutline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, training or predicting outlines.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be decoded.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// A vector drawing primitive could not be interpreted geometrically.
    #[error("Malformed drawing primitive on page {page}: {reason}")]
    MalformedDrawing { page: u32, reason: String },

    /// JSON (de)serialization failure for blocks, bundles or outlines.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The classifier bundle could not be used.
    #[error("Invalid classifier bundle: {0}")]
    Bundle(String),

    /// The bundle was trained against a different feature list.
    #[error("Feature schema mismatch: bundle declares {found} features, expected {expected} ({detail})")]
    SchemaMismatch {
        expected: usize,
        found: usize,
        detail: String,
    },

    /// A feature vector with the wrong length reached the classifier.
    #[error("Feature vector has {found} values, expected {expected}")]
    FeatureLength { expected: usize, found: usize },

    /// A label string outside the fixed taxonomy.
    #[error("Unknown label '{label}' in {source_name} at block {index}")]
    InvalidLabel {
        label: String,
        source_name: String,
        index: usize,
    },

    /// Training was requested without any labeled blocks.
    #[error("No labeled blocks found: {0}")]
    EmptyTrainingSet(String),

    /// Error during output rendering.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
