//! Error types for the form-fill engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the form-fill engine
#[derive(Error, Debug)]
pub enum Error {
    /// A candidate source produced zero bytes
    #[error("document source is empty")]
    EmptySource,

    /// The bytes are not a parseable PDF
    #[error("not a valid PDF document: {0}")]
    InvalidFormat(String),

    /// Every candidate source was probed and none yielded a valid document
    #[error("no candidate source produced a valid PDF document")]
    NoValidSource,

    /// Image stamp in a format other than PNG or JPEG
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// Requested page does not exist in the document
    #[error("page index {0} is out of range")]
    PageOutOfRange(usize),

    /// Re-serializing the mutated document failed
    #[error("failed to serialize document: {0}")]
    Serialization(String),

    /// PDF structural error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Image decoding error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
