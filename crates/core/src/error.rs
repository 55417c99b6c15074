use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur across the pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The source PDF could not be opened or parsed at all.
    #[error("source PDF is corrupt or unreadable: {0}")]
    SourceCorrupt(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Pdfium error: {0}")]
    Pdfium(String),

    #[error("image error: {0}")]
    Image(String),

    /// The tagged-PDF writer could not build or save the output file.
    #[error("tagged-PDF writer failed: {0}")]
    Writer(String),

    /// Disk write failed while materializing images or the output PDF.
    #[error("storage is full or unwritable: {0}")]
    StorageFull(String),

    /// Per-image model call failed to connect.
    #[error("network error contacting model: {0}")]
    Network(String),

    /// Per-image model call exceeded its deadline.
    #[error("model call timed out")]
    ModelTimeout,

    /// Model responded but with a non-success status or empty body.
    #[error("model error: {0}")]
    Model(String),

    /// The response parser could not recover any usable text.
    #[error("model response could not be parsed")]
    ParserEmpty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}
