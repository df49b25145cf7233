use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("PDF parse error: {0}")]
    DocumentParse(String),

    #[error("PDF serialization error: {0}")]
    DocumentSave(String),

    #[error("Invalid target size: {0} bytes. Must be greater than zero")]
    InvalidTarget(u64),

    #[error("Invalid tuning value for {0}: {1}")]
    InvalidTuning(&'static str, f64),

    #[error("Tuning file error: {0}")]
    TuningFile(#[from] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("No supported files found in input path: {0}")]
    NoInputFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Batch already processed: reset the queue and submit a new batch")]
    BatchAlreadyProcessed,

    #[error("Compressor fault: {0}")]
    CompressorFault(String),
}

pub type Result<T> = std::result::Result<T, CompressionError>;
