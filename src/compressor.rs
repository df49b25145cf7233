use crate::config::SearchTuning;
use crate::constants::MAX_FILE_SIZE;
use crate::document::compress_document;
use crate::error::{CompressionError, Result};
use crate::processing::compress_image;

/// Result of a fail-open compressor call.
///
/// `Unchanged` means the compressor fell back to the original input, either
/// because it could not parse it or because it could not improve on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    Compressed(Vec<u8>),
    Unchanged,
}

impl CompressionOutcome {
    /// Resolve the outcome to concrete bytes, falling back to `original`
    pub fn into_bytes(self, original: &[u8]) -> Vec<u8> {
        match self {
            CompressionOutcome::Compressed(bytes) => bytes,
            CompressionOutcome::Unchanged => original.to_vec(),
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, CompressionOutcome::Compressed(_))
    }
}

/// The two compressor calls the batch orchestrator dispatches to.
///
/// Decode and parse failures are reported as `Ok(Unchanged)`. An `Err` is
/// reserved for unexpected faults and fails only the item being processed.
pub trait MediaCompressor {
    fn compress_image(&self, bytes: &[u8], target_bytes: u64) -> Result<CompressionOutcome>;

    fn compress_document(&self, bytes: &[u8]) -> Result<CompressionOutcome>;
}

/// Default compressor backed by the image search and PDF compaction
#[derive(Debug, Clone, Default)]
pub struct Engine {
    tuning: SearchTuning,
}

impl Engine {
    pub fn new(tuning: SearchTuning) -> Result<Self> {
        tuning.validate()?;
        Ok(Self { tuning })
    }

    pub fn tuning(&self) -> &SearchTuning {
        &self.tuning
    }

    fn check_input_size(bytes: &[u8]) -> Result<()> {
        let size = bytes.len() as u64;
        if size > MAX_FILE_SIZE {
            return Err(CompressionError::FileTooLarge(size, MAX_FILE_SIZE));
        }
        Ok(())
    }
}

impl MediaCompressor for Engine {
    fn compress_image(&self, bytes: &[u8], target_bytes: u64) -> Result<CompressionOutcome> {
        Self::check_input_size(bytes)?;
        Ok(compress_image(bytes, target_bytes, &self.tuning))
    }

    fn compress_document(&self, bytes: &[u8]) -> Result<CompressionOutcome> {
        Self::check_input_size(bytes)?;
        Ok(compress_document(bytes))
    }
}
