//! Structural PDF compaction
//!
//! Documents are re-serialized rather than re-rendered: unreachable objects
//! are dropped, object numbers are compacted and eligible streams are
//! flate-compressed. Embedded images and page content are left alone.

use crate::compressor::CompressionOutcome;
use crate::error::{CompressionError, Result};
use lopdf::Document;
use tracing::{debug, warn};

/// Re-serialize a PDF with stream compaction.
///
/// Returns [`CompressionOutcome::Unchanged`] when the document cannot be
/// parsed, when the rewritten file is not strictly smaller, or when the
/// rewritten file does not parse back.
///
/// # Arguments
/// * `bytes` - The original PDF file content
pub fn compress_document(bytes: &[u8]) -> CompressionOutcome {
    let rewritten = match reserialize(bytes) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            warn!("PDF compaction failed, keeping original: {}", e);
            return CompressionOutcome::Unchanged;
        }
    };

    if rewritten.len() >= bytes.len() {
        debug!(
            "PDF compaction did not shrink the file ({} -> {} bytes)",
            bytes.len(),
            rewritten.len()
        );
        return CompressionOutcome::Unchanged;
    }

    if let Err(e) = Document::load_mem(&rewritten) {
        warn!("rewritten PDF does not parse back, keeping original: {}", e);
        return CompressionOutcome::Unchanged;
    }

    CompressionOutcome::Compressed(rewritten)
}

/// Whether the trailer carries an encryption dictionary
pub fn is_encrypted(doc: &Document) -> bool {
    doc.trailer.get(b"Encrypt").is_ok()
}

fn reserialize(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        return Err(CompressionError::DocumentParse("empty input".to_string()));
    }

    let mut doc =
        Document::load_mem(bytes).map_err(|e| CompressionError::DocumentParse(e.to_string()))?;

    // Encrypted streams are keyed by object number; keep them where they are.
    if is_encrypted(&doc) {
        debug!("document carries an encryption dictionary, skipping stream rewrite");
    } else {
        let pruned = doc.prune_objects();
        doc.renumber_objects();
        doc.compress();
        debug!("pruned {} unreachable objects", pruned.len());
    }

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out)
        .map_err(|e| CompressionError::DocumentSave(e.to_string()))?;
    Ok(out)
}
