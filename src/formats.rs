//! Media type handling for queued files
//!
//! Only four media types are accepted into a batch. Everything else is
//! rejected before it reaches the queue.

use crate::error::{CompressionError, Result};
use image::ImageFormat;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Accepted input media types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// PDF document, re-serialized structurally
    Pdf,
    /// JPEG raster image
    Jpeg,
    /// PNG raster image
    Png,
    /// WebP raster image
    WebP,
}

impl MediaType {
    /// Returns the canonical file extension for this media type
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
            MediaType::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::WebP => "image/webp",
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, MediaType::Pdf)
    }

    /// Parse a declared MIME type such as `image/png`
    pub fn from_mime(mime: &str) -> Result<Self> {
        match mime.trim().to_lowercase().as_str() {
            "application/pdf" => Ok(MediaType::Pdf),
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            "image/webp" => Ok(MediaType::WebP),
            other => Err(CompressionError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Detect the media type from leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PDF_MAGIC) {
            return Some(MediaType::Pdf);
        }
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(MediaType::Jpeg),
            ImageFormat::Png => Some(MediaType::Png),
            ImageFormat::WebP => Some(MediaType::WebP),
            _ => None,
        }
    }

    /// Resolve the media type of a file, preferring its content over its name
    pub fn detect(path: &Path, bytes: &[u8]) -> Result<Self> {
        Self::sniff(bytes)
            .or_else(|| Self::from_path(path))
            .ok_or_else(|| CompressionError::UnsupportedFormat(path.display().to_string()))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Pdf => "PDF",
            MediaType::Jpeg => "JPEG",
            MediaType::Png => "PNG",
            MediaType::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for MediaType {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(MediaType::Pdf),
            "jpeg" | "jpg" => Ok(MediaType::Jpeg),
            "png" => Ok(MediaType::Png),
            "webp" => Ok(MediaType::WebP),
            _ => Err(CompressionError::UnsupportedFormat(s.to_string())),
        }
    }
}
