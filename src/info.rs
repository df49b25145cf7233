use crate::compressor::Engine;
use crate::config::TargetPolicy;
use crate::constants::INFO_PREFIX;
use crate::document::is_encrypted;
use crate::error::{CompressionError, Result};
use crate::formats::MediaType;
use crate::processing::{resolution_scale, scaled_dimensions};
use crate::utils::format_file_size;
use crate::validation::load_source_file;
use image::ImageReader;
use lopdf::Document;
use std::io::Cursor;
use std::path::Path;

/// What could be read from a file without compressing it
#[derive(Debug, Clone, PartialEq)]
pub enum MediaDetail {
    Image { width: u32, height: u32 },
    Document { pages: usize, encrypted: bool },
    /// Content did not parse; compression will keep the original
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub media_type: MediaType,
    pub file_size: u64,
    pub detail: MediaDetail,
}

/// What the image search would start from for a given target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPlan {
    pub internal_target_bytes: u64,
    pub scale: f64,
    pub output_width: u32,
    pub output_height: u32,
}

/// Inspect in-memory content of a known media type
pub fn analyze(media_type: MediaType, bytes: &[u8]) -> MediaInfo {
    let detail = if media_type.is_document() {
        match Document::load_mem(bytes) {
            Ok(doc) => MediaDetail::Document {
                pages: doc.get_pages().len(),
                encrypted: is_encrypted(&doc),
            },
            Err(e) => MediaDetail::Unreadable(e.to_string()),
        }
    } else {
        match read_dimensions(bytes) {
            Ok((width, height)) => MediaDetail::Image { width, height },
            Err(e) => MediaDetail::Unreadable(e.to_string()),
        }
    };

    MediaInfo {
        media_type,
        file_size: bytes.len() as u64,
        detail,
    }
}

fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}

/// Project the first search pass for an image
///
/// Returns `None` for documents and unreadable images, which are not
/// resampled.
pub fn plan_search(info: &MediaInfo, policy: &TargetPolicy, engine: &Engine) -> Option<SearchPlan> {
    let MediaDetail::Image { width, height } = info.detail else {
        return None;
    };

    let internal_target_bytes = policy.internal_target_bytes();
    let scale = resolution_scale(info.file_size, internal_target_bytes, engine.tuning());
    let (output_width, output_height) = scaled_dimensions(width, height, scale);

    Some(SearchPlan {
        internal_target_bytes,
        scale,
        output_width,
        output_height,
    })
}

/// Load a file and describe it
pub fn get_media_info(input_path: &Path) -> Result<MediaInfo> {
    if !input_path.exists() {
        return Err(CompressionError::FileNotFound(input_path.to_path_buf()));
    }
    let source = load_source_file(input_path)?;
    Ok(analyze(source.media_type, &source.bytes))
}

pub fn print_media_info(input_path: &Path, info: &MediaInfo, policy: &TargetPolicy, engine: &Engine) {
    println!("{} Analyzing: {:?}", INFO_PREFIX, input_path);
    println!(
        "  🎭 Type: {} (.{}, {})",
        info.media_type,
        info.media_type.extension(),
        info.media_type.mime_type()
    );
    println!(
        "  📦 File size: {} ({} bytes)",
        format_file_size(info.file_size as f64),
        info.file_size
    );

    match &info.detail {
        MediaDetail::Image { width, height } => {
            println!("  📏 Dimensions: {}x{} pixels", width, height);
        }
        MediaDetail::Document { pages, encrypted } => {
            println!("  📄 Pages: {}", pages);
            if *encrypted {
                println!("  🔒 Encrypted: streams are kept as-is");
            }
        }
        MediaDetail::Unreadable(reason) => {
            println!("  ⚠️  Content could not be read: {}", reason);
            println!("     The original would be kept unchanged");
        }
    }

    let user_target = policy.user_target_bytes();
    println!("\n💡 Target: {}", format_file_size(user_target as f64));
    if info.file_size <= user_target {
        println!("  ✅ Already within the target");
    }

    if let Some(plan) = plan_search(info, policy, engine) {
        println!(
            "  🎯 First pass: scale {:.2} -> {}x{} pixels, JPEG quality {:.0}%",
            plan.scale,
            plan.output_width,
            plan.output_height,
            engine.tuning().baseline_quality * 100.0
        );
    } else if info.media_type.is_document() {
        println!("  🎯 Structural compaction only; page content is not re-rendered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_analyze_image_dimensions() {
        let bytes = png_bytes(64, 32);
        let info = analyze(MediaType::Png, &bytes);
        assert_eq!(info.detail, MediaDetail::Image { width: 64, height: 32 });
        assert_eq!(info.file_size, bytes.len() as u64);
    }

    #[test]
    fn test_analyze_unreadable() {
        let info = analyze(MediaType::Pdf, b"not a pdf");
        assert!(matches!(info.detail, MediaDetail::Unreadable(_)));

        let info = analyze(MediaType::Jpeg, b"not a jpeg");
        assert!(matches!(info.detail, MediaDetail::Unreadable(_)));
    }

    #[test]
    fn test_plan_search_clamps_scale() {
        let info = MediaInfo {
            media_type: MediaType::Jpeg,
            file_size: 5_000_000,
            detail: MediaDetail::Image {
                width: 4000,
                height: 3000,
            },
        };
        let policy = TargetPolicy::new(10_000).unwrap();
        let plan = plan_search(&info, &policy, &Engine::default()).unwrap();

        assert_eq!(plan.internal_target_bytes, 5_000);
        assert_eq!(plan.scale, 0.2);
        assert_eq!((plan.output_width, plan.output_height), (800, 600));
    }

    #[test]
    fn test_plan_search_skips_documents() {
        let info = MediaInfo {
            media_type: MediaType::Pdf,
            file_size: 1_000,
            detail: MediaDetail::Document {
                pages: 1,
                encrypted: false,
            },
        };
        let policy = TargetPolicy::from_kb(200).unwrap();
        assert!(plan_search(&info, &policy, &Engine::default()).is_none());
    }

    #[test]
    fn test_get_media_info_missing_file() {
        let result = get_media_info(Path::new("missing.png"));
        assert!(matches!(result, Err(CompressionError::FileNotFound(_))));
    }
}
