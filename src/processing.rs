use crate::compressor::CompressionOutcome;
use crate::config::SearchTuning;
use crate::constants::{MAX_FILE_SIZE, MAX_IMAGE_DIMENSION};
use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageReader, Limits, Rgb, RgbImage};
use std::io::Cursor;
use tracing::{debug, warn};

/// Compute the linear resolution scale for an image search.
///
/// When the source already fits, the scale starts at 1.0; otherwise it is
/// `sqrt(target / source * size_correction)`. The result is always clamped to
/// `[min_scale, max_scale]`, so images are never upscaled.
///
/// # Arguments
/// * `source_size` - Size of the encoded source in bytes
/// * `target_bytes` - Byte budget handed to the search
/// * `tuning` - Search heuristics
///
/// # Example
/// ```
/// use fit_squeeze::config::SearchTuning;
/// use fit_squeeze::processing::resolution_scale;
///
/// let scale = resolution_scale(5_000_000, 100_000, &SearchTuning::default());
/// assert!((scale - 0.2236).abs() < 1e-3);
/// ```
pub fn resolution_scale(source_size: u64, target_bytes: u64, tuning: &SearchTuning) -> f64 {
    let scale = if source_size <= target_bytes {
        1.0
    } else {
        let ratio = target_bytes as f64 / source_size as f64;
        (ratio * tuning.size_correction).sqrt()
    };
    scale.clamp(tuning.min_scale, tuning.max_scale)
}

/// Quality for the second attempt, derived from how far the first one missed
pub fn retry_quality(target_bytes: u64, first_attempt_size: u64, tuning: &SearchTuning) -> f64 {
    if first_attempt_size == 0 {
        return tuning.baseline_quality;
    }
    let miss_ratio = target_bytes as f64 / first_attempt_size as f64;
    (miss_ratio * tuning.retry_quality_factor).max(tuning.min_quality)
}

/// Scaled pixel dimensions, never below one pixel per side
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = (width as f64 * scale).floor() as u32;
    let h = (height as f64 * scale).floor() as u32;
    (w.max(1), h.max(1))
}

/// Decodes an in-memory image with dimension and allocation limits.
///
/// # Security
/// - Rejects images wider or taller than `MAX_IMAGE_DIMENSION`
/// - Caps decoder allocations to `MAX_FILE_SIZE` times a small factor
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_FILE_SIZE * 16);

    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits);
    Ok(reader.decode()?)
}

/// Flatten onto an opaque white background and resample.
///
/// The destination codec has no alpha channel, so transparent pixels are
/// composited over white before resizing.
pub fn prepare_canvas(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let flattened = if img.color().has_alpha() {
        flatten_onto_white(img)
    } else {
        img.to_rgb8()
    };

    if flattened.dimensions() == (width, height) {
        return flattened;
    }
    imageops::resize(&flattened, width, height, FilterType::Triangle)
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut canvas = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        canvas.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    canvas
}

/// Encode a canvas as JPEG at a 0-1 quality
pub fn encode_jpeg(canvas: &RgbImage, quality: f64) -> Result<Vec<u8>> {
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder.encode_image(canvas)?;
    }
    Ok(buffer)
}

/// State of the bounded two-attempt search.
///
/// The search is advanced at most twice: `FirstPass` always moves to either
/// `Done` or `SecondPass`, and `SecondPass` always moves to `Done`.
#[derive(Debug)]
pub(crate) enum SearchPhase {
    FirstPass,
    SecondPass { first_attempt: Vec<u8> },
    Done(Option<Vec<u8>>),
}

struct SearchContext<'a> {
    canvas: &'a RgbImage,
    target_bytes: u64,
    tuning: &'a SearchTuning,
}

impl SearchPhase {
    fn advance(self, ctx: &SearchContext<'_>) -> SearchPhase {
        match self {
            SearchPhase::FirstPass => {
                match encode_jpeg(ctx.canvas, ctx.tuning.baseline_quality) {
                    Ok(bytes) if bytes.len() as u64 <= ctx.target_bytes => {
                        debug!("first pass hit target with {} bytes", bytes.len());
                        SearchPhase::Done(Some(bytes))
                    }
                    Ok(bytes) => SearchPhase::SecondPass {
                        first_attempt: bytes,
                    },
                    Err(e) => {
                        warn!("first pass encode failed: {}", e);
                        SearchPhase::Done(None)
                    }
                }
            }
            SearchPhase::SecondPass { first_attempt } => {
                let quality =
                    retry_quality(ctx.target_bytes, first_attempt.len() as u64, ctx.tuning);
                debug!(
                    "first pass overshot with {} bytes, retrying at quality {:.2}",
                    first_attempt.len(),
                    quality
                );
                match encode_jpeg(ctx.canvas, quality) {
                    Ok(bytes) => SearchPhase::Done(Some(bytes)),
                    Err(e) => {
                        warn!("second pass encode failed, keeping first attempt: {}", e);
                        SearchPhase::Done(Some(first_attempt))
                    }
                }
            }
            done @ SearchPhase::Done(_) => done,
        }
    }
}

/// Re-encode an image so that it lands at or below `target_bytes`.
///
/// Runs at most two encode attempts at a single resolution chosen up front.
/// Never fails: undecodable input, or a first attempt that cannot be encoded,
/// yields [`CompressionOutcome::Unchanged`]. The result may still exceed the
/// target; judging it is the caller's job.
///
/// # Arguments
/// * `bytes` - Encoded source image
/// * `target_bytes` - Byte budget for the search
/// * `tuning` - Search heuristics
pub fn compress_image(bytes: &[u8], target_bytes: u64, tuning: &SearchTuning) -> CompressionOutcome {
    let img = match decode_image(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!("image decode failed, keeping original: {}", e);
            return CompressionOutcome::Unchanged;
        }
    };

    let (width, height) = img.dimensions();
    let scale = resolution_scale(bytes.len() as u64, target_bytes, tuning);
    let (new_width, new_height) = scaled_dimensions(width, height, scale);
    debug!(
        "resampling {}x{} -> {}x{} (scale {:.3}, target {} bytes)",
        width, height, new_width, new_height, scale, target_bytes
    );

    let canvas = prepare_canvas(&img, new_width, new_height);
    let ctx = SearchContext {
        canvas: &canvas,
        target_bytes,
        tuning,
    };

    let phase = SearchPhase::FirstPass.advance(&ctx);
    let phase = phase.advance(&ctx);

    match phase {
        SearchPhase::Done(Some(encoded)) => CompressionOutcome::Compressed(encoded),
        _ => CompressionOutcome::Unchanged,
    }
}
