// Resolution search heuristics
pub const SIZE_CORRECTION_FACTOR: f64 = 2.5;
pub const MIN_SCALE: f64 = 0.2;
pub const MAX_SCALE: f64 = 0.9;

// Quality search heuristics, on a 0-1 scale
pub const BASELINE_QUALITY: f64 = 0.7;
pub const RETRY_QUALITY_FACTOR: f64 = 0.9;
pub const MIN_QUALITY: f64 = 0.1;

pub const DEFAULT_TARGET_KB: u64 = 200;
pub const BYTES_PER_KB: u64 = 1024;

// Hardening limits
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

pub const EXPORT_SUFFIX: &str = "-min";
pub const WARNING_LABEL: &str = "Limit reached";
pub const FAILED_LABEL: &str = "Failed";

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

// Common output message prefixes
pub const ORIGINAL_SIZE_PREFIX: &str = "📊 Original size:";
pub const COMPRESSED_SIZE_PREFIX: &str = "📈 Compressed size:";
pub const COMPRESSION_RATIO_PREFIX: &str = "🎯 Saved:";
pub const SUCCESS_PREFIX: &str = "✅";
pub const WARNING_PREFIX: &str = "⚠️";
pub const ERROR_PREFIX: &str = "❌";
pub const INFO_PREFIX: &str = "📋";
