//! Utility functions for common operations
//!
//! Size formatting, savings arithmetic and export naming shared by the
//! batch report and the command-line front end.

use crate::constants::EXPORT_SUFFIX;
use std::collections::HashSet;

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];
const THRESHOLD: f64 = 1024.0;

/// Format a byte count in human-readable form
///
/// Uses base-1024 steps with one decimal place, dropping a trailing `.0`.
/// The sign of negative inputs is kept. Zero, NaN and infinite inputs all
/// format as `"0 B"`.
///
/// # Arguments
/// * `bytes` - Size in bytes, possibly negative or fractional
///
/// # Returns
/// * Human-readable size string (e.g., "1.5 KB", "-2 KB", "512 B")
pub fn format_file_size(bytes: f64) -> String {
    if bytes == 0.0 || !bytes.is_finite() {
        return "0 B".to_string();
    }

    let sign = if bytes < 0.0 { "-" } else { "" };
    let magnitude = bytes.abs();

    if magnitude < 1.0 {
        return format!("{}{} B", sign, magnitude);
    }

    let mut value = magnitude;
    let mut unit_index = 0;
    while value >= THRESHOLD && unit_index < SIZE_UNITS.len() - 1 {
        value /= THRESHOLD;
        unit_index += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;

    format!("{}{} {}", sign, rounded, SIZE_UNITS[unit_index])
}

/// Calculate the size reduction as a percentage of the original
///
/// # Returns
/// * Percentage saved (positive means reduction, negative means increase)
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

/// Whole-number percentage saved, floored at zero
pub fn percent_saved(original_size: u64, compressed_size: u64) -> u64 {
    if original_size == 0 {
        return 0;
    }
    let saved = original_size.saturating_sub(compressed_size);
    ((saved as f64 / original_size as f64) * 100.0).round() as u64
}

/// Build the exported file name for a compressed artifact
///
/// The extension is everything from the last `.` onward; a name without a
/// dot gets the suffix appended as-is.
///
/// # Example
/// ```
/// use fit_squeeze::utils::export_file_name;
///
/// assert_eq!(export_file_name("scan.pdf"), "scan-min.pdf");
/// assert_eq!(export_file_name("README"), "README-min");
/// ```
pub fn export_file_name(original_name: &str) -> String {
    match original_name.rfind('.') {
        Some(dot) => format!(
            "{}{}{}",
            &original_name[..dot],
            EXPORT_SUFFIX,
            &original_name[dot..]
        ),
        None => format!("{}{}", original_name, EXPORT_SUFFIX),
    }
}

/// Export name that does not collide with names already handed out
///
/// Repeats of the same export name get a numeric suffix before the
/// extension (`a-min.jpg`, `a-min-2.jpg`, ...). The returned name is recorded
/// in `taken`.
pub fn unique_export_name(original_name: &str, taken: &mut HashSet<String>) -> String {
    let candidate = export_file_name(original_name);
    if taken.insert(candidate.clone()) {
        return candidate;
    }

    let (stem, ext) = match candidate.rfind('.') {
        Some(dot) => candidate.split_at(dot),
        None => (candidate.as_str(), ""),
    };
    let mut counter = 2;
    loop {
        let numbered = format!("{}-{}{}", stem, counter, ext);
        if taken.insert(numbered.clone()) {
            return numbered;
        }
        counter += 1;
    }
}
