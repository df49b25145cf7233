//! Input discovery and loading for the command-line front end.

use crate::constants::MAX_FILE_SIZE;
use crate::error::{CompressionError, Result};
use crate::formats::MediaType;
use crate::queue::SourceFile;
use glob::glob;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect candidate files from a file path, directory, or glob pattern.
///
/// Directory walks and glob matches only pick up files with a supported
/// extension; an explicitly named file is always returned so that its
/// content can be sniffed later. Hidden entries below a directory root are
/// skipped.
///
/// # Arguments
/// * `input` - A file path, a directory path, or a glob expression
/// * `recursive` - Descend into subdirectories when `input` is a directory
pub fn collect_input_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let input_path = Path::new(input);
    let mut files = Vec::new();

    if input_path.is_file() {
        files.push(input_path.canonicalize()?);
    } else if input_path.is_dir() {
        let root = input_path.canonicalize()?;
        let max_depth = if recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&root).max_depth(max_depth).into_iter();

        for entry in walker.filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name())) {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_supported_file(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
    } else if let Ok(pattern) = glob(input) {
        for entry in pattern.flatten() {
            if entry.is_file() && is_supported_file(&entry) {
                if let Ok(canonical) = entry.canonicalize() {
                    files.push(canonical);
                }
            }
        }
    }

    if files.is_empty() {
        return Err(CompressionError::NoInputFilesFound(input.to_string()));
    }
    Ok(files)
}

/// Collect files from several inputs, dropping duplicates while keeping the
/// order in which they were first seen.
pub fn collect_all_inputs(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        for path in collect_input_files(input, recursive)? {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Check whether the extension names one of the accepted media types
pub fn is_supported_file(path: &Path) -> bool {
    MediaType::from_path(path).is_some()
}

/// Validate that `path` is a readable regular file within the size limit.
///
/// # Returns
/// * `Ok(size)` - File size in bytes
pub fn validate_input_path(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CompressionError::UnsupportedFormat(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    let size = fs::metadata(path)?.len();
    if size > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(size, MAX_FILE_SIZE));
    }
    Ok(size)
}

/// Read a file and resolve its media type, ready to be queued
pub fn load_source_file(path: &Path) -> Result<SourceFile> {
    validate_input_path(path)?;
    let bytes = fs::read(path)?;
    let media_type = MediaType::detect(path, &bytes)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SourceFile::new(name, media_type, bytes))
}

/// Create the output directory if needed and return its canonical path
pub fn prepare_output_dir(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path)?;
    Ok(path.canonicalize()?)
}
