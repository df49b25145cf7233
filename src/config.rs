//! Search tuning and target policy
//!
//! The image search relies on a handful of empirical constants. They are
//! collected in [`SearchTuning`] so they can be overridden from a JSON file
//! and validated against representative corpora.

use crate::constants::{
    BASELINE_QUALITY, BYTES_PER_KB, MAX_SCALE, MIN_QUALITY, MIN_SCALE, RETRY_QUALITY_FACTOR,
    SIZE_CORRECTION_FACTOR,
};
use crate::error::{CompressionError, Result};
use crate::queue::ItemStatus;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Heuristics driving the two-attempt image search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTuning {
    /// How much better than a linear pixel/byte relation the encoder is assumed to do
    pub size_correction: f64,
    /// Lower bound on the linear resolution scale
    pub min_scale: f64,
    /// Upper bound on the linear resolution scale
    pub max_scale: f64,
    /// Encoder quality for the first attempt (0-1)
    pub baseline_quality: f64,
    /// Multiplier applied to the miss ratio for the second attempt
    pub retry_quality_factor: f64,
    /// Quality floor for the second attempt (0-1)
    pub min_quality: f64,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            size_correction: SIZE_CORRECTION_FACTOR,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            baseline_quality: BASELINE_QUALITY,
            retry_quality_factor: RETRY_QUALITY_FACTOR,
            min_quality: MIN_QUALITY,
        }
    }
}

impl SearchTuning {
    /// Validate tuning parameters
    pub fn validate(&self) -> Result<()> {
        check_positive("size_correction", self.size_correction)?;
        check_unit("min_scale", self.min_scale)?;
        check_unit("max_scale", self.max_scale)?;
        if self.min_scale > self.max_scale {
            return Err(CompressionError::InvalidTuning("min_scale", self.min_scale));
        }
        check_unit("baseline_quality", self.baseline_quality)?;
        check_positive("retry_quality_factor", self.retry_quality_factor)?;
        check_unit("min_quality", self.min_quality)?;
        Ok(())
    }

    /// Load tuning overrides from a JSON file
    ///
    /// Fields missing from the file keep their default values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CompressionError::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let tuning: SearchTuning = serde_json::from_str(&raw)?;
        tuning.validate()?;
        Ok(tuning)
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CompressionError::InvalidTuning(name, value));
    }
    Ok(())
}

fn check_unit(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(CompressionError::InvalidTuning(name, value));
    }
    Ok(())
}

/// The two size bounds used by a batch run
///
/// `user_target_bytes` is what the caller asked for and the only value
/// results are judged against. `internal_target_bytes` is half of it and is
/// only ever handed to the image search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPolicy {
    user_target_bytes: u64,
    internal_target_bytes: u64,
}

impl TargetPolicy {
    pub fn new(user_target_bytes: u64) -> Result<Self> {
        if user_target_bytes == 0 {
            return Err(CompressionError::InvalidTarget(user_target_bytes));
        }
        Ok(Self {
            user_target_bytes,
            internal_target_bytes: user_target_bytes / 2,
        })
    }

    pub fn from_kb(target_kb: u64) -> Result<Self> {
        Self::new(target_kb.saturating_mul(BYTES_PER_KB))
    }

    pub fn user_target_bytes(&self) -> u64 {
        self.user_target_bytes
    }

    pub fn internal_target_bytes(&self) -> u64 {
        self.internal_target_bytes
    }

    /// Judge a finished result against the user-visible bound
    pub fn judge(&self, result_size: u64) -> ItemStatus {
        if result_size <= self.user_target_bytes {
            ItemStatus::Done
        } else {
            ItemStatus::Warning
        }
    }
}
