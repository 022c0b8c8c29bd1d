//! Heap bounds for a profile override. Pure functions, no I/O.
//!
//! A 32-bit Java process cannot reliably address more than about 1.5 GB of
//! heap, so the upper bound depends on the runtime's addressing width.

use serde::Serialize;

use crate::config::{MAX_MEMORY_32BIT_MB, MEMORY_MARKS, MEMORY_STEP_MB, MIN_MEMORY_MB};
use crate::error::{ProfileError, Result};

/// Closed range `[min, max]` in MB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryBounds {
    pub min: u32,
    pub max: u32,
}

/// `min` is fixed; `max` is the host's memory for 64-bit runtimes and 1536 MB otherwise.
///
/// A 64-bit host reporting less than `min` still gets a non-empty range.
#[must_use]
pub fn compute_memory_bounds(is_64bit: bool, total_system_memory_mb: u32) -> MemoryBounds {
    let max = if is_64bit {
        total_system_memory_mb.max(MIN_MEMORY_MB)
    } else {
        MAX_MEMORY_32BIT_MB
    };
    MemoryBounds {
        min: MIN_MEMORY_MB,
        max,
    }
}

impl MemoryBounds {
    #[must_use]
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Returns `value` unchanged when in range. Never clamps.
    pub fn check(&self, value: u32) -> Result<u32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ProfileError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Slider stops: multiples of the step inside the range.
    #[must_use]
    pub fn slider_positions(&self) -> Vec<u32> {
        let first = self.min.div_ceil(MEMORY_STEP_MB) * MEMORY_STEP_MB;
        (first..=self.max)
            .step_by(MEMORY_STEP_MB as usize)
            .collect()
    }

    /// Reference labels that fall inside the range.
    #[must_use]
    pub fn marks(&self) -> Vec<u32> {
        MEMORY_MARKS
            .iter()
            .copied()
            .filter(|m| self.contains(*m))
            .collect()
    }
}

/// Nearest step multiple, ties rounding up. Display helper only.
#[must_use]
pub fn snap_to_step(value: u32) -> u32 {
    let half = MEMORY_STEP_MB / 2;
    value.saturating_add(half) / MEMORY_STEP_MB * MEMORY_STEP_MB
}
